//! Elaboration context.

use kiln_ir::{EffectSet, Lvl, Name};
use kiln_nbe::{Env, Lazy, Value};

/// What the term being elaborated is used for.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Mode {
    /// Exists at runtime.
    Relevant,
    /// Erased: types, proofs and arguments of irrelevant parameters.
    Irrelevant,
    /// Determines the runtime layout of a binder's type.
    Representation,
}

/// Compile-time tier: `CONST` bodies and splice arguments.
pub const META_STAGE: u8 = 0;
/// Runtime tier: ordinary definitions and quoted code.
pub const OBJECT_STAGE: u8 = 1;

/// A bound name.
#[derive(Clone, Debug)]
pub struct Entry {
    pub name: Name,
    pub ty: Value,
    pub relevant: bool,
    pub type_relevant: bool,
    pub stage: u8,
    /// Let-bound: the environment holds its value rather than a variable.
    pub defined: bool,
}

/// Bound names, their values, and the current mode, stage and permitted
/// effects.
///
/// Extended by cloning so each scope keeps its own copy.
#[derive(Clone, Debug)]
pub struct Ctx {
    entries: Vec<Entry>,
    pub env: Env,
    pub mode: Mode,
    pub stage: u8,
    pub permitted: EffectSet,
}

impl Ctx {
    pub fn new(stage: u8, permitted: EffectSet) -> Self {
        Ctx {
            entries: Vec::new(),
            env: Env::new(),
            mode: Mode::Relevant,
            stage,
            permitted,
        }
    }

    pub fn depth(&self) -> Lvl {
        Lvl::from_index(self.entries.len())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Innermost entry named `name`.
    pub fn lookup(&self, name: Name) -> Option<(Lvl, &Entry)> {
        self.entries
            .iter()
            .enumerate()
            .rev()
            .find(|(_, entry)| entry.name == name)
            .map(|(i, entry)| (Lvl::from_index(i), entry))
    }

    /// Bind a variable at the next level.
    pub fn bind(&mut self, name: Name, ty: Value, relevant: bool, type_relevant: bool) -> Value {
        let var = Value::Var(name, self.depth());
        self.env.push(Lazy::ready(var.clone()));
        self.entries.push(Entry {
            name,
            ty,
            relevant,
            type_relevant,
            stage: self.stage,
            defined: false,
        });
        var
    }

    /// Bind a let at the next level; references see its value.
    pub fn define(&mut self, name: Name, ty: Value, value: Lazy) {
        self.env.push(value);
        self.entries.push(Entry {
            name,
            ty,
            relevant: true,
            type_relevant: true,
            stage: self.stage,
            defined: true,
        });
    }

    pub fn with_mode(&self, mode: Mode) -> Ctx {
        Ctx {
            mode,
            ..self.clone()
        }
    }

    pub fn with_stage(&self, stage: u8) -> Ctx {
        Ctx {
            stage,
            ..self.clone()
        }
    }

    /// Mode for the type of a binder with the given relevance.
    pub fn binder_type_mode(&self, relevant: bool) -> Mode {
        if relevant && self.stage >= OBJECT_STAGE && self.mode == Mode::Relevant {
            Mode::Representation
        } else {
            Mode::Irrelevant
        }
    }
}
