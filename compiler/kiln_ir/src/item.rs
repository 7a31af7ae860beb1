//! Top-level items and the definition table.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{EffectSet, FunType, Id, Modifiers, Name, Param, Term};

/// Top-level declaration.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Def(Def),
    Mod(Module),
    Test(Test),
}

/// A definition. `name` is fully qualified.
#[derive(Clone, Debug, PartialEq)]
pub struct Def {
    pub id: Id,
    pub name: Name,
    pub modifiers: Modifiers,
    pub params: Vec<Param>,
    pub result: Term,
    pub effects: EffectSet,
    pub body: Option<Term>,
}

impl Def {
    /// The definition's type: a function type when it takes parameters,
    /// otherwise its result type.
    pub fn signature(&self) -> Term {
        if self.params.is_empty() && self.effects.is_empty() {
            self.result.clone()
        } else {
            Term::Fun(Box::new(FunType {
                params: self.params.clone(),
                result: self.result.clone(),
                effects: self.effects.clone(),
            }))
        }
    }

    /// Compile-time definition.
    pub fn is_const(&self) -> bool {
        self.modifiers.contains(Modifiers::CONST)
    }

    /// Whether the normalizer may replace references by the body.
    pub fn is_unfoldable(&self) -> bool {
        self.is_const()
            && self.body.is_some()
            && !self
                .modifiers
                .intersects(Modifiers::ABSTRACT | Modifiers::OPAQUE | Modifiers::BUILTIN)
    }

    /// Whether the packer emits a unit for this definition.
    pub fn is_lowered(&self) -> bool {
        !self
            .modifiers
            .intersects(Modifiers::CONST | Modifiers::ABSTRACT | Modifiers::BUILTIN)
            && self.body.is_some()
    }

    /// Number of parameters that exist at runtime.
    pub fn relevant_arity(&self) -> usize {
        self.params.iter().filter(|p| p.relevant).count()
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ModuleKind {
    Structure,
    Signature,
    Opaque,
}

/// ML-style module.
#[derive(Clone, Debug, PartialEq)]
pub struct Module {
    pub id: Id,
    pub name: Name,
    pub modifiers: Modifiers,
    pub kind: ModuleKind,
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Test {
    pub id: Id,
    pub name: Name,
    pub body: Term,
}

impl Item {
    pub fn id(&self) -> Id {
        match self {
            Item::Def(def) => def.id,
            Item::Mod(module) => module.id,
            Item::Test(test) => test.id,
        }
    }

    pub fn name(&self) -> Name {
        match self {
            Item::Def(def) => def.name,
            Item::Mod(module) => module.name,
            Item::Test(test) => test.name,
        }
    }
}

/// Definitions by qualified name.
///
/// Module members are flattened in: a member of an opaque module is marked
/// [`Modifiers::OPAQUE`], a member of a signature [`Modifiers::ABSTRACT`],
/// and module modifiers are inherited by every member.
#[derive(Clone, Debug, Default)]
pub struct DefTable {
    defs: FxHashMap<Name, Arc<Def>>,
}

impl DefTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: Name) -> Option<&Arc<Def>> {
        self.defs.get(&name)
    }

    pub fn contains(&self, name: Name) -> bool {
        self.defs.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn insert_def(&mut self, def: Def) {
        self.defs.insert(def.name, Arc::new(def));
    }

    /// Register an item and everything nested in it.
    pub fn insert_item(&mut self, item: &Item) {
        self.insert_inherited(item, Modifiers::empty());
    }

    fn insert_inherited(&mut self, item: &Item, inherited: Modifiers) {
        match item {
            Item::Def(def) => {
                let mut def = def.clone();
                def.modifiers |= inherited;
                self.insert_def(def);
            }
            Item::Mod(module) => {
                let mut inner = inherited | module.modifiers;
                match module.kind {
                    ModuleKind::Structure => {}
                    ModuleKind::Signature => inner |= Modifiers::ABSTRACT,
                    ModuleKind::Opaque => inner |= Modifiers::OPAQUE,
                }
                for member in &module.items {
                    self.insert_inherited(member, inner);
                }
            }
            Item::Test(_) => {}
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Def>> {
        self.defs.values()
    }
}

impl FromIterator<Def> for DefTable {
    fn from_iter<I: IntoIterator<Item = Def>>(iter: I) -> Self {
        let mut table = DefTable::new();
        for def in iter {
            table.insert_def(def);
        }
        table
    }
}

#[cfg(test)]
mod tests;
