//! Bidirectional elaboration of surface items into core items.
//!
//! [`elaborate_item`] checks one compilation unit and returns the core
//! item, the type of every surface node it visited, the diagnostics it
//! collected and the [`Normalizer`] holding the unit's metavariables.
//! Elaboration never stops at an error: the offending subterm becomes a
//! `Hole` and checking continues, so one pass reports as much as possible.
//!
//! [`zonk`] then substitutes solved metavariables and rejects unsolved
//! ones.

mod check;
mod ctx;
mod infer;
mod item;
mod pattern;
mod subtype;
pub mod zonk;

use std::sync::Arc;

use kiln_diagnostic::{Diagnostic, Diagnostics};
use kiln_ir::surface::SItem;
use kiln_ir::{DefTable, EffectSet, Id, Item, Lvl, Modifiers, Name, Term};
use kiln_nbe::{Builtins, Normalizer, Value};
use rustc_hash::FxHashMap;

pub use ctx::{Ctx, Entry, Mode, META_STAGE, OBJECT_STAGE};
pub use zonk::{zonk_item, zonk_types};

/// Type of a surface node, quoted at the context depth of the node.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeEntry {
    pub depth: Lvl,
    pub ty: Term,
}

/// Per-node types recorded during elaboration.
#[derive(Clone, Debug, Default)]
pub struct TypeTable {
    entries: FxHashMap<Id, TypeEntry>,
}

impl TypeTable {
    pub fn get(&self, id: Id) -> Option<&Term> {
        self.entries.get(&id).map(|entry| &entry.ty)
    }

    pub fn entry(&self, id: Id) -> Option<&TypeEntry> {
        self.entries.get(&id)
    }

    pub fn insert(&mut self, id: Id, depth: Lvl, ty: Term) {
        self.entries.insert(id, TypeEntry { depth, ty });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id, &TypeEntry)> {
        self.entries.iter().map(|(id, entry)| (*id, entry))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TypeEntry> {
        self.entries.values_mut()
    }
}

/// Output of elaborating one unit.
pub struct Elaborated {
    pub item: Item,
    pub types: TypeTable,
    pub diagnostics: Diagnostics,
    /// Holds the unit's metavariable solutions; needed by the zonker and
    /// the stager.
    pub norm: Normalizer,
}

/// Checker state for one unit.
pub struct Elaborator {
    pub norm: Normalizer,
    pub(crate) types: TypeTable,
    pub(crate) diagnostics: Diagnostics,
    /// Enclosing module path, outermost first.
    pub(crate) module_path: Vec<Name>,
    /// Modifiers inherited from enclosing modules.
    pub(crate) inherited: Modifiers,
}

impl Elaborator {
    pub fn new(norm: Normalizer) -> Self {
        Elaborator {
            norm,
            types: TypeTable::default(),
            diagnostics: Diagnostics::new(),
            module_path: Vec::new(),
            inherited: Modifiers::empty(),
        }
    }

    /// Elaborate items as if nested in the module `path` (segments joined
    /// by `/`).
    pub fn in_module(mut self, path: Name) -> Self {
        if path != Name::EMPTY {
            self.module_path = path.as_str().split(Name::SEPARATOR).map(Name::new).collect();
        }
        self
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(%diagnostic, "diagnostic");
        self.diagnostics.push(diagnostic);
    }

    pub(crate) fn record(&mut self, ctx: &Ctx, id: Id, ty: &Value) {
        let quoted = self.norm.quote(ctx.depth(), ty);
        self.types.insert(id, ctx.depth(), quoted);
    }

    pub(crate) fn quote(&self, ctx: &Ctx, value: &Value) -> Term {
        self.norm.quote(ctx.depth(), value)
    }

    pub(crate) fn eval(&self, ctx: &Ctx, term: &Term) -> Value {
        self.norm.eval(&ctx.env, term)
    }

    /// Fresh metavariable applied to every bound (non-let) variable.
    pub(crate) fn fresh_meta(&mut self, ctx: &Ctx) -> Term {
        let meta = Term::Meta(self.norm.fresh_meta());
        let spine: Vec<Term> = ctx
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.defined)
            .map(|(i, entry)| Term::var(entry.name, Lvl::from_index(i)))
            .collect();
        if spine.is_empty() {
            meta
        } else {
            Term::apply(meta, spine)
        }
    }

    pub(crate) fn fresh_meta_value(&mut self, ctx: &Ctx) -> Value {
        let term = self.fresh_meta(ctx);
        self.eval(ctx, &term)
    }

    /// Qualified name of `name` declared in the current module.
    pub(crate) fn qualify(&self, name: Name) -> Name {
        self.module_path
            .iter()
            .rev()
            .fold(name, |acc, segment| segment.join(acc))
    }

    pub fn into_elaborated(self, item: Item) -> Elaborated {
        Elaborated {
            item,
            types: self.types,
            diagnostics: self.diagnostics,
            norm: self.norm,
        }
    }
}

/// Elaborate one top-level unit against the shared definition table.
#[tracing::instrument(level = "debug", skip_all, fields(item = %surface_name(item)))]
pub fn elaborate_item(defs: Arc<DefTable>, builtins: Arc<Builtins>, item: &SItem) -> Elaborated {
    let mut elab = Elaborator::new(Normalizer::new(defs, builtins));
    let core = elab.elaborate_item(item);
    tracing::debug!(
        diagnostics = elab.diagnostics.len(),
        metas = elab.norm.meta_count(),
        "elaboration complete"
    );
    elab.into_elaborated(core)
}

fn surface_name(item: &SItem) -> Name {
    match item {
        SItem::Def(def) => def.name,
        SItem::Mod(module) => module.name,
        SItem::Test(test) => test.name,
    }
}

/// Effect labels as a set.
pub(crate) fn effect_set(names: &[Name]) -> EffectSet {
    names.iter().copied().collect()
}

#[cfg(test)]
mod tests;
