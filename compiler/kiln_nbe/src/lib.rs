//! Normalization by evaluation for the Kiln core language.
//!
//! [`Normalizer::eval`] turns a [`Term`] into a weak-head [`Value`] and
//! [`Normalizer::quote`] reads it back; `quote ∘ eval` is normalization.
//! The normalizer also owns the unit's metavariable store, which only
//! [`Normalizer::fresh_meta`], [`Normalizer::solution`] and
//! [`Normalizer::solve`] touch, and implements conversion checking with
//! pattern unification ([`Normalizer::unify`]).
//!
//! # Unfolding
//!
//! Only compile-time (`CONST`) definitions with a body unfold. Runtime
//! definitions compile to units of their own and stay neutral, as do
//! abstract definitions and members of opaque modules. Builtins are
//! neutral too, but applying one first consults the [`Builtins`] table.

mod builtins;
mod eval;
mod lazy;
mod quote;
mod unify;
mod value;

use std::sync::Arc;

use kiln_ir::{Def, DefTable, MetaId, Name, Term};
use rustc_hash::FxHashMap;

pub use builtins::{Builtins, FoldRule};
pub use lazy::{Env, Lazy};
pub use value::{Closure, FunClosure, Generation, Value};

/// Evaluation engine and metavariable store of one compilation unit.
///
/// Not shared across threads: each unit's pipeline owns its own.
pub struct Normalizer {
    defs: Arc<DefTable>,
    /// Definitions of the unit being compiled, shadowing `defs`.
    local: FxHashMap<Name, Arc<Def>>,
    builtins: Arc<Builtins>,
    metas: Vec<Option<Value>>,
    generation: Generation,
}

impl Normalizer {
    pub fn new(defs: Arc<DefTable>, builtins: Arc<Builtins>) -> Self {
        Normalizer {
            defs,
            local: FxHashMap::default(),
            builtins,
            metas: Vec::new(),
            generation: Generation::default(),
        }
    }

    /// A normalizer with no definitions and the default builtins.
    pub fn standalone() -> Self {
        Self::new(Arc::new(DefTable::new()), Arc::new(Builtins::default()))
    }

    /// Register a definition of the current unit.
    pub fn define_local(&mut self, def: Def) {
        self.local.insert(def.name, Arc::new(def));
    }

    pub fn lookup_def(&self, name: Name) -> Option<&Arc<Def>> {
        self.local.get(&name).or_else(|| self.defs.get(name))
    }

    pub fn defs(&self) -> &Arc<DefTable> {
        &self.defs
    }

    pub fn builtins(&self) -> &Arc<Builtins> {
        &self.builtins
    }

    /// Allocate an unsolved metavariable.
    pub fn fresh_meta(&mut self) -> MetaId {
        let id = MetaId::new(u32::try_from(self.metas.len()).unwrap_or(u32::MAX));
        self.metas.push(None);
        id
    }

    pub fn solution(&self, meta: MetaId) -> Option<&Value> {
        self.metas.get(meta.index()).and_then(Option::as_ref)
    }

    /// Record a solution. The first solve wins: returns `false` and keeps
    /// the existing solution if `meta` is already solved.
    pub fn solve(&mut self, meta: MetaId, value: Value) -> bool {
        match self.metas.get_mut(meta.index()) {
            Some(slot) if slot.is_none() => {
                tracing::trace!(%meta, "meta solved");
                *slot = Some(value);
                self.generation = self.generation.next();
                true
            }
            _ => false,
        }
    }

    /// Advances with every solved metavariable.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn meta_count(&self) -> usize {
        self.metas.len()
    }

    /// Metavariables without a solution.
    pub fn unsolved(&self) -> impl Iterator<Item = MetaId> + '_ {
        self.metas
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| MetaId::new(u32::try_from(i).unwrap_or(u32::MAX)))
    }

    /// `quote(eval(term))` at the depth of `env`.
    pub fn normalize(&self, env: &Env, term: &Term) -> Term {
        let value = self.eval(env, term);
        self.quote(env.depth(), &value)
    }
}
