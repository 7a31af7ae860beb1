//! Memoized thunks and evaluation environments.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use kiln_ir::{Lvl, Term};

use crate::{Generation, Normalizer, Value};

/// A value computed at most once.
///
/// Either already evaluated, or a term paired with the environment it
/// must be evaluated in. Clones share the memo.
#[derive(Clone)]
pub struct Lazy(Rc<LazyCell>);

struct LazyCell {
    memo: OnceCell<Value>,
    deferred: Option<(Env, Term)>,
    /// `memo` after [`Normalizer::force`], valid for one generation.
    forced: RefCell<Option<(Generation, Value)>>,
}

impl Lazy {
    /// An already-evaluated value.
    pub fn ready(value: Value) -> Self {
        Lazy(Rc::new(LazyCell {
            memo: OnceCell::from(value),
            deferred: None,
            forced: RefCell::new(None),
        }))
    }

    /// Evaluate `term` in `env` on first demand.
    pub fn deferred(env: Env, term: Term) -> Self {
        Lazy(Rc::new(LazyCell {
            memo: OnceCell::new(),
            deferred: Some((env, term)),
            forced: RefCell::new(None),
        }))
    }

    /// The value, evaluating it if this is the first demand.
    ///
    /// The result is not forced: a metavariable solved after the memo was
    /// filled still shows up as a neutral until [`Normalizer::force`].
    pub fn value(&self, norm: &Normalizer) -> Value {
        self.0
            .memo
            .get_or_init(|| match &self.0.deferred {
                Some((env, term)) => norm.eval(env, term),
                None => Value::Hole,
            })
            .clone()
    }

    /// The forced value. Forcing is redone only after another
    /// metavariable has been solved, so a stuck builtin application shared
    /// by several parents is folded once per generation.
    pub fn forced(&self, norm: &Normalizer) -> Value {
        let generation = norm.generation();
        if let Some((at, value)) = &*self.0.forced.borrow() {
            if *at == generation {
                return value.clone();
            }
        }
        let value = norm.force(self.value(norm));
        *self.0.forced.borrow_mut() = Some((generation, value.clone()));
        value
    }

    /// The value, if it has been computed.
    pub fn peek(&self) -> Option<&Value> {
        self.0.memo.get()
    }
}

impl fmt::Debug for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.0.memo.get(), &self.0.deferred) {
            (Some(value), _) => write!(f, "{value:?}"),
            (None, Some((_, term))) => write!(f, "<thunk {term}>"),
            (None, None) => f.write_str("<empty>"),
        }
    }
}

/// Evaluation environment: one lazy value per bound level.
///
/// Append-only. Cloning is cheap; pushing onto a shared environment copies
/// it first, so closures keep the environment they captured.
#[derive(Clone, Default)]
pub struct Env(Rc<Vec<Lazy>>);

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Level the next pushed entry will occupy.
    pub fn depth(&self) -> Lvl {
        Lvl::from_index(self.0.len())
    }

    pub fn get(&self, level: Lvl) -> Option<&Lazy> {
        self.0.get(level.index())
    }

    pub fn push(&mut self, value: Lazy) {
        Rc::make_mut(&mut self.0).push(value);
    }

    /// A copy extended with `values`.
    pub fn extended(&self, values: impl IntoIterator<Item = Lazy>) -> Env {
        let mut env = self.clone();
        Rc::make_mut(&mut env.0).extend(values);
        env
    }

    /// An environment binding levels `0..depth` to themselves as free
    /// variables.
    pub fn identity(names: impl IntoIterator<Item = kiln_ir::Name>) -> Env {
        Env(Rc::new(
            names
                .into_iter()
                .enumerate()
                .map(|(i, name)| Lazy::ready(Value::Var(name, Lvl::from_index(i))))
                .collect(),
        ))
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}
