//! Semantic domain.

use std::rc::Rc;

use kiln_ir::{Binder, FunType, Lvl, MetaId, Name, Pattern, Term};

use crate::{Env, Lazy, Normalizer};

/// Weak-head value.
///
/// Every subterm is a [`Lazy`] so shared arguments are evaluated once.
/// The neutral forms (`Hole` through `Splice`) are stuck on something
/// unknown; everything else mirrors a [`Term`] former.
#[derive(Clone, Debug)]
pub enum Value {
    Hole,
    Meta(MetaId),
    /// Free variable.
    Var(Name, Lvl),
    /// Definition that does not unfold, applied to its arguments so far.
    /// For a builtin, the generation its fold rule last ran in.
    Def(Name, Vec<Lazy>, Generation),
    /// Neutral head applied to arguments.
    Apply(Box<Value>, Vec<Lazy>),
    /// Match stuck on its scrutinee.
    Match(Box<Value>, Env, Rc<[(Pattern, Term)]>),
    Splice(Box<Value>),

    UnitOf,
    BoolOf(bool),
    ByteOf(i8),
    ShortOf(i16),
    IntOf(i32),
    LongOf(i64),
    FloatOf(f32),
    DoubleOf(f64),
    StringOf(Rc<str>),
    ByteArrayOf(Vec<Lazy>),
    IntArrayOf(Vec<Lazy>),
    LongArrayOf(Vec<Lazy>),
    ListOf(Vec<Lazy>),
    CompoundOf(Vec<(Name, Lazy)>),
    TupleOf(Vec<Lazy>),
    RefOf(Lazy),
    Refl,
    FunOf(Rc<Closure>),
    CodeOf(Lazy),

    Or(Vec<Lazy>),
    And(Vec<Lazy>),
    Unit,
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    String,
    ByteArray,
    IntArray,
    LongArray,
    List(Lazy),
    Compound(Vec<(Name, Lazy)>),
    Tuple(Vec<Lazy>),
    Ref(Lazy),
    Eq(Lazy, Lazy),
    Fun(Rc<FunClosure>),
    Code(Lazy),
    Type,
}

impl Value {
    pub fn var(name: Name, level: Lvl) -> Value {
        Value::Var(name, level)
    }

    /// Stuck on an unknown: cannot reduce until a variable, metavariable
    /// or opaque definition is resolved.
    pub fn is_neutral(&self) -> bool {
        matches!(
            self,
            Value::Hole
                | Value::Meta(_)
                | Value::Var(..)
                | Value::Def(..)
                | Value::Apply(..)
                | Value::Match(..)
                | Value::Splice(_)
        )
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::IntOf(n) => Some(*n),
            _ => None,
        }
    }
}

/// Count of solved metavariables at some point of a unit's elaboration.
///
/// Values only change meaning when a metavariable is solved, so anything
/// computed from a value can be reused while the generation stays the same.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(usize);

impl Generation {
    pub(crate) fn next(self) -> Generation {
        Generation(self.0 + 1)
    }
}

/// Closure literal: the body waits for one value per parameter.
#[derive(Debug)]
pub struct Closure {
    pub env: Env,
    pub params: Vec<Binder>,
    pub body: Term,
}

impl Closure {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Type of parameter `index`, given the arguments before it.
    pub fn param_ty(&self, norm: &Normalizer, index: usize, before: &[Lazy]) -> Value {
        match self.params.get(index) {
            Some(binder) => norm.eval(&self.env.extended(before.iter().cloned()), &binder.ty),
            None => Value::Hole,
        }
    }

    pub fn instantiate(&self, norm: &Normalizer, args: &[Lazy]) -> Value {
        norm.eval(&self.env.extended(args.iter().cloned()), &self.body)
    }
}

/// Dependent function type awaiting its parameters.
#[derive(Debug)]
pub struct FunClosure {
    pub env: Env,
    pub ty: FunType,
}

impl FunClosure {
    pub fn arity(&self) -> usize {
        self.ty.params.len()
    }

    fn env_with(&self, before: &[Lazy]) -> Env {
        self.env.extended(before.iter().cloned())
    }

    /// Type of parameter `index`, given the arguments before it.
    pub fn param_ty(&self, norm: &Normalizer, index: usize, before: &[Lazy]) -> Value {
        match self.ty.params.get(index) {
            Some(param) => norm.eval(&self.env_with(before), &param.ty),
            None => Value::Hole,
        }
    }

    pub fn upper(&self, norm: &Normalizer, index: usize, before: &[Lazy]) -> Option<Value> {
        let param = self.ty.params.get(index)?;
        let upper = param.upper.as_ref()?;
        Some(norm.eval(&self.env_with(before), upper))
    }

    pub fn lower(&self, norm: &Normalizer, index: usize, before: &[Lazy]) -> Option<Value> {
        let param = self.ty.params.get(index)?;
        let lower = param.lower.as_ref()?;
        Some(norm.eval(&self.env_with(before), lower))
    }

    pub fn result(&self, norm: &Normalizer, args: &[Lazy]) -> Value {
        norm.eval(&self.env_with(args), &self.ty.result)
    }
}
