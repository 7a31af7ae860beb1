//! Core terms.
//!
//! The typed-pipeline IR shared by every stage from elaboration to
//! packing. Variables are de Bruijn **levels** ([`Lvl`]), so a term keeps
//! its meaning when it is moved under more binders; only the normalizer's
//! quote step ever renumbers binders.
//!
//! # Binding structure
//!
//! | Former | Binds |
//! |---|---|
//! | `Let` | one level for `body` |
//! | `Match` clause | one level per pattern variable, left to right |
//! | `FunOf` | one level per parameter; parameter `i`'s type sees params `0..i` |
//! | `Fun` | same as `FunOf`; `result` sees every parameter |

mod format;
mod order;

use crate::{EffectSet, Lvl, MetaId, Name, Pattern};

/// Core term.
///
/// Literal formers end in `Of`; the bare names (`Int`, `List`, ...) are the
/// corresponding type formers.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub enum Term {
    /// Placeholder left behind by a failed elaboration.
    Hole,
    /// Metavariable, solved through the normalizer.
    Meta(MetaId),
    /// Local variable.
    Var { name: Name, level: Lvl },
    /// Reference to a top-level definition by qualified name.
    Def(Name),
    Let {
        name: Name,
        ty: Box<Term>,
        init: Box<Term>,
        body: Box<Term>,
    },
    Match {
        scrutinee: Box<Term>,
        clauses: Vec<(Pattern, Term)>,
    },

    // Literals
    UnitOf,
    BoolOf(bool),
    ByteOf(i8),
    ShortOf(i16),
    IntOf(i32),
    LongOf(i64),
    FloatOf(f32),
    DoubleOf(f64),
    StringOf(String),
    ByteArrayOf(Vec<Term>),
    IntArrayOf(Vec<Term>),
    LongArrayOf(Vec<Term>),
    ListOf(Vec<Term>),
    CompoundOf(Vec<(Name, Term)>),
    TupleOf(Vec<Term>),
    RefOf(Box<Term>),
    Refl,

    /// Closure literal.
    FunOf {
        params: Vec<Binder>,
        body: Box<Term>,
    },
    Apply {
        func: Box<Term>,
        args: Vec<Term>,
    },

    // Staging
    CodeOf(Box<Term>),
    Splice(Box<Term>),

    // Type formers
    Or(Vec<Term>),
    And(Vec<Term>),
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
    List(Box<Term>),
    Compound(Vec<(Name, Term)>),
    Tuple(Vec<Term>),
    Ref(Box<Term>),
    Eq(Box<Term>, Box<Term>),
    Fun(Box<FunType>),
    Code(Box<Term>),
    Type,
}

/// Closure parameter.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct Binder {
    pub name: Name,
    /// Whether the argument exists at runtime.
    pub relevant: bool,
    pub ty: Term,
}

/// Parameter of a dependent function type.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct Param {
    pub name: Name,
    /// Whether the argument exists at runtime.
    pub relevant: bool,
    /// Every argument must be a supertype of this bound.
    pub lower: Option<Term>,
    /// Every argument must be a subtype of this bound.
    pub upper: Option<Term>,
    /// Whether this parameter may determine the runtime representation of
    /// other binders' types.
    pub type_relevant: bool,
    pub ty: Term,
}

impl Param {
    /// A relevant, unbounded parameter.
    pub fn new(name: Name, ty: Term) -> Self {
        Param {
            name,
            relevant: true,
            lower: None,
            upper: None,
            type_relevant: true,
            ty,
        }
    }

    /// An erased parameter (e.g. a type argument).
    pub fn erased(name: Name, ty: Term) -> Self {
        Param {
            relevant: false,
            ..Param::new(name, ty)
        }
    }
}

/// Dependent function type.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub struct FunType {
    pub params: Vec<Param>,
    pub result: Term,
    pub effects: EffectSet,
}

impl Term {
    pub fn var(name: impl Into<Name>, level: Lvl) -> Term {
        Term::Var {
            name: name.into(),
            level,
        }
    }

    pub fn apply(func: Term, args: Vec<Term>) -> Term {
        Term::Apply {
            func: Box::new(func),
            args,
        }
    }

    pub fn fun(params: Vec<Param>, result: Term, effects: EffectSet) -> Term {
        Term::Fun(Box::new(FunType {
            params,
            result,
            effects,
        }))
    }

    /// Whether this is a literal scalar (the forms a register or a single
    /// store entry can hold without further structure).
    pub fn is_scalar_literal(&self) -> bool {
        matches!(
            self,
            Term::UnitOf
                | Term::BoolOf(_)
                | Term::ByteOf(_)
                | Term::ShortOf(_)
                | Term::IntOf(_)
                | Term::LongOf(_)
                | Term::FloatOf(_)
                | Term::DoubleOf(_)
                | Term::StringOf(_)
                | Term::Refl
        )
    }

    /// Whether the term is built only from literal formers.
    pub fn is_constant(&self) -> bool {
        match self {
            Term::ByteArrayOf(elems)
            | Term::IntArrayOf(elems)
            | Term::LongArrayOf(elems)
            | Term::ListOf(elems)
            | Term::TupleOf(elems) => elems.iter().all(Term::is_constant),
            Term::CompoundOf(fields) => fields.iter().all(|(_, t)| t.is_constant()),
            Term::RefOf(elem) => elem.is_constant(),
            other => other.is_scalar_literal(),
        }
    }
}
