//! Surface tree: the parser's output shape.
//!
//! Same constructs as the core [`Term`](crate::Term) with names instead of
//! levels, optional annotations and an [`Id`] on every expression. Patterns
//! carry no types, so surface and core share [`Pattern`].

mod builder;

pub use builder::SurfaceBuilder;

use crate::{Id, Modifiers, ModuleKind, Name, Pattern};

/// Surface pattern.
pub type SPattern = Pattern;

#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub id: Id,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// Unknown term to be inferred.
    Hole,
    /// Local or definition reference; may be a `/`-qualified path.
    Var(Name),
    Let {
        name: Name,
        anno: Option<Box<Expr>>,
        init: Box<Expr>,
        body: Box<Expr>,
    },
    Match {
        scrutinee: Box<Expr>,
        clauses: Vec<(SPattern, Expr)>,
    },
    /// Type ascription `expr : ty`.
    Anno {
        expr: Box<Expr>,
        ty: Box<Expr>,
    },

    UnitOf,
    BoolOf(bool),
    ByteOf(i8),
    ShortOf(i16),
    IntOf(i32),
    LongOf(i64),
    FloatOf(f32),
    DoubleOf(f64),
    StringOf(String),
    ByteArrayOf(Vec<Expr>),
    IntArrayOf(Vec<Expr>),
    LongArrayOf(Vec<Expr>),
    ListOf(Vec<Expr>),
    CompoundOf(Vec<(Name, Expr)>),
    TupleOf(Vec<Expr>),
    RefOf(Box<Expr>),
    Refl,

    FunOf {
        params: Vec<SBinder>,
        body: Box<Expr>,
    },
    Apply {
        func: Box<Expr>,
        args: Vec<Expr>,
    },

    CodeOf(Box<Expr>),
    Splice(Box<Expr>),

    Or(Vec<Expr>),
    And(Vec<Expr>),
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
    List(Box<Expr>),
    Compound(Vec<(Name, Expr)>),
    Tuple(Vec<Expr>),
    Ref(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Fun {
        params: Vec<SParam>,
        result: Box<Expr>,
        effects: Vec<Name>,
    },
    Code(Box<Expr>),
    Type,
}

/// Lambda parameter; an omitted type is inferred.
#[derive(Clone, Debug, PartialEq)]
pub struct SBinder {
    pub name: Name,
    pub relevant: bool,
    pub ty: Option<Expr>,
}

/// Function-type parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct SParam {
    pub name: Name,
    pub relevant: bool,
    pub lower: Option<Expr>,
    pub upper: Option<Expr>,
    pub type_relevant: bool,
    pub ty: Expr,
}

impl SParam {
    pub fn new(name: impl Into<Name>, ty: Expr) -> Self {
        SParam {
            name: name.into(),
            relevant: true,
            lower: None,
            upper: None,
            type_relevant: true,
            ty,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SItem {
    Def(SDef),
    Mod(SModule),
    Test(STest),
}

/// Surface definition. `name` is relative to the enclosing module.
#[derive(Clone, Debug, PartialEq)]
pub struct SDef {
    pub id: Id,
    pub name: Name,
    pub modifiers: Modifiers,
    pub params: Vec<SParam>,
    pub result: Expr,
    pub effects: Vec<Name>,
    pub body: Option<Expr>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SModule {
    pub id: Id,
    pub name: Name,
    pub modifiers: Modifiers,
    pub kind: ModuleKind,
    pub items: Vec<SItem>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct STest {
    pub id: Id,
    pub name: Name,
    pub body: Expr,
}
