//! Match patterns.

use smallvec::SmallVec;

use crate::Name;

/// Pattern of a `match` clause.
///
/// Mirrors the value formers of [`Term`](crate::Term). Each [`Pattern::Var`]
/// binds the next context level; variables are numbered left to right in
/// a depth-first walk.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub enum Pattern {
    UnitOf,
    BoolOf(bool),
    ByteOf(i8),
    ShortOf(i16),
    IntOf(i32),
    LongOf(i64),
    FloatOf(f32),
    DoubleOf(f64),
    StringOf(String),
    ByteArrayOf(Vec<Pattern>),
    IntArrayOf(Vec<Pattern>),
    LongArrayOf(Vec<Pattern>),
    ListOf(Vec<Pattern>),
    CompoundOf(Vec<(Name, Pattern)>),
    TupleOf(Vec<Pattern>),
    RefOf(Box<Pattern>),
    Refl,
    Var(Name),
    Drop,
}

impl Pattern {
    /// Number of levels the pattern binds.
    pub fn binder_count(&self) -> usize {
        match self {
            Pattern::Var(_) => 1,
            Pattern::ByteArrayOf(elems)
            | Pattern::IntArrayOf(elems)
            | Pattern::LongArrayOf(elems)
            | Pattern::ListOf(elems)
            | Pattern::TupleOf(elems) => elems.iter().map(Pattern::binder_count).sum(),
            Pattern::CompoundOf(fields) => fields.iter().map(|(_, p)| p.binder_count()).sum(),
            Pattern::RefOf(elem) => elem.binder_count(),
            _ => 0,
        }
    }

    /// Names of the bound variables, in level order.
    pub fn binders(&self) -> SmallVec<[Name; 4]> {
        let mut out = SmallVec::new();
        self.collect_binders(&mut out);
        out
    }

    fn collect_binders(&self, out: &mut SmallVec<[Name; 4]>) {
        match self {
            Pattern::Var(name) => out.push(*name),
            Pattern::ByteArrayOf(elems)
            | Pattern::IntArrayOf(elems)
            | Pattern::LongArrayOf(elems)
            | Pattern::ListOf(elems)
            | Pattern::TupleOf(elems) => {
                for elem in elems {
                    elem.collect_binders(out);
                }
            }
            Pattern::CompoundOf(fields) => {
                for (_, p) in fields {
                    p.collect_binders(out);
                }
            }
            Pattern::RefOf(elem) => elem.collect_binders(out),
            _ => {}
        }
    }

    /// Whether the pattern matches every value of its type.
    pub fn is_irrefutable(&self) -> bool {
        match self {
            Pattern::Var(_) | Pattern::Drop | Pattern::UnitOf | Pattern::Refl => true,
            Pattern::TupleOf(elems) => elems.iter().all(Pattern::is_irrefutable),
            Pattern::CompoundOf(fields) => fields.iter().all(|(_, p)| p.is_irrefutable()),
            Pattern::RefOf(elem) => elem.is_irrefutable(),
            _ => false,
        }
    }
}
