//! Generic one-level traversal of [`Term`] children.
//!
//! Passes that only care about a few variants match those and delegate the
//! rest here. Each child is handed over together with the context depth
//! it lives at, following the binding table in [`crate::term`].

use std::convert::Infallible;

use crate::{Binder, FunType, Lvl, Param, Term};

fn map_all<E>(
    terms: Vec<Term>,
    depth: Lvl,
    f: &mut impl FnMut(Term, Lvl) -> Result<Term, E>,
) -> Result<Vec<Term>, E> {
    terms.into_iter().map(|t| f(t, depth)).collect()
}

fn map_boxed<E>(
    term: Box<Term>,
    depth: Lvl,
    f: &mut impl FnMut(Term, Lvl) -> Result<Term, E>,
) -> Result<Box<Term>, E> {
    f(*term, depth).map(Box::new)
}

fn map_param<E>(
    param: Param,
    depth: Lvl,
    f: &mut impl FnMut(Term, Lvl) -> Result<Term, E>,
) -> Result<Param, E> {
    Ok(Param {
        lower: param.lower.map(|t| f(t, depth)).transpose()?,
        upper: param.upper.map(|t| f(t, depth)).transpose()?,
        ty: f(param.ty, depth)?,
        ..param
    })
}

impl Term {
    /// Rebuild `self` with `f` applied to every immediate child.
    ///
    /// `depth` is the context depth of `self`.
    pub fn try_map_children<E>(
        self,
        depth: Lvl,
        f: &mut impl FnMut(Term, Lvl) -> Result<Term, E>,
    ) -> Result<Term, E> {
        Ok(match self {
            Term::Let {
                name,
                ty,
                init,
                body,
            } => Term::Let {
                name,
                ty: map_boxed(ty, depth, f)?,
                init: map_boxed(init, depth, f)?,
                body: map_boxed(body, depth.next(), f)?,
            },
            Term::Match { scrutinee, clauses } => Term::Match {
                scrutinee: map_boxed(scrutinee, depth, f)?,
                clauses: clauses
                    .into_iter()
                    .map(|(pat, body)| {
                        let inner = depth.plus(pat.binder_count());
                        f(body, inner).map(|body| (pat, body))
                    })
                    .collect::<Result<_, E>>()?,
            },
            Term::ByteArrayOf(elems) => Term::ByteArrayOf(map_all(elems, depth, f)?),
            Term::IntArrayOf(elems) => Term::IntArrayOf(map_all(elems, depth, f)?),
            Term::LongArrayOf(elems) => Term::LongArrayOf(map_all(elems, depth, f)?),
            Term::ListOf(elems) => Term::ListOf(map_all(elems, depth, f)?),
            Term::TupleOf(elems) => Term::TupleOf(map_all(elems, depth, f)?),
            Term::CompoundOf(fields) => Term::CompoundOf(
                fields
                    .into_iter()
                    .map(|(k, v)| f(v, depth).map(|v| (k, v)))
                    .collect::<Result<_, E>>()?,
            ),
            Term::RefOf(elem) => Term::RefOf(map_boxed(elem, depth, f)?),
            Term::FunOf { params, body } => {
                let n = params.len();
                let params = params
                    .into_iter()
                    .enumerate()
                    .map(|(i, b)| {
                        f(b.ty, depth.plus(i)).map(|ty| Binder { ty, ..b })
                    })
                    .collect::<Result<_, E>>()?;
                Term::FunOf {
                    params,
                    body: map_boxed(body, depth.plus(n), f)?,
                }
            }
            Term::Apply { func, args } => Term::Apply {
                func: map_boxed(func, depth, f)?,
                args: map_all(args, depth, f)?,
            },
            Term::CodeOf(t) => Term::CodeOf(map_boxed(t, depth, f)?),
            Term::Splice(t) => Term::Splice(map_boxed(t, depth, f)?),
            Term::Or(ts) => Term::Or(map_all(ts, depth, f)?),
            Term::And(ts) => Term::And(map_all(ts, depth, f)?),
            Term::List(t) => Term::List(map_boxed(t, depth, f)?),
            Term::Compound(fields) => Term::Compound(
                fields
                    .into_iter()
                    .map(|(k, v)| f(v, depth).map(|v| (k, v)))
                    .collect::<Result<_, E>>()?,
            ),
            Term::Tuple(elems) => Term::Tuple(map_all(elems, depth, f)?),
            Term::Ref(t) => Term::Ref(map_boxed(t, depth, f)?),
            Term::Eq(l, r) => Term::Eq(map_boxed(l, depth, f)?, map_boxed(r, depth, f)?),
            Term::Fun(fun) => {
                let FunType {
                    params,
                    result,
                    effects,
                } = *fun;
                let n = params.len();
                let params = params
                    .into_iter()
                    .enumerate()
                    .map(|(i, p)| map_param(p, depth.plus(i), f))
                    .collect::<Result<_, E>>()?;
                Term::Fun(Box::new(FunType {
                    params,
                    result: f(result, depth.plus(n))?,
                    effects,
                }))
            }
            Term::Code(t) => Term::Code(map_boxed(t, depth, f)?),
            leaf @ (Term::Hole
            | Term::Meta(_)
            | Term::Var { .. }
            | Term::Def(_)
            | Term::UnitOf
            | Term::BoolOf(_)
            | Term::ByteOf(_)
            | Term::ShortOf(_)
            | Term::IntOf(_)
            | Term::LongOf(_)
            | Term::FloatOf(_)
            | Term::DoubleOf(_)
            | Term::StringOf(_)
            | Term::Refl
            | Term::Unit
            | Term::Bool
            | Term::Byte
            | Term::Short
            | Term::Int
            | Term::Long
            | Term::Float
            | Term::Double
            | Term::String
            | Term::ByteArray
            | Term::IntArray
            | Term::LongArray
            | Term::Type) => leaf,
        })
    }

    /// Infallible variant of [`Term::try_map_children`].
    pub fn map_children(self, depth: Lvl, f: &mut impl FnMut(Term, Lvl) -> Term) -> Term {
        let result: Result<Term, Infallible> = self.try_map_children(depth, &mut |t, d| Ok(f(t, d)));
        match result {
            Ok(term) => term,
            Err(never) => match never {},
        }
    }

    /// Call `f` on every immediate child with its context depth.
    pub fn visit_children(&self, depth: Lvl, f: &mut impl FnMut(&Term, Lvl)) {
        match self {
            Term::Let { ty, init, body, .. } => {
                f(ty, depth);
                f(init, depth);
                f(body, depth.next());
            }
            Term::Match { scrutinee, clauses } => {
                f(scrutinee, depth);
                for (pat, body) in clauses {
                    f(body, depth.plus(pat.binder_count()));
                }
            }
            Term::ByteArrayOf(elems)
            | Term::IntArrayOf(elems)
            | Term::LongArrayOf(elems)
            | Term::ListOf(elems)
            | Term::TupleOf(elems)
            | Term::Or(elems)
            | Term::And(elems)
            | Term::Tuple(elems) => {
                for elem in elems {
                    f(elem, depth);
                }
            }
            Term::CompoundOf(fields) | Term::Compound(fields) => {
                for (_, v) in fields {
                    f(v, depth);
                }
            }
            Term::RefOf(t) | Term::CodeOf(t) | Term::Splice(t) | Term::List(t) | Term::Ref(t)
            | Term::Code(t) => f(t, depth),
            Term::FunOf { params, body } => {
                for (i, b) in params.iter().enumerate() {
                    f(&b.ty, depth.plus(i));
                }
                f(body, depth.plus(params.len()));
            }
            Term::Apply { func, args } => {
                f(func, depth);
                for arg in args {
                    f(arg, depth);
                }
            }
            Term::Eq(l, r) => {
                f(l, depth);
                f(r, depth);
            }
            Term::Fun(fun) => {
                for (i, p) in fun.params.iter().enumerate() {
                    let d = depth.plus(i);
                    if let Some(lower) = &p.lower {
                        f(lower, d);
                    }
                    if let Some(upper) = &p.upper {
                        f(upper, d);
                    }
                    f(&p.ty, d);
                }
                f(&fun.result, depth.plus(fun.params.len()));
            }
            Term::Hole
            | Term::Meta(_)
            | Term::Var { .. }
            | Term::Def(_)
            | Term::UnitOf
            | Term::BoolOf(_)
            | Term::ByteOf(_)
            | Term::ShortOf(_)
            | Term::IntOf(_)
            | Term::LongOf(_)
            | Term::FloatOf(_)
            | Term::DoubleOf(_)
            | Term::StringOf(_)
            | Term::Refl
            | Term::Unit
            | Term::Bool
            | Term::Byte
            | Term::Short
            | Term::Int
            | Term::Long
            | Term::Float
            | Term::Double
            | Term::String
            | Term::ByteArray
            | Term::IntArray
            | Term::LongArray
            | Term::Type => {}
        }
    }

    /// Whether `pred` holds for this term or any descendant.
    pub fn any(&self, depth: Lvl, pred: &mut impl FnMut(&Term, Lvl) -> bool) -> bool {
        if pred(self, depth) {
            return true;
        }
        let mut found = false;
        self.visit_children(depth, &mut |child, d| {
            if !found {
                found = child.any(d, pred);
            }
        });
        found
    }
}
