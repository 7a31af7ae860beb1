//! Human-readable rendering of core terms for diagnostics and logs.
//!
//! Variables print with their level (`x%3`) so that shadowed names stay
//! distinguishable. The output is not meant to be parsed back.

use std::fmt::{self, Write};

use super::{FunType, Term};
use crate::Pattern;

fn comma_sep<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    mut each: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        each(f, item)?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Hole => f.write_str("_"),
            Term::Meta(meta) => write!(f, "{meta}"),
            Term::Var { name, level } => write!(f, "{name}{level}"),
            Term::Def(name) => write!(f, "{name}"),
            Term::Let {
                name,
                ty,
                init,
                body,
            } => write!(f, "(let {name}: {ty} = {init}; {body})"),
            Term::Match { scrutinee, clauses } => {
                write!(f, "match {scrutinee} {{")?;
                comma_sep(f, clauses, |f, (pat, body)| write!(f, "{pat} -> {body}"))?;
                f.write_char('}')
            }
            Term::UnitOf => f.write_str("()"),
            Term::BoolOf(b) => write!(f, "{b}"),
            Term::ByteOf(n) => write!(f, "{n}b"),
            Term::ShortOf(n) => write!(f, "{n}s"),
            Term::IntOf(n) => write!(f, "{n}"),
            Term::LongOf(n) => write!(f, "{n}l"),
            Term::FloatOf(n) => write!(f, "{n}f"),
            Term::DoubleOf(n) => write!(f, "{n}d"),
            Term::StringOf(s) => write!(f, "{s:?}"),
            Term::ByteArrayOf(elems) => {
                f.write_str("[b; ")?;
                comma_sep(f, elems, |f, e| write!(f, "{e}"))?;
                f.write_char(']')
            }
            Term::IntArrayOf(elems) => {
                f.write_str("[i; ")?;
                comma_sep(f, elems, |f, e| write!(f, "{e}"))?;
                f.write_char(']')
            }
            Term::LongArrayOf(elems) => {
                f.write_str("[l; ")?;
                comma_sep(f, elems, |f, e| write!(f, "{e}"))?;
                f.write_char(']')
            }
            Term::ListOf(elems) => {
                f.write_char('[')?;
                comma_sep(f, elems, |f, e| write!(f, "{e}"))?;
                f.write_char(']')
            }
            Term::CompoundOf(fields) => {
                f.write_char('{')?;
                comma_sep(f, fields, |f, (k, v)| write!(f, "{k}: {v}"))?;
                f.write_char('}')
            }
            Term::TupleOf(elems) => {
                f.write_char('(')?;
                comma_sep(f, elems, |f, e| write!(f, "{e}"))?;
                f.write_str(",)")
            }
            Term::RefOf(elem) => write!(f, "&{elem}"),
            Term::Refl => f.write_str("refl"),
            Term::FunOf { params, body } => {
                f.write_str("\\(")?;
                comma_sep(f, params, |f, p| {
                    let mark = if p.relevant { "" } else { "@" };
                    write!(f, "{mark}{}: {}", p.name, p.ty)
                })?;
                write!(f, ") -> {body}")
            }
            Term::Apply { func, args } => {
                write!(f, "{func}(")?;
                comma_sep(f, args, |f, a| write!(f, "{a}"))?;
                f.write_char(')')
            }
            Term::CodeOf(t) => write!(f, "`{t}"),
            Term::Splice(t) => write!(f, "${t}"),
            Term::Or(ts) => {
                f.write_char('(')?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{t}")?;
                }
                f.write_char(')')
            }
            Term::And(ts) => {
                f.write_char('(')?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" & ")?;
                    }
                    write!(f, "{t}")?;
                }
                f.write_char(')')
            }
            Term::Unit => f.write_str("unit"),
            Term::Bool => f.write_str("bool"),
            Term::Byte => f.write_str("byte"),
            Term::Short => f.write_str("short"),
            Term::Int => f.write_str("int"),
            Term::Long => f.write_str("long"),
            Term::Float => f.write_str("float"),
            Term::Double => f.write_str("double"),
            Term::String => f.write_str("string"),
            Term::ByteArray => f.write_str("byte_array"),
            Term::IntArray => f.write_str("int_array"),
            Term::LongArray => f.write_str("long_array"),
            Term::List(elem) => write!(f, "list {elem}"),
            Term::Compound(fields) => {
                f.write_str("{")?;
                comma_sep(f, fields, |f, (k, v)| write!(f, "{k}: {v}"))?;
                f.write_str("}")
            }
            Term::Tuple(elems) => {
                f.write_str("(")?;
                comma_sep(f, elems, |f, e| write!(f, "{e}"))?;
                f.write_str(",)")
            }
            Term::Ref(elem) => write!(f, "ref {elem}"),
            Term::Eq(l, r) => write!(f, "({l} == {r})"),
            Term::Fun(fun) => write!(f, "{fun}"),
            Term::Code(t) => write!(f, "code {t}"),
            Term::Type => f.write_str("type"),
        }
    }
}

impl fmt::Display for FunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('(')?;
        comma_sep(f, &self.params, |f, p| {
            let mark = if p.relevant { "" } else { "@" };
            write!(f, "{mark}{}: {}", p.name, p.ty)?;
            if let Some(upper) = &p.upper {
                write!(f, " <: {upper}")?;
            }
            if let Some(lower) = &p.lower {
                write!(f, " :> {lower}")?;
            }
            Ok(())
        })?;
        write!(f, ") -> {}", self.result)?;
        if !self.effects.is_empty() {
            write!(f, " ! {}", self.effects)?;
        }
        Ok(())
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::UnitOf => f.write_str("()"),
            Pattern::BoolOf(b) => write!(f, "{b}"),
            Pattern::ByteOf(n) => write!(f, "{n}b"),
            Pattern::ShortOf(n) => write!(f, "{n}s"),
            Pattern::IntOf(n) => write!(f, "{n}"),
            Pattern::LongOf(n) => write!(f, "{n}l"),
            Pattern::FloatOf(n) => write!(f, "{n}f"),
            Pattern::DoubleOf(n) => write!(f, "{n}d"),
            Pattern::StringOf(s) => write!(f, "{s:?}"),
            Pattern::ByteArrayOf(elems)
            | Pattern::IntArrayOf(elems)
            | Pattern::LongArrayOf(elems)
            | Pattern::ListOf(elems) => {
                f.write_char('[')?;
                comma_sep(f, elems, |f, e| write!(f, "{e}"))?;
                f.write_char(']')
            }
            Pattern::CompoundOf(fields) => {
                f.write_char('{')?;
                comma_sep(f, fields, |f, (k, v)| write!(f, "{k}: {v}"))?;
                f.write_char('}')
            }
            Pattern::TupleOf(elems) => {
                f.write_char('(')?;
                comma_sep(f, elems, |f, e| write!(f, "{e}"))?;
                f.write_str(",)")
            }
            Pattern::RefOf(elem) => write!(f, "&{elem}"),
            Pattern::Refl => f.write_str("refl"),
            Pattern::Var(name) => write!(f, "{name}"),
            Pattern::Drop => f.write_char('_'),
        }
    }
}
