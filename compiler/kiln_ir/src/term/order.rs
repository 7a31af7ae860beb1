//! Total order on terms.
//!
//! The derived `PartialOrd` gives up on NaN literals. Where it does, terms
//! are ordered by their debug rendering and then by the bit patterns of
//! their float literals, which together tell any two distinct terms apart.

use std::cmp::Ordering;
use std::convert::Infallible;

use crate::{Lvl, Pattern, Term};

impl Term {
    /// A total order that agrees with `partial_cmp` wherever that is
    /// defined. `Equal` only for identical terms.
    pub fn total_cmp(&self, other: &Term) -> Ordering {
        if let Some(ord) = self.partial_cmp(other) {
            return ord;
        }
        format!("{self:?}")
            .cmp(&format!("{other:?}"))
            .then_with(|| float_bits(self).cmp(&float_bits(other)))
    }
}

fn float_bits(term: &Term) -> Vec<u64> {
    let mut out = Vec::new();
    collect_term(term, &mut out);
    out
}

fn collect_term(term: &Term, out: &mut Vec<u64>) {
    match term {
        Term::FloatOf(x) => out.push(u64::from(x.to_bits())),
        Term::DoubleOf(x) => out.push(x.to_bits()),
        Term::Match { scrutinee, clauses } => {
            collect_term(scrutinee, out);
            for (pattern, body) in clauses {
                collect_pattern(pattern, out);
                collect_term(body, out);
            }
        }
        _ => {
            let _ = term.clone().try_map_children(Lvl::ZERO, &mut |child, _| {
                collect_term(&child, out);
                Ok::<_, Infallible>(child)
            });
        }
    }
}

fn collect_pattern(pattern: &Pattern, out: &mut Vec<u64>) {
    match pattern {
        Pattern::FloatOf(x) => out.push(u64::from(x.to_bits())),
        Pattern::DoubleOf(x) => out.push(x.to_bits()),
        Pattern::ByteArrayOf(elems)
        | Pattern::IntArrayOf(elems)
        | Pattern::LongArrayOf(elems)
        | Pattern::ListOf(elems)
        | Pattern::TupleOf(elems) => {
            for elem in elems {
                collect_pattern(elem, out);
            }
        }
        Pattern::CompoundOf(fields) => {
            for (_, field) in fields {
                collect_pattern(field, out);
            }
        }
        Pattern::RefOf(elem) => collect_pattern(elem, out),
        _ => {}
    }
}
