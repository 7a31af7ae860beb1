//! Metavariable substitution.
//!
//! After elaboration every `Meta` (and every application headed by one) is
//! replaced by its solution, read back at the depth where it occurs.
//! Whatever is still unsolved afterwards is an error for
//! [`zonk_item`] and is left in place by [`zonk_types`].

use std::collections::BTreeSet;

use kiln_diagnostic::Diagnostic;
use kiln_ir::{Def, Item, Lvl, MetaId, Module, Param, Test, Term};
use kiln_nbe::{Env, Normalizer};
use kiln_stack::ensure_sufficient_stack;

use crate::TypeTable;

struct Zonker<'a> {
    norm: &'a Normalizer,
    unsolved: BTreeSet<MetaId>,
}

impl Zonker<'_> {
    fn term(&mut self, term: Term, depth: Lvl) -> Term {
        ensure_sufficient_stack(|| match term {
            Term::Meta(_) => self.solution(&term, depth),
            Term::Apply { ref func, .. } if matches!(**func, Term::Meta(_)) => {
                self.solution(&term, depth)
            }
            other => other.map_children(depth, &mut |child, at| self.term(child, at)),
        })
    }

    /// Read back a meta occurrence; free levels evaluate to themselves, so
    /// the spine needs no environment.
    fn solution(&mut self, term: &Term, depth: Lvl) -> Term {
        let value = self.norm.eval(&Env::new(), term);
        let quoted = self.norm.quote(depth, &value);
        collect_metas(&quoted, &mut self.unsolved);
        quoted
    }

    fn params(&mut self, params: Vec<Param>) -> Vec<Param> {
        params
            .into_iter()
            .enumerate()
            .map(|(i, param)| {
                let at = Lvl::from_index(i);
                Param {
                    lower: param.lower.map(|t| self.term(t, at)),
                    upper: param.upper.map(|t| self.term(t, at)),
                    ty: self.term(param.ty, at),
                    ..param
                }
            })
            .collect()
    }

    fn item(&mut self, item: Item) -> Item {
        match item {
            Item::Def(def) => {
                let arity = def.params.len();
                let params = self.params(def.params);
                let inner = Lvl::from_index(arity);
                Item::Def(Def {
                    params,
                    result: self.term(def.result, inner),
                    body: def.body.map(|body| self.term(body, inner)),
                    ..def
                })
            }
            Item::Mod(module) => Item::Mod(Module {
                items: module.items.into_iter().map(|i| self.item(i)).collect(),
                ..module
            }),
            Item::Test(test) => Item::Test(Test {
                body: self.term(test.body, Lvl::ZERO),
                ..test
            }),
        }
    }
}

fn collect_metas(term: &Term, out: &mut BTreeSet<MetaId>) {
    if let Term::Meta(meta) = term {
        out.insert(*meta);
    }
    term.visit_children(Lvl::ZERO, &mut |child, _| collect_metas(child, out));
}

/// Substitute every solved metavariable in `item`.
///
/// Fails with one [`Diagnostic::UnsolvedMeta`] per distinct unsolved
/// metavariable, in id order. Zonking a zonked item changes nothing.
pub fn zonk_item(norm: &Normalizer, item: Item) -> Result<Item, Vec<Diagnostic>> {
    let mut zonker = Zonker {
        norm,
        unsolved: BTreeSet::new(),
    };
    let item = zonker.item(item);
    if zonker.unsolved.is_empty() {
        Ok(item)
    } else {
        tracing::debug!(count = zonker.unsolved.len(), "unsolved metavariables");
        Err(zonker
            .unsolved
            .into_iter()
            .map(|meta| Diagnostic::UnsolvedMeta { meta })
            .collect())
    }
}

/// Substitute solved metavariables in every recorded type, leaving the
/// unsolved ones as they are.
pub fn zonk_types(norm: &Normalizer, types: &mut TypeTable) {
    let mut zonker = Zonker {
        norm,
        unsolved: BTreeSet::new(),
    };
    for entry in types.iter_mut() {
        let ty = std::mem::replace(&mut entry.ty, Term::Hole);
        entry.ty = zonker.term(ty, entry.depth);
    }
}
