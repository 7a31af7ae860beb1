//! Staging reduction.
//!
//! Runs every splice in runtime code at compile time and inlines the code
//! it produces, so what reaches defunctionalization is plain object code.
//! Compile-time definitions keep only their signature: nothing after this
//! point evaluates them.
//!
//! Types inside runtime bodies (let annotations, closure binders) and in
//! runtime signatures are normalized on the way, which unfolds type-level
//! `CONST` aliases before erasure.

use kiln_diagnostic::ErrorCode;
use kiln_ir::{Binder, Def, Item, Lvl, Modifiers, Module, Name, Param, Term, Test};
use kiln_nbe::{Env, Normalizer, Value};
use kiln_stack::ensure_sufficient_stack;

/// Fatal staging error.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum StageError {
    /// A splice whose argument does not evaluate to a quotation.
    #[error("splice did not reduce to quoted code: `{term}`")]
    StuckSplice { term: Term },
    /// A construct that must not survive staging.
    #[error("`{name}` still contains `{term}` after staging")]
    Residual { name: Name, term: Term },
}

impl StageError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::E9001
    }
}

/// Stage one zonked item.
#[tracing::instrument(level = "debug", skip_all, fields(item = %item.name()))]
pub fn stage_item(norm: &Normalizer, item: Item) -> Result<Item, StageError> {
    match item {
        Item::Def(def) => stage_def(norm, def).map(Item::Def),
        Item::Mod(module) => {
            let items = module
                .items
                .into_iter()
                .map(|item| stage_item(norm, item))
                .collect::<Result<_, _>>()?;
            Ok(Item::Mod(Module { items, ..module }))
        }
        Item::Test(test) => {
            let body = Stager::new(norm).term(test.body)?;
            reject_residue(test.name, &body)?;
            Ok(Item::Test(Test { body, ..test }))
        }
    }
}

fn stage_def(norm: &Normalizer, def: Def) -> Result<Def, StageError> {
    if def
        .modifiers
        .intersects(Modifiers::CONST | Modifiers::ABSTRACT | Modifiers::BUILTIN)
    {
        return Ok(Def { body: None, ..def });
    }

    let mut stager = Stager::new(norm);
    let params = def
        .params
        .into_iter()
        .map(|param| {
            let staged = Param {
                lower: param.lower.map(|t| stager.ty(&t)),
                upper: param.upper.map(|t| stager.ty(&t)),
                ty: stager.ty(&param.ty),
                ..param
            };
            stager.names.push(staged.name);
            staged
        })
        .collect();
    let result = stager.ty(&def.result);
    let body = match def.body {
        Some(body) => {
            let body = stager.term(body)?;
            reject_residue(def.name, &body)?;
            Some(body)
        }
        None => None,
    };
    Ok(Def {
        params,
        result,
        body,
        ..def
    })
}

/// Walks a term keeping the names of the binders in scope, so splices can
/// be evaluated in an environment of free variables.
struct Stager<'a> {
    norm: &'a Normalizer,
    names: Vec<Name>,
}

impl<'a> Stager<'a> {
    fn new(norm: &'a Normalizer) -> Self {
        Stager {
            norm,
            names: Vec::new(),
        }
    }

    fn depth(&self) -> Lvl {
        Lvl::from_index(self.names.len())
    }

    fn env(&self) -> Env {
        Env::identity(self.names.iter().copied())
    }

    fn ty(&self, term: &Term) -> Term {
        self.norm.normalize(&self.env(), term)
    }

    fn scoped<T>(&mut self, names: impl IntoIterator<Item = Name>, f: impl FnOnce(&mut Self) -> T) -> T {
        let depth = self.names.len();
        self.names.extend(names);
        let out = f(self);
        self.names.truncate(depth);
        out
    }

    fn term(&mut self, term: Term) -> Result<Term, StageError> {
        ensure_sufficient_stack(|| self.term_inner(term))
    }

    fn term_inner(&mut self, term: Term) -> Result<Term, StageError> {
        match term {
            Term::Splice(inner) => self.splice(&inner),
            Term::Let {
                name,
                ty,
                init,
                body,
            } => {
                let ty = self.ty(&ty);
                let init = self.term(*init)?;
                let body = self.scoped([name], |s| s.term(*body))?;
                Ok(Term::Let {
                    name,
                    ty: Box::new(ty),
                    init: Box::new(init),
                    body: Box::new(body),
                })
            }
            Term::Match { scrutinee, clauses } => {
                let scrutinee = self.term(*scrutinee)?;
                let clauses = clauses
                    .into_iter()
                    .map(|(pattern, body)| {
                        let body = self.scoped(pattern.binders(), |s| s.term(body))?;
                        Ok((pattern, body))
                    })
                    .collect::<Result<_, StageError>>()?;
                Ok(Term::Match {
                    scrutinee: Box::new(scrutinee),
                    clauses,
                })
            }
            Term::FunOf { params, body } => {
                let depth = self.names.len();
                let params = params
                    .into_iter()
                    .map(|binder| {
                        let ty = self.ty(&binder.ty);
                        self.names.push(binder.name);
                        Binder { ty, ..binder }
                    })
                    .collect();
                let body = self.term(*body);
                self.names.truncate(depth);
                Ok(Term::FunOf {
                    params,
                    body: Box::new(body?),
                })
            }
            ty @ (Term::Fun(_)
            | Term::Or(_)
            | Term::And(_)
            | Term::List(_)
            | Term::Compound(_)
            | Term::Tuple(_)
            | Term::Ref(_)
            | Term::Eq(..)) => Ok(self.ty(&ty)),
            other => {
                let depth = self.depth();
                other.try_map_children(depth, &mut |child, _| self.term(child))
            }
        }
    }

    /// Run a splice: its argument must evaluate to quoted code, which is
    /// read back here and staged in turn.
    fn splice(&mut self, inner: &Term) -> Result<Term, StageError> {
        let depth = self.depth();
        match self.norm.force(self.norm.eval(&self.env(), inner)) {
            Value::CodeOf(code) => {
                let quoted = self.norm.quote(depth, &code.value(self.norm));
                tracing::trace!(%quoted, "splice evaluated");
                self.term(quoted)
            }
            stuck => Err(StageError::StuckSplice {
                term: self.norm.quote(depth, &stuck),
            }),
        }
    }
}

/// Holes, metavariables and staging constructs must be gone from runtime
/// code.
fn reject_residue(name: Name, body: &Term) -> Result<(), StageError> {
    let mut found = None;
    body.any(Lvl::ZERO, &mut |term, _| {
        let residual = matches!(
            term,
            Term::Hole | Term::Meta(_) | Term::CodeOf(_) | Term::Splice(_) | Term::Code(_)
        );
        if residual {
            found = Some(term.clone());
        }
        residual
    });
    match found {
        Some(term) => Err(StageError::Residual { name, term }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests;
