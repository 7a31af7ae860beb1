//! Defunctionalization.
//!
//! The target machine has no code pointers, so every closure literal is
//! replaced by an integer tag and lifted into a [`FunctionTable`]. Calls
//! through a tag go to a dispatcher the packer generates from the table.
//!
//! Closures may not capture runtime variables: there is no heap to put an
//! environment in. A body that mentions a level outside its own
//! parameters is rejected.

mod table;

use std::sync::Arc;

use kiln_diagnostic::ErrorCode;
use kiln_ir::{Binder, Def, DefTable, Item, Lvl, Module, Name, Term, Test};
use kiln_stack::ensure_sufficient_stack;
use rustc_hash::FxHashMap;

pub use table::{Closure, FunctionTable, TagCounter};

/// Fatal defunctionalization error.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DefunError {
    #[error("closure captures `{name}` from an enclosing scope")]
    Capture { name: Name },
    #[error("`{term}` cannot appear in runtime code")]
    Internal { term: Term },
}

impl DefunError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::E9002
    }
}

/// A defunctionalized item and the closures lifted out of it.
#[derive(Clone, Debug, PartialEq)]
pub struct Defunctionalized {
    pub item: Item,
    pub table: FunctionTable,
}

pub struct Defunctionalizer<'a> {
    defs: Arc<DefTable>,
    /// Definitions of the unit being processed.
    local: FxHashMap<Name, Arc<Def>>,
    tags: &'a TagCounter,
    table: FunctionTable,
    /// Eta-expansion closure already issued for a definition.
    eta: FxHashMap<Name, i32>,
}

impl<'a> Defunctionalizer<'a> {
    pub fn new(defs: Arc<DefTable>, tags: &'a TagCounter) -> Self {
        Defunctionalizer {
            defs,
            local: FxHashMap::default(),
            tags,
            table: FunctionTable::new(),
            eta: FxHashMap::default(),
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(item = %item.name()))]
    pub fn defunctionalize_item(mut self, item: Item) -> Result<Defunctionalized, DefunError> {
        self.register_local(&item);
        let item = self.item(item)?;
        tracing::debug!(closures = self.table.len(), "defunctionalized");
        Ok(Defunctionalized {
            item,
            table: self.table,
        })
    }

    fn register_local(&mut self, item: &Item) {
        match item {
            Item::Def(def) => {
                self.local.insert(def.name, Arc::new(def.clone()));
            }
            Item::Mod(module) => module.items.iter().for_each(|i| self.register_local(i)),
            Item::Test(_) => {}
        }
    }

    fn lookup(&self, name: Name) -> Option<&Arc<Def>> {
        self.local.get(&name).or_else(|| self.defs.get(name))
    }

    fn item(&mut self, item: Item) -> Result<Item, DefunError> {
        match item {
            Item::Def(def) => {
                let depth = Lvl::from_index(def.params.len());
                let body = def.body.map(|b| self.term(b, depth)).transpose()?;
                Ok(Item::Def(Def { body, ..def }))
            }
            Item::Mod(module) => {
                let items = module
                    .items
                    .into_iter()
                    .map(|i| self.item(i))
                    .collect::<Result<_, _>>()?;
                Ok(Item::Mod(Module { items, ..module }))
            }
            Item::Test(test) => Ok(Item::Test(Test {
                body: self.term(test.body, Lvl::ZERO)?,
                ..test
            })),
        }
    }

    fn term(&mut self, term: Term, depth: Lvl) -> Result<Term, DefunError> {
        ensure_sufficient_stack(|| match term {
            Term::FunOf { params, body } => {
                let inner = depth.plus(params.len());
                let body = self.term(*body, inner)?;
                if let Some(name) = captured(&body, depth) {
                    return Err(DefunError::Capture { name });
                }
                Ok(Term::IntOf(self.lift(Closure {
                    depth,
                    params,
                    body,
                })))
            }
            // A definition in call position is a direct call.
            Term::Apply { func, args } => {
                let func = match *func {
                    Term::Def(name) => Term::Def(name),
                    other => self.term(other, depth)?,
                };
                let args = args
                    .into_iter()
                    .map(|a| self.term(a, depth))
                    .collect::<Result<_, _>>()?;
                Ok(Term::Apply {
                    func: Box::new(func),
                    args,
                })
            }
            Term::Def(name) => Ok(self.def_value(name)),
            residue @ (Term::Hole
            | Term::Meta(_)
            | Term::CodeOf(_)
            | Term::Splice(_)
            | Term::Code(_)) => Err(DefunError::Internal { term: residue }),
            other => other.try_map_children(depth, &mut |child, at| self.term(child, at)),
        })
    }

    fn lift(&mut self, closure: Closure) -> i32 {
        let tag = self.tags.next();
        tracing::trace!(tag, arity = closure.arity(), "closure tagged");
        self.table.insert(tag, closure);
        tag
    }

    /// A definition used as a value. One with parameters is eta-expanded
    /// into a closure calling it.
    fn def_value(&mut self, name: Name) -> Term {
        if let Some(tag) = self.eta.get(&name) {
            return Term::IntOf(*tag);
        }
        let params = match self.lookup(name) {
            Some(def) if !def.params.is_empty() => def.params.clone(),
            _ => return Term::Def(name),
        };
        let args = params
            .iter()
            .enumerate()
            .map(|(i, p)| Term::var(p.name, Lvl::from_index(i)))
            .collect();
        let closure = Closure {
            depth: Lvl::ZERO,
            params: params
                .into_iter()
                .map(|p| Binder {
                    name: p.name,
                    relevant: p.relevant,
                    ty: p.ty,
                })
                .collect(),
            body: Term::apply(Term::Def(name), args),
        };
        let tag = self.lift(closure);
        self.eta.insert(name, tag);
        Term::IntOf(tag)
    }
}

/// First variable of `body` bound below `depth`.
fn captured(body: &Term, depth: Lvl) -> Option<Name> {
    let mut found = None;
    body.any(depth, &mut |term, _| match term {
        Term::Var { name, level } if *level < depth => {
            found = Some(*name);
            true
        }
        _ => false,
    });
    found
}
