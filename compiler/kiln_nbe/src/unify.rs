//! Conversion checking with pattern unification.

use std::rc::Rc;

use kiln_ir::{Binder, Lvl, MetaId, Name, Term};
use kiln_stack::ensure_sufficient_stack;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::eval::fresh_vars;
use crate::{Closure, Env, FunClosure, Lazy, Normalizer, Value};

/// Why a solution candidate was rejected.
enum Rename {
    Occurs,
    Escapes,
}

impl Normalizer {
    /// Whether `lhs` and `rhs` are convertible at context depth `level`,
    /// solving metavariables along the way.
    ///
    /// A failed unification may still have solved some metavariables.
    pub fn unify(&mut self, level: Lvl, lhs: &Value, rhs: &Value) -> bool {
        ensure_sufficient_stack(|| {
            let lhs = self.force(lhs.clone());
            let rhs = self.force(rhs.clone());
            self.unify_forced(level, lhs, rhs)
        })
    }

    fn unify_lazy(&mut self, level: Lvl, lhs: &Lazy, rhs: &Lazy) -> bool {
        let lhs = lhs.value(self);
        let rhs = rhs.value(self);
        self.unify(level, &lhs, &rhs)
    }

    fn unify_spines(&mut self, level: Lvl, lhs: &[Lazy], rhs: &[Lazy]) -> bool {
        lhs.len() == rhs.len()
            && lhs
                .iter()
                .zip(rhs)
                .all(|(l, r)| self.unify_lazy(level, l, r))
    }

    fn unify_fields(&mut self, level: Lvl, lhs: &[(Name, Lazy)], rhs: &[(Name, Lazy)]) -> bool {
        lhs.len() == rhs.len()
            && lhs
                .iter()
                .zip(rhs)
                .all(|((lk, lv), (rk, rv))| lk == rk && self.unify_lazy(level, lv, rv))
    }

    #[allow(clippy::too_many_lines)]
    fn unify_forced(&mut self, level: Lvl, lhs: Value, rhs: Value) -> bool {
        match (lhs, rhs) {
            (Value::Hole, _) | (_, Value::Hole) => true,

            (Value::Meta(a), Value::Meta(b)) if a == b => true,
            (Value::Meta(meta), other) | (other, Value::Meta(meta)) => {
                self.solve_spine(level, meta, &[], &other)
            }
            (Value::Apply(lh, la), Value::Apply(rh, ra))
                if matches!((&*lh, &*rh), (Value::Meta(a), Value::Meta(b)) if a == b) =>
            {
                self.unify_spines(level, &la, &ra)
            }
            (Value::Apply(head, args), other) | (other, Value::Apply(head, args))
                if matches!(*head, Value::Meta(_)) && !matches!(other, Value::FunOf(_)) =>
            {
                let Value::Meta(meta) = *head else {
                    return false;
                };
                self.solve_spine(level, meta, &args, &other)
            }

            // Closures: compare bodies under fresh variables, eta-expanding
            // when only one side is a literal closure.
            (Value::FunOf(l), Value::FunOf(r)) => {
                l.arity() == r.arity() && {
                    let vars = fresh_vars(level, l.params.iter().map(|b| b.name));
                    let lb = l.instantiate(self, &vars);
                    let rb = r.instantiate(self, &vars);
                    self.unify(level.plus(vars.len()), &lb, &rb)
                }
            }
            (Value::FunOf(closure), other) | (other, Value::FunOf(closure)) => {
                let vars = fresh_vars(level, closure.params.iter().map(|b| b.name));
                let body = closure.instantiate(self, &vars);
                let expanded = self.apply(other, vars.clone());
                self.unify(level.plus(vars.len()), &body, &expanded)
            }

            (Value::Var(_, a), Value::Var(_, b)) => a == b,
            (Value::Def(a, la, _), Value::Def(b, lb, _)) => a == b && self.unify_spines(level, &la, &lb),
            (Value::Apply(lh, la), Value::Apply(rh, ra)) => {
                self.unify(level, &lh, &rh) && self.unify_spines(level, &la, &ra)
            }
            (l @ Value::Match(..), r @ Value::Match(..)) => {
                self.quote(level, &l) == self.quote(level, &r)
            }
            (Value::Splice(l), Value::Splice(r)) => self.unify(level, &l, &r),

            (Value::UnitOf, Value::UnitOf) | (Value::Refl, Value::Refl) => true,
            (Value::BoolOf(a), Value::BoolOf(b)) => a == b,
            (Value::ByteOf(a), Value::ByteOf(b)) => a == b,
            (Value::ShortOf(a), Value::ShortOf(b)) => a == b,
            (Value::IntOf(a), Value::IntOf(b)) => a == b,
            (Value::LongOf(a), Value::LongOf(b)) => a == b,
            (Value::FloatOf(a), Value::FloatOf(b)) => a.to_bits() == b.to_bits(),
            (Value::DoubleOf(a), Value::DoubleOf(b)) => a.to_bits() == b.to_bits(),
            (Value::StringOf(a), Value::StringOf(b)) => a == b,
            (Value::ByteArrayOf(a), Value::ByteArrayOf(b))
            | (Value::IntArrayOf(a), Value::IntArrayOf(b))
            | (Value::LongArrayOf(a), Value::LongArrayOf(b))
            | (Value::ListOf(a), Value::ListOf(b))
            | (Value::TupleOf(a), Value::TupleOf(b))
            | (Value::Or(a), Value::Or(b))
            | (Value::And(a), Value::And(b))
            | (Value::Tuple(a), Value::Tuple(b)) => self.unify_spines(level, &a, &b),
            (Value::CompoundOf(a), Value::CompoundOf(b))
            | (Value::Compound(a), Value::Compound(b)) => self.unify_fields(level, &a, &b),
            (Value::RefOf(a), Value::RefOf(b))
            | (Value::CodeOf(a), Value::CodeOf(b))
            | (Value::List(a), Value::List(b))
            | (Value::Ref(a), Value::Ref(b))
            | (Value::Code(a), Value::Code(b)) => self.unify_lazy(level, &a, &b),
            (Value::Eq(al, ar), Value::Eq(bl, br)) => {
                self.unify_lazy(level, &al, &bl) && self.unify_lazy(level, &ar, &br)
            }
            (Value::Fun(a), Value::Fun(b)) => self.unify_fun(level, &a, &b),

            (Value::Unit, Value::Unit)
            | (Value::Bool, Value::Bool)
            | (Value::Byte, Value::Byte)
            | (Value::Short, Value::Short)
            | (Value::Int, Value::Int)
            | (Value::Long, Value::Long)
            | (Value::Float, Value::Float)
            | (Value::Double, Value::Double)
            | (Value::String, Value::String)
            | (Value::ByteArray, Value::ByteArray)
            | (Value::IntArray, Value::IntArray)
            | (Value::LongArray, Value::LongArray)
            | (Value::Type, Value::Type) => true,

            _ => false,
        }
    }

    fn unify_fun(&mut self, level: Lvl, a: &Rc<FunClosure>, b: &Rc<FunClosure>) -> bool {
        if a.arity() != b.arity() || a.ty.effects != b.ty.effects {
            return false;
        }
        let vars = fresh_vars(level, a.ty.params.iter().map(|p| p.name));
        for (i, (pa, pb)) in a.ty.params.iter().zip(&b.ty.params).enumerate() {
            if pa.relevant != pb.relevant || pa.type_relevant != pb.type_relevant {
                return false;
            }
            let at = level.plus(i);
            let before = &vars[..i];
            let (ta, tb) = (a.param_ty(self, i, before), b.param_ty(self, i, before));
            if !self.unify(at, &ta, &tb) {
                return false;
            }
            let bounds = [
                (a.upper(self, i, before), b.upper(self, i, before)),
                (a.lower(self, i, before), b.lower(self, i, before)),
            ];
            for bound in bounds {
                match bound {
                    (None, None) => {}
                    (Some(x), Some(y)) if self.unify(at, &x, &y) => {}
                    _ => return false,
                }
            }
        }
        let (ra, rb) = (a.result(self, &vars), b.result(self, &vars));
        self.unify(level.plus(vars.len()), &ra, &rb)
    }

    /// Solve `?meta spine =?= rhs` when the spine is distinct variables.
    fn solve_spine(&mut self, level: Lvl, meta: MetaId, spine: &[Lazy], rhs: &Value) -> bool {
        let mut positions: FxHashMap<Lvl, Lvl> = FxHashMap::default();
        let mut names: SmallVec<[Name; 4]> = SmallVec::new();
        for (i, arg) in spine.iter().enumerate() {
            match arg.forced(self) {
                Value::Var(name, l) if !positions.contains_key(&l) => {
                    positions.insert(l, Lvl::from_index(i));
                    names.push(name);
                }
                _ => return false,
            }
        }
        let rhs = self.quote(level, rhs);
        let arity = spine.len();
        let body = match rename(rhs, meta, level, arity, &positions) {
            Ok(body) => body,
            Err(Rename::Occurs) => {
                tracing::trace!(%meta, "occurs check failed");
                return false;
            }
            Err(Rename::Escapes) => return false,
        };
        let solution = if arity == 0 {
            self.eval(&Env::new(), &body)
        } else {
            Value::FunOf(Rc::new(Closure {
                env: Env::new(),
                params: names
                    .into_iter()
                    .map(|name| Binder {
                        name,
                        relevant: true,
                        ty: Term::Hole,
                    })
                    .collect(),
                body,
            }))
        };
        self.solve(meta, solution)
    }
}

/// Move `term` (quoted at `level`) into the scope of a solution closure:
/// spine variables become its parameters and binders inside the term
/// shift down to follow them.
fn rename(
    term: Term,
    meta: MetaId,
    level: Lvl,
    arity: usize,
    positions: &FxHashMap<Lvl, Lvl>,
) -> Result<Term, Rename> {
    ensure_sufficient_stack(|| match term {
        Term::Meta(m) if m == meta => Err(Rename::Occurs),
        Term::Var { name, level: l } => {
            let renamed = if let Some(position) = positions.get(&l) {
                *position
            } else if l >= level {
                Lvl::from_index(arity + (l.index() - level.index()))
            } else {
                return Err(Rename::Escapes);
            };
            Ok(Term::Var {
                name,
                level: renamed,
            })
        }
        other => other.try_map_children(Lvl::ZERO, &mut |child, _| {
            rename(child, meta, level, arity, positions)
        }),
    })
}
