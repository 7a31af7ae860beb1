//! Read-back from values to terms.

use kiln_ir::{Binder, FunType, Lvl, Param, Term};
use kiln_stack::ensure_sufficient_stack;

use crate::eval::fresh_vars;
use crate::{Lazy, Normalizer, Value};

impl Normalizer {
    /// Read `value` back as a term living at context depth `level`.
    ///
    /// Goes under binders by applying fresh variables, so the result is
    /// in full normal form up to stuck neutrals.
    pub fn quote(&self, level: Lvl, value: &Value) -> Term {
        ensure_sufficient_stack(|| self.quote_inner(level, value.clone()))
    }

    fn quote_lazy(&self, level: Lvl, cell: &Lazy) -> Term {
        self.quote(level, &cell.forced(self))
    }

    fn quote_all(&self, level: Lvl, cells: &[Lazy]) -> Vec<Term> {
        cells.iter().map(|c| self.quote_lazy(level, c)).collect()
    }

    fn quote_inner(&self, level: Lvl, value: Value) -> Term {
        match self.force(value) {
            Value::Hole => Term::Hole,
            Value::Meta(meta) => Term::Meta(meta),
            Value::Var(name, l) => Term::Var { name, level: l },
            Value::Def(name, args, _) => {
                if args.is_empty() {
                    Term::Def(name)
                } else {
                    Term::apply(Term::Def(name), self.quote_all(level, &args))
                }
            }
            Value::Apply(head, args) => {
                Term::apply(self.quote(level, &head), self.quote_all(level, &args))
            }
            Value::Match(scrutinee, env, clauses) => Term::Match {
                scrutinee: Box::new(self.quote(level, &scrutinee)),
                clauses: clauses
                    .iter()
                    .map(|(pattern, body)| {
                        let binders = pattern.binders();
                        let inner = level.plus(binders.len());
                        let env = env.extended(fresh_vars(level, binders));
                        let body = self.quote(inner, &self.eval(&env, body));
                        (pattern.clone(), body)
                    })
                    .collect(),
            },
            Value::Splice(inner) => Term::Splice(Box::new(self.quote(level, &inner))),

            Value::UnitOf => Term::UnitOf,
            Value::BoolOf(b) => Term::BoolOf(b),
            Value::ByteOf(n) => Term::ByteOf(n),
            Value::ShortOf(n) => Term::ShortOf(n),
            Value::IntOf(n) => Term::IntOf(n),
            Value::LongOf(n) => Term::LongOf(n),
            Value::FloatOf(n) => Term::FloatOf(n),
            Value::DoubleOf(n) => Term::DoubleOf(n),
            Value::StringOf(s) => Term::StringOf(s.to_string()),
            Value::ByteArrayOf(elems) => Term::ByteArrayOf(self.quote_all(level, &elems)),
            Value::IntArrayOf(elems) => Term::IntArrayOf(self.quote_all(level, &elems)),
            Value::LongArrayOf(elems) => Term::LongArrayOf(self.quote_all(level, &elems)),
            Value::ListOf(elems) => Term::ListOf(self.quote_all(level, &elems)),
            Value::CompoundOf(fields) => Term::CompoundOf(
                fields
                    .iter()
                    .map(|(k, v)| (*k, self.quote_lazy(level, v)))
                    .collect(),
            ),
            Value::TupleOf(elems) => Term::TupleOf(self.quote_all(level, &elems)),
            Value::RefOf(elem) => Term::RefOf(Box::new(self.quote_lazy(level, &elem))),
            Value::Refl => Term::Refl,
            Value::FunOf(closure) => {
                let vars = fresh_vars(level, closure.params.iter().map(|b| b.name));
                let params = closure
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, binder)| Binder {
                        name: binder.name,
                        relevant: binder.relevant,
                        ty: self.quote(level.plus(i), &closure.param_ty(self, i, &vars[..i])),
                    })
                    .collect();
                let body = closure.instantiate(self, &vars);
                Term::FunOf {
                    params,
                    body: Box::new(self.quote(level.plus(vars.len()), &body)),
                }
            }
            Value::CodeOf(inner) => Term::CodeOf(Box::new(self.quote_lazy(level, &inner))),

            Value::Or(ts) => Term::Or(self.quote_all(level, &ts)),
            Value::And(ts) => Term::And(self.quote_all(level, &ts)),
            Value::Unit => Term::Unit,
            Value::Bool => Term::Bool,
            Value::Byte => Term::Byte,
            Value::Short => Term::Short,
            Value::Int => Term::Int,
            Value::Long => Term::Long,
            Value::Float => Term::Float,
            Value::Double => Term::Double,
            Value::String => Term::String,
            Value::ByteArray => Term::ByteArray,
            Value::IntArray => Term::IntArray,
            Value::LongArray => Term::LongArray,
            Value::List(elem) => Term::List(Box::new(self.quote_lazy(level, &elem))),
            Value::Compound(fields) => Term::Compound(
                fields
                    .iter()
                    .map(|(k, v)| (*k, self.quote_lazy(level, v)))
                    .collect(),
            ),
            Value::Tuple(elems) => Term::Tuple(self.quote_all(level, &elems)),
            Value::Ref(elem) => Term::Ref(Box::new(self.quote_lazy(level, &elem))),
            Value::Eq(l, r) => Term::Eq(
                Box::new(self.quote_lazy(level, &l)),
                Box::new(self.quote_lazy(level, &r)),
            ),
            Value::Fun(fun) => {
                let vars = fresh_vars(level, fun.ty.params.iter().map(|p| p.name));
                let params = fun
                    .ty
                    .params
                    .iter()
                    .enumerate()
                    .map(|(i, param)| {
                        let at = level.plus(i);
                        let before = &vars[..i];
                        Param {
                            name: param.name,
                            relevant: param.relevant,
                            lower: fun.lower(self, i, before).map(|v| self.quote(at, &v)),
                            upper: fun.upper(self, i, before).map(|v| self.quote(at, &v)),
                            type_relevant: param.type_relevant,
                            ty: self.quote(at, &fun.param_ty(self, i, before)),
                        }
                    })
                    .collect();
                let result = self.quote(level.plus(vars.len()), &fun.result(self, &vars));
                Term::Fun(Box::new(FunType {
                    params,
                    result,
                    effects: fun.ty.effects.clone(),
                }))
            }
            Value::Code(elem) => Term::Code(Box::new(self.quote_lazy(level, &elem))),
            Value::Type => Term::Type,
        }
    }
}
