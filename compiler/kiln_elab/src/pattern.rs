//! Pattern checking.

use kiln_diagnostic::Diagnostic;
use kiln_ir::{Id, Name, Pattern, Term};
use kiln_nbe::{Lazy, Value};

use crate::ctx::{Ctx, Mode};
use crate::Elaborator;

impl Elaborator {
    /// Check `pattern` against the scrutinee type `ty` and return the
    /// context extended with its variables, left to right.
    pub(crate) fn check_pattern(&mut self, ctx: &Ctx, id: Id, pattern: &Pattern, ty: &Value) -> Ctx {
        let mut inner = ctx.clone();
        self.bind_pattern(&mut inner, id, pattern, ty);
        inner
    }

    fn bind_pattern(&mut self, ctx: &mut Ctx, id: Id, pattern: &Pattern, ty: &Value) {
        match pattern {
            Pattern::Var(name) => {
                self.check_representable(ctx, id, ty);
                ctx.bind(*name, ty.clone(), ctx.mode == Mode::Relevant, true);
            }
            Pattern::Drop => {}
            Pattern::UnitOf => self.expect_literal(ctx, id, &Value::Unit, ty),
            Pattern::BoolOf(_) => self.expect_literal(ctx, id, &Value::Bool, ty),
            Pattern::ByteOf(_) => self.expect_literal(ctx, id, &Value::Byte, ty),
            Pattern::ShortOf(_) => self.expect_literal(ctx, id, &Value::Short, ty),
            Pattern::IntOf(_) => self.expect_literal(ctx, id, &Value::Int, ty),
            Pattern::LongOf(_) => self.expect_literal(ctx, id, &Value::Long, ty),
            Pattern::FloatOf(_) => self.expect_literal(ctx, id, &Value::Float, ty),
            Pattern::DoubleOf(_) => self.expect_literal(ctx, id, &Value::Double, ty),
            Pattern::StringOf(_) => self.expect_literal(ctx, id, &Value::String, ty),
            Pattern::ByteArrayOf(elems) => {
                self.expect_literal(ctx, id, &Value::ByteArray, ty);
                self.bind_all(ctx, id, elems, &Value::Byte);
            }
            Pattern::IntArrayOf(elems) => {
                self.expect_literal(ctx, id, &Value::IntArray, ty);
                self.bind_all(ctx, id, elems, &Value::Int);
            }
            Pattern::LongArrayOf(elems) => {
                self.expect_literal(ctx, id, &Value::LongArray, ty);
                self.bind_all(ctx, id, elems, &Value::Long);
            }
            Pattern::ListOf(elems) => {
                let elem = match self.norm.force(ty.clone()) {
                    Value::List(elem) => elem.value(&self.norm),
                    Value::Hole => Value::Hole,
                    other => {
                        let elem = self.fresh_meta_value(ctx);
                        let shape = Value::List(Lazy::ready(elem.clone()));
                        self.expect_shape(ctx, id, &shape, &other);
                        elem
                    }
                };
                self.bind_all(ctx, id, elems, &elem);
            }
            Pattern::TupleOf(elems) => {
                let tys = match self.norm.force(ty.clone()) {
                    Value::Tuple(tys) if tys.len() == elems.len() => {
                        tys.iter().map(|t| t.value(&self.norm)).collect()
                    }
                    Value::Hole => vec![Value::Hole; elems.len()],
                    other => {
                        let tys: Vec<_> = elems.iter().map(|_| self.fresh_meta_value(ctx)).collect();
                        let shape = Value::Tuple(tys.iter().cloned().map(Lazy::ready).collect());
                        self.expect_shape(ctx, id, &shape, &other);
                        tys
                    }
                };
                for (elem, ty) in elems.iter().zip(&tys) {
                    self.bind_pattern(ctx, id, elem, ty);
                }
            }
            Pattern::CompoundOf(fields) => {
                let tys: Vec<Value> = match self.norm.force(ty.clone()) {
                    Value::Compound(known) => fields
                        .iter()
                        .map(|(key, _)| match known.iter().find(|(k, _)| k == key) {
                            Some((_, ty)) => ty.value(&self.norm),
                            None => {
                                self.missing_field(ctx, id, *key, ty);
                                Value::Hole
                            }
                        })
                        .collect(),
                    Value::Hole => vec![Value::Hole; fields.len()],
                    other => {
                        let tys: Vec<_> = fields.iter().map(|_| self.fresh_meta_value(ctx)).collect();
                        let mut shape: Vec<_> = fields
                            .iter()
                            .zip(&tys)
                            .map(|((key, _), ty)| (*key, Lazy::ready(ty.clone())))
                            .collect();
                        shape.sort_by(|a, b| a.0.cmp(&b.0));
                        self.expect_shape(ctx, id, &Value::Compound(shape), &other);
                        tys
                    }
                };
                for ((_, field), ty) in fields.iter().zip(&tys) {
                    self.bind_pattern(ctx, id, field, ty);
                }
            }
            Pattern::RefOf(elem) => {
                let elem_ty = match self.norm.force(ty.clone()) {
                    Value::Ref(elem) => elem.value(&self.norm),
                    Value::Hole => Value::Hole,
                    other => {
                        let elem_ty = self.fresh_meta_value(ctx);
                        let shape = Value::Ref(Lazy::ready(elem_ty.clone()));
                        self.expect_shape(ctx, id, &shape, &other);
                        elem_ty
                    }
                };
                self.bind_pattern(ctx, id, elem, &elem_ty);
            }
            Pattern::Refl => match self.norm.force(ty.clone()) {
                Value::Eq(..) | Value::Hole => {}
                other => {
                    let witness = Lazy::ready(self.fresh_meta_value(ctx));
                    let shape = Value::Eq(witness.clone(), witness);
                    self.expect_shape(ctx, id, &shape, &other);
                }
            },
        }
    }

    fn bind_all(&mut self, ctx: &mut Ctx, id: Id, patterns: &[Pattern], ty: &Value) {
        for pattern in patterns {
            self.bind_pattern(ctx, id, pattern, ty);
        }
    }

    /// A literal pattern's type must fit the scrutinee type.
    fn expect_literal(&mut self, ctx: &Ctx, id: Id, literal: &Value, scrutinee: &Value) {
        if !self.subtype(ctx.depth(), literal, scrutinee) {
            self.report(Diagnostic::TermMismatch {
                expected: self.quote(ctx, scrutinee),
                actual: self.quote(ctx, literal),
                id,
            });
        }
    }

    /// The scrutinee type must be an aggregate of the pattern's shape.
    fn expect_shape(&mut self, ctx: &Ctx, id: Id, shape: &Value, scrutinee: &Value) {
        if !self.norm.unify(ctx.depth(), shape, scrutinee) {
            self.report(Diagnostic::TermMismatch {
                expected: self.quote(ctx, scrutinee),
                actual: self.quote(ctx, shape),
                id,
            });
        }
    }

    fn missing_field(&mut self, ctx: &Ctx, id: Id, key: Name, scrutinee: &Value) {
        self.report(Diagnostic::TermMismatch {
            expected: self.quote(ctx, scrutinee),
            actual: Term::Compound(vec![(key, Term::Hole)]),
            id,
        });
    }
}
