//! Synthesis mode.

use std::sync::Arc;

use kiln_diagnostic::Diagnostic;
use kiln_ir::surface::{Expr, ExprKind, SBinder, SParam};
use kiln_ir::{Binder, Def, FunType, Id, Modifiers, Name, Param, Term};
use kiln_nbe::{Lazy, Value};
use kiln_stack::ensure_sufficient_stack;

use crate::ctx::{Ctx, Mode, META_STAGE, OBJECT_STAGE};
use crate::{effect_set, Elaborator};

impl Elaborator {
    /// Elaborate `expr` and synthesize its type.
    pub fn infer(&mut self, ctx: &Ctx, expr: &Expr) -> (Term, Value) {
        let (term, ty) = ensure_sufficient_stack(|| self.infer_inner(ctx, expr));
        self.record(ctx, expr.id, &ty);
        (term, ty)
    }

    fn infer_all(&mut self, ctx: &Ctx, exprs: &[Expr]) -> Vec<(Term, Value)> {
        exprs.iter().map(|e| self.infer(ctx, e)).collect()
    }

    #[allow(clippy::too_many_lines)]
    fn infer_inner(&mut self, ctx: &Ctx, expr: &Expr) -> (Term, Value) {
        let id = expr.id;
        match &expr.kind {
            ExprKind::Hole => {
                let term = self.fresh_meta(ctx);
                let ty = self.fresh_meta_value(ctx);
                (term, ty)
            }
            ExprKind::Var(name) => self.infer_var(ctx, id, *name),
            ExprKind::Let {
                name,
                anno,
                init,
                body,
            } => {
                let (ty_term, ty, init) = self.elab_let_binding(ctx, id, anno.as_deref(), init);
                let mut inner = ctx.clone();
                let value = Lazy::deferred(ctx.env.clone(), init.clone());
                inner.define(*name, ty, value);
                let (body, body_ty) = self.infer(&inner, body);
                let term = Term::Let {
                    name: *name,
                    ty: Box::new(ty_term),
                    init: Box::new(init),
                    body: Box::new(body),
                };
                (term, body_ty)
            }
            ExprKind::Match { scrutinee, clauses } => {
                let (scrutinee, scrutinee_ty) = self.infer(ctx, scrutinee);
                let result = self.fresh_meta_value(ctx);
                let term = self.elab_match(ctx, id, scrutinee, &scrutinee_ty, clauses, &result);
                (term, result)
            }
            ExprKind::Anno { expr, ty } => {
                let (_, ty) = self.check_type(ctx, ty);
                let term = self.check(ctx, expr, &ty);
                (term, ty)
            }

            ExprKind::UnitOf => (Term::UnitOf, Value::Unit),
            ExprKind::BoolOf(b) => (Term::BoolOf(*b), Value::Bool),
            ExprKind::ByteOf(n) => (Term::ByteOf(*n), Value::Byte),
            ExprKind::ShortOf(n) => (Term::ShortOf(*n), Value::Short),
            ExprKind::IntOf(n) => (Term::IntOf(*n), Value::Int),
            ExprKind::LongOf(n) => (Term::LongOf(*n), Value::Long),
            ExprKind::FloatOf(n) => (Term::FloatOf(*n), Value::Float),
            ExprKind::DoubleOf(n) => (Term::DoubleOf(*n), Value::Double),
            ExprKind::StringOf(s) => (Term::StringOf(s.clone()), Value::String),
            ExprKind::ByteArrayOf(elems) => {
                let elems = self.check_all(ctx, elems, &Value::Byte);
                (Term::ByteArrayOf(elems), Value::ByteArray)
            }
            ExprKind::IntArrayOf(elems) => {
                let elems = self.check_all(ctx, elems, &Value::Int);
                (Term::IntArrayOf(elems), Value::IntArray)
            }
            ExprKind::LongArrayOf(elems) => {
                let elems = self.check_all(ctx, elems, &Value::Long);
                (Term::LongArrayOf(elems), Value::LongArray)
            }
            ExprKind::ListOf(elems) => match elems.split_first() {
                // The empty list has the empty union as element type, a
                // subtype of every element type.
                None => (
                    Term::ListOf(Vec::new()),
                    Value::List(Lazy::ready(Value::Or(Vec::new()))),
                ),
                Some((first, rest)) => {
                    let (first, elem_ty) = self.infer(ctx, first);
                    let mut terms = vec![first];
                    terms.extend(self.check_all(ctx, rest, &elem_ty));
                    (Term::ListOf(terms), Value::List(Lazy::ready(elem_ty)))
                }
            },
            ExprKind::CompoundOf(fields) => {
                let mut fields: Vec<_> = fields
                    .iter()
                    .map(|(k, v)| {
                        let (term, ty) = self.infer(ctx, v);
                        (*k, term, ty)
                    })
                    .collect();
                fields.sort_by(|a, b| a.0.cmp(&b.0));
                let ty = Value::Compound(
                    fields
                        .iter()
                        .map(|(k, _, ty)| (*k, Lazy::ready(ty.clone())))
                        .collect(),
                );
                let term = Term::CompoundOf(fields.into_iter().map(|(k, t, _)| (k, t)).collect());
                (term, ty)
            }
            ExprKind::TupleOf(elems) => {
                let (terms, tys): (Vec<_>, Vec<_>) = self.infer_all(ctx, elems).into_iter().unzip();
                let ty = Value::Tuple(tys.into_iter().map(Lazy::ready).collect());
                (Term::TupleOf(terms), ty)
            }
            ExprKind::RefOf(elem) => {
                let (term, ty) = self.infer(ctx, elem);
                (Term::RefOf(Box::new(term)), Value::Ref(Lazy::ready(ty)))
            }
            ExprKind::Refl => {
                let witness = Lazy::ready(self.fresh_meta_value(ctx));
                (Term::Refl, Value::Eq(witness.clone(), witness))
            }

            ExprKind::FunOf { params, body } => self.infer_fun_of(ctx, id, params, body),
            ExprKind::Apply { func, args } => self.infer_apply(ctx, id, func, args),

            ExprKind::CodeOf(inner) => {
                if ctx.stage >= OBJECT_STAGE {
                    self.report(Diagnostic::StageMismatch {
                        expected: META_STAGE,
                        actual: ctx.stage,
                        id,
                    });
                    return (Term::Hole, Value::Hole);
                }
                let (term, ty) = self.infer(&ctx.with_stage(ctx.stage + 1), inner);
                (Term::CodeOf(Box::new(term)), Value::Code(Lazy::ready(ty)))
            }
            ExprKind::Splice(inner) => {
                if ctx.stage == META_STAGE {
                    self.report(Diagnostic::StageMismatch {
                        expected: OBJECT_STAGE,
                        actual: META_STAGE,
                        id,
                    });
                    return (Term::Hole, Value::Hole);
                }
                let result = self.fresh_meta_value(ctx);
                let code = Value::Code(Lazy::ready(result.clone()));
                let term = self.check(&ctx.with_stage(ctx.stage - 1), inner, &code);
                (Term::Splice(Box::new(term)), result)
            }

            ExprKind::Or(members) => {
                let members = self.check_types(ctx, members);
                (Term::Or(members), Value::Type)
            }
            ExprKind::And(members) => {
                let members = self.check_types(ctx, members);
                (Term::And(members), Value::Type)
            }
            ExprKind::Unit => (Term::Unit, Value::Type),
            ExprKind::Bool => (Term::Bool, Value::Type),
            ExprKind::Byte => (Term::Byte, Value::Type),
            ExprKind::Short => (Term::Short, Value::Type),
            ExprKind::Int => (Term::Int, Value::Type),
            ExprKind::Long => (Term::Long, Value::Type),
            ExprKind::Float => (Term::Float, Value::Type),
            ExprKind::Double => (Term::Double, Value::Type),
            ExprKind::String => (Term::String, Value::Type),
            ExprKind::ByteArray => (Term::ByteArray, Value::Type),
            ExprKind::IntArray => (Term::IntArray, Value::Type),
            ExprKind::LongArray => (Term::LongArray, Value::Type),
            ExprKind::Type => (Term::Type, Value::Type),
            ExprKind::List(elem) => {
                let (elem, _) = self.check_type(ctx, elem);
                (Term::List(Box::new(elem)), Value::Type)
            }
            ExprKind::Ref(elem) => {
                let (elem, _) = self.check_type(ctx, elem);
                (Term::Ref(Box::new(elem)), Value::Type)
            }
            ExprKind::Code(elem) => {
                let (elem, _) = self.check_type(ctx, elem);
                (Term::Code(Box::new(elem)), Value::Type)
            }
            ExprKind::Compound(fields) => {
                let mut fields: Vec<_> = fields
                    .iter()
                    .map(|(k, v)| (*k, self.check_type(ctx, v).0))
                    .collect();
                fields.sort_by(|a, b| a.0.cmp(&b.0));
                (Term::Compound(fields), Value::Type)
            }
            ExprKind::Tuple(elems) => {
                let elems = self.check_types(ctx, elems);
                (Term::Tuple(elems), Value::Type)
            }
            ExprKind::Eq(lhs, rhs) => {
                let erased = ctx.with_mode(Mode::Irrelevant);
                let (lhs, ty) = self.infer(&erased, lhs);
                let rhs = self.check(&erased, rhs, &ty);
                (Term::Eq(Box::new(lhs), Box::new(rhs)), Value::Type)
            }
            ExprKind::Fun {
                params,
                result,
                effects,
            } => {
                let term = self.elab_fun_type(ctx, params, result, effects);
                (term, Value::Type)
            }
        }
    }

    fn check_types(&mut self, ctx: &Ctx, exprs: &[Expr]) -> Vec<Term> {
        exprs.iter().map(|e| self.check_type(ctx, e).0).collect()
    }

    /// Resolve a name: locals innermost first, then definitions relative
    /// to each enclosing module, then the name as written.
    fn infer_var(&mut self, ctx: &Ctx, id: Id, name: Name) -> (Term, Value) {
        if let Some((level, entry)) = ctx.lookup(name) {
            let ty = entry.ty.clone();
            let mut ok = true;
            if ctx.mode == Mode::Relevant && entry.stage != ctx.stage {
                self.report(Diagnostic::StageMismatch {
                    expected: entry.stage,
                    actual: ctx.stage,
                    id,
                });
                ok = false;
            }
            if ctx.mode == Mode::Relevant && !entry.relevant {
                self.report(Diagnostic::RelevanceMismatch { name, id });
                ok = false;
            }
            let term = Term::var(name, level);
            if ctx.mode == Mode::Representation && !entry.type_relevant {
                self.report(Diagnostic::PolyRepr {
                    ty: term.clone(),
                    id,
                });
                ok = false;
            }
            return (if ok { term } else { Term::Hole }, ty);
        }

        let Some(def) = self.resolve_def(name) else {
            let diagnostic = if name.is_qualified() {
                Diagnostic::DefNotFound { name, id }
            } else {
                Diagnostic::VarNotFound { name, id }
            };
            self.report(diagnostic);
            return (Term::Hole, Value::Hole);
        };

        let ty = self.eval(&Ctx::new(ctx.stage, ctx.permitted.clone()), &def.signature());
        if ctx.mode == Mode::Relevant {
            let runtime_only = !def
                .modifiers
                .intersects(Modifiers::CONST | Modifiers::BUILTIN);
            if def.is_const() && ctx.stage >= OBJECT_STAGE {
                self.report(Diagnostic::StageMismatch {
                    expected: META_STAGE,
                    actual: ctx.stage,
                    id,
                });
                return (Term::Hole, ty);
            }
            if runtime_only && ctx.stage == META_STAGE {
                self.report(Diagnostic::PhaseMismatch {
                    name: def.name,
                    id,
                });
                return (Term::Hole, ty);
            }
        }
        (Term::Def(def.name), ty)
    }

    pub(crate) fn resolve_def(&self, name: Name) -> Option<Arc<Def>> {
        for prefix in (1..=self.module_path.len()).rev() {
            let qualified = self.module_path[..prefix]
                .iter()
                .rev()
                .fold(name, |acc, segment| segment.join(acc));
            if let Some(def) = self.norm.lookup_def(qualified) {
                return Some(Arc::clone(def));
            }
        }
        self.norm.lookup_def(name).cloned()
    }

    /// Elaborate the binding part of a `let`: its type, and its
    /// initializer checked against it.
    pub(crate) fn elab_let_binding(
        &mut self,
        ctx: &Ctx,
        id: Id,
        anno: Option<&Expr>,
        init: &Expr,
    ) -> (Term, Value, Term) {
        let (ty_term, ty, init) = match anno {
            Some(anno) => {
                let (ty_term, ty) = self.check_type(&ctx.with_mode(ctx.binder_type_mode(true)), anno);
                let init = self.check(ctx, init, &ty);
                (ty_term, ty, init)
            }
            None => {
                let (init, ty) = self.infer(ctx, init);
                (self.quote(ctx, &ty), ty, init)
            }
        };
        self.check_representable(ctx, id, &ty);
        (ty_term, ty, init)
    }

    fn infer_fun_of(
        &mut self,
        ctx: &Ctx,
        id: Id,
        params: &[SBinder],
        body: &Expr,
    ) -> (Term, Value) {
        let mut inner = ctx.clone();
        let mut binders = Vec::with_capacity(params.len());
        for param in params {
            let (ty_term, ty) = match &param.ty {
                Some(ty) => {
                    let mode = inner.binder_type_mode(param.relevant);
                    self.check_type(&inner.with_mode(mode), ty)
                }
                None => {
                    let term = self.fresh_meta(&inner);
                    let value = self.eval(&inner, &term);
                    (term, value)
                }
            };
            if param.relevant {
                let site = param.ty.as_ref().map_or(id, |ty| ty.id);
                self.check_representable(&inner, site, &ty);
            }
            binders.push(Binder {
                name: param.name,
                relevant: param.relevant,
                ty: ty_term,
            });
            inner.bind(param.name, ty, param.relevant, true);
        }
        let (body, body_ty) = self.infer(&inner, body);
        let fun_ty = Term::Fun(Box::new(FunType {
            params: binders
                .iter()
                .map(|b| Param {
                    relevant: b.relevant,
                    ..Param::new(b.name, b.ty.clone())
                })
                .collect(),
            result: self.quote(&inner, &body_ty),
            effects: ctx.permitted.clone(),
        }));
        let ty = self.eval(ctx, &fun_ty);
        let term = Term::FunOf {
            params: binders,
            body: Box::new(body),
        };
        (term, ty)
    }

    fn infer_apply(&mut self, ctx: &Ctx, id: Id, func: &Expr, args: &[Expr]) -> (Term, Value) {
        let (func, func_ty) = self.infer(ctx, func);
        let fun = match self.norm.force(func_ty) {
            Value::Fun(fun) => fun,
            Value::Hole => {
                let args = self.infer_all(ctx, args).into_iter().map(|(t, _)| t).collect();
                return (Term::apply(func, args), Value::Hole);
            }
            other if other.is_neutral() => return self.infer_apply_unknown(ctx, func, &other, args),
            other => {
                let actual = self.quote(ctx, &other);
                let expected = Term::fun(
                    args.iter().map(|_| Param::new(Name::EMPTY, Term::Hole)).collect(),
                    Term::Hole,
                    ctx.permitted.clone(),
                );
                self.report(Diagnostic::TermMismatch {
                    expected,
                    actual,
                    id,
                });
                self.infer_all(ctx, args);
                return (Term::Hole, Value::Hole);
            }
        };

        if fun.arity() != args.len() {
            self.report(Diagnostic::ArityMismatch {
                expected: fun.arity(),
                actual: args.len(),
                id,
            });
            self.infer_all(ctx, args);
            return (Term::Hole, Value::Hole);
        }

        let mut terms = Vec::with_capacity(args.len());
        let mut values: Vec<Lazy> = Vec::with_capacity(args.len());
        for (i, (arg, param)) in args.iter().zip(&fun.ty.params).enumerate() {
            let param_ty = fun.param_ty(&self.norm, i, &values);
            let arg_ctx = if param.relevant {
                ctx.clone()
            } else {
                ctx.with_mode(Mode::Irrelevant)
            };
            let term = self.check(&arg_ctx, arg, &param_ty);
            let value = self.eval(ctx, &term);

            if let Some(upper) = fun.upper(&self.norm, i, &values) {
                if !self.subtype(ctx.depth(), &value, &upper) {
                    self.report(Diagnostic::TermMismatch {
                        expected: self.quote(ctx, &upper),
                        actual: self.quote(ctx, &value),
                        id: arg.id,
                    });
                }
            }
            if let Some(lower) = fun.lower(&self.norm, i, &values) {
                if !self.subtype(ctx.depth(), &lower, &value) {
                    self.report(Diagnostic::TermMismatch {
                        expected: self.quote(ctx, &lower),
                        actual: self.quote(ctx, &value),
                        id: arg.id,
                    });
                }
            }
            terms.push(term);
            values.push(Lazy::ready(value));
        }

        if ctx.mode == Mode::Relevant && !fun.ty.effects.is_subset(&ctx.permitted) {
            self.report(Diagnostic::EffectMismatch {
                permitted: ctx.permitted.clone(),
                required: fun.ty.effects.clone(),
                id,
            });
        }

        let result = fun.result(&self.norm, &values);
        (Term::apply(func, terms), result)
    }

    /// Application of something whose type is not yet known: assume a
    /// non-dependent function type built from the argument types.
    fn infer_apply_unknown(
        &mut self,
        ctx: &Ctx,
        func: Term,
        func_ty: &Value,
        args: &[Expr],
    ) -> (Term, Value) {
        let inferred = self.infer_all(ctx, args);
        let params = inferred
            .iter()
            .enumerate()
            .map(|(i, (_, ty))| Param::new(Name::new(&format!("_{i}")), self.quote(ctx, ty)))
            .collect();
        let result = self.fresh_meta(ctx);
        let expected = Term::fun(params, result.clone(), ctx.permitted.clone());
        let expected = self.eval(ctx, &expected);
        let depth = ctx.depth();
        if !self.norm.unify(depth, func_ty, &expected) {
            tracing::trace!("callee type left unconstrained");
        }
        let args = inferred.into_iter().map(|(t, _)| t).collect();
        (Term::apply(func, args), self.eval(ctx, &result))
    }

    /// Elaborate a surface function type.
    fn elab_fun_type(
        &mut self,
        ctx: &Ctx,
        params: &[SParam],
        result: &Expr,
        effects: &[Name],
    ) -> Term {
        let mut inner = ctx.clone();
        let mut core = Vec::with_capacity(params.len());
        for param in params {
            let mode = if param.relevant && ctx.mode == Mode::Representation {
                Mode::Representation
            } else {
                Mode::Irrelevant
            };
            let (ty_term, ty) = self.check_type(&inner.with_mode(mode), &param.ty);
            let erased = inner.with_mode(Mode::Irrelevant);
            let lower = param.lower.as_ref().map(|b| self.check(&erased, b, &ty));
            let upper = param.upper.as_ref().map(|b| self.check(&erased, b, &ty));
            core.push(Param {
                name: param.name,
                relevant: param.relevant,
                lower,
                upper,
                type_relevant: param.type_relevant,
                ty: ty_term,
            });
            inner.bind(param.name, ty, param.relevant, param.type_relevant);
        }
        let (result, _) = self.check_type(&inner, result);
        Term::fun(core, result, effect_set(effects))
    }

    /// Report a runtime binder whose type is only known up to a variable.
    pub(crate) fn check_representable(&mut self, ctx: &Ctx, id: Id, ty: &Value) {
        if ctx.stage < OBJECT_STAGE || ctx.mode != Mode::Relevant {
            return;
        }
        let stuck_on_var = match self.norm.force(ty.clone()) {
            Value::Var(..) => true,
            Value::Apply(head, _) => matches!(*head, Value::Var(..)),
            _ => false,
        };
        if stuck_on_var {
            self.report(Diagnostic::PolyRepr {
                ty: self.quote(ctx, ty),
                id,
            });
        }
    }
}
