//! Checking mode.

use std::rc::Rc;

use kiln_diagnostic::Diagnostic;
use kiln_ir::surface::{Expr, ExprKind, SBinder, SPattern};
use kiln_ir::{Binder, Id, Term};
use kiln_nbe::{FunClosure, Lazy, Value};
use kiln_stack::ensure_sufficient_stack;

use crate::ctx::{Ctx, Mode, META_STAGE, OBJECT_STAGE};
use crate::Elaborator;

impl Elaborator {
    /// Elaborate `expr` against `expected`.
    ///
    /// On mismatch reports [`Diagnostic::TermMismatch`] and returns `Hole`.
    pub fn check(&mut self, ctx: &Ctx, expr: &Expr, expected: &Value) -> Term {
        ensure_sufficient_stack(|| self.check_inner(ctx, expr, expected))
    }

    pub(crate) fn check_all(&mut self, ctx: &Ctx, exprs: &[Expr], expected: &Value) -> Vec<Term> {
        exprs.iter().map(|e| self.check(ctx, e, expected)).collect()
    }

    /// Elaborate a type expression. Outside representation mode, types
    /// are erased.
    pub fn check_type(&mut self, ctx: &Ctx, expr: &Expr) -> (Term, Value) {
        let ctx = match ctx.mode {
            Mode::Relevant => ctx.with_mode(Mode::Irrelevant),
            _ => ctx.clone(),
        };
        let term = self.check(&ctx, expr, &Value::Type);
        let value = self.eval(&ctx, &term);
        (term, value)
    }

    fn check_inner(&mut self, ctx: &Ctx, expr: &Expr, expected: &Value) -> Term {
        let id = expr.id;
        let forced = self.norm.force(expected.clone());
        match (&expr.kind, forced) {
            (ExprKind::Hole, _) => {
                self.record(ctx, id, expected);
                self.fresh_meta(ctx)
            }
            (
                ExprKind::Let {
                    name,
                    anno,
                    init,
                    body,
                },
                _,
            ) => {
                self.record(ctx, id, expected);
                let (ty_term, ty, init) = self.elab_let_binding(ctx, id, anno.as_deref(), init);
                let mut inner = ctx.clone();
                inner.define(*name, ty, Lazy::deferred(ctx.env.clone(), init.clone()));
                let body = self.check(&inner, body, expected);
                Term::Let {
                    name: *name,
                    ty: Box::new(ty_term),
                    init: Box::new(init),
                    body: Box::new(body),
                }
            }
            (ExprKind::Match { scrutinee, clauses }, _) => {
                self.record(ctx, id, expected);
                let (scrutinee, scrutinee_ty) = self.infer(ctx, scrutinee);
                self.elab_match(ctx, id, scrutinee, &scrutinee_ty, clauses, expected)
            }
            (ExprKind::FunOf { params, body }, Value::Fun(fun)) if fun.arity() == params.len() => {
                self.record(ctx, id, expected);
                self.check_fun_of(ctx, id, params, body, &fun)
            }
            (ExprKind::ListOf(elems), Value::List(elem)) => {
                self.record(ctx, id, expected);
                let elem = elem.value(&self.norm);
                Term::ListOf(self.check_all(ctx, elems, &elem))
            }
            (ExprKind::TupleOf(elems), Value::Tuple(tys)) if elems.len() == tys.len() => {
                self.record(ctx, id, expected);
                let terms = elems
                    .iter()
                    .zip(tys.iter())
                    .map(|(e, ty)| {
                        let ty = ty.value(&self.norm);
                        self.check(ctx, e, &ty)
                    })
                    .collect();
                Term::TupleOf(terms)
            }
            (ExprKind::RefOf(elem), Value::Ref(ty)) => {
                self.record(ctx, id, expected);
                let ty = ty.value(&self.norm);
                Term::RefOf(Box::new(self.check(ctx, elem, &ty)))
            }
            (ExprKind::Refl, Value::Eq(lhs, rhs)) => {
                self.record(ctx, id, expected);
                let (lhs, rhs) = (lhs.value(&self.norm), rhs.value(&self.norm));
                if self.norm.unify(ctx.depth(), &lhs, &rhs) {
                    Term::Refl
                } else {
                    // Report the two sides that failed to convert.
                    let actual = self.quote(ctx, &rhs);
                    self.mismatch(ctx, id, &lhs, actual)
                }
            }
            (ExprKind::CodeOf(inner), Value::Code(ty)) => {
                self.record(ctx, id, expected);
                if ctx.stage >= OBJECT_STAGE {
                    self.report(Diagnostic::StageMismatch {
                        expected: META_STAGE,
                        actual: ctx.stage,
                        id,
                    });
                    return Term::Hole;
                }
                let ty = ty.value(&self.norm);
                let term = self.check(&ctx.with_stage(ctx.stage + 1), inner, &ty);
                Term::CodeOf(Box::new(term))
            }
            (ExprKind::Splice(inner), _) => {
                self.record(ctx, id, expected);
                if ctx.stage == META_STAGE {
                    self.report(Diagnostic::StageMismatch {
                        expected: OBJECT_STAGE,
                        actual: META_STAGE,
                        id,
                    });
                    return Term::Hole;
                }
                let code = Value::Code(Lazy::ready(expected.clone()));
                let term = self.check(&ctx.with_stage(ctx.stage - 1), inner, &code);
                Term::Splice(Box::new(term))
            }
            (_, Value::Hole) => self.infer(ctx, expr).0,
            _ => {
                let (term, actual) = self.infer(ctx, expr);
                if self.subtype(ctx.depth(), &actual, expected) {
                    term
                } else {
                    let actual = self.quote(ctx, &actual);
                    self.mismatch(ctx, id, expected, actual)
                }
            }
        }
    }

    fn mismatch(&mut self, ctx: &Ctx, id: Id, expected: &Value, actual: Term) -> Term {
        self.report(Diagnostic::TermMismatch {
            expected: self.quote(ctx, expected),
            actual,
            id,
        });
        Term::Hole
    }

    /// A lambda against a function type: parameter types come from the
    /// type unless annotated, and the body may perform the type's effects.
    fn check_fun_of(
        &mut self,
        ctx: &Ctx,
        id: Id,
        params: &[SBinder],
        body: &Expr,
        fun: &Rc<FunClosure>,
    ) -> Term {
        let mut inner = ctx.clone();
        inner.permitted = fun.ty.effects.clone();
        let mut binders = Vec::with_capacity(params.len());
        let mut vars: Vec<Lazy> = Vec::with_capacity(params.len());
        for (i, (binder, param)) in params.iter().zip(&fun.ty.params).enumerate() {
            let expected_ty = fun.param_ty(&self.norm, i, &vars);
            if binder.relevant != param.relevant {
                self.report(Diagnostic::RelevanceMismatch {
                    name: binder.name,
                    id,
                });
            }
            let (ty_term, ty) = match &binder.ty {
                Some(anno) => {
                    let mode = inner.binder_type_mode(param.relevant);
                    let (ty_term, ty) = self.check_type(&inner.with_mode(mode), anno);
                    if !self.subtype(inner.depth(), &expected_ty, &ty) {
                        let actual = ty_term.clone();
                        self.mismatch(&inner, anno.id, &expected_ty, actual);
                    }
                    (ty_term, ty)
                }
                None => (self.quote(&inner, &expected_ty), expected_ty),
            };
            if param.relevant {
                let site = binder.ty.as_ref().map_or(id, |anno| anno.id);
                self.check_representable(&inner, site, &ty);
            }
            binders.push(Binder {
                name: binder.name,
                relevant: param.relevant,
                ty: ty_term,
            });
            let var = inner.bind(binder.name, ty, param.relevant, param.type_relevant);
            vars.push(Lazy::ready(var));
        }
        let result = fun.result(&self.norm, &vars);
        let body = self.check(&inner, body, &result);
        Term::FunOf {
            params: binders,
            body: Box::new(body),
        }
    }

    /// Elaborate the clauses of a match whose scrutinee is already
    /// elaborated. Reports [`Diagnostic::MatchFailure`] when the scrutinee
    /// is known and no clause can match it.
    pub(crate) fn elab_match(
        &mut self,
        ctx: &Ctx,
        id: Id,
        scrutinee: Term,
        scrutinee_ty: &Value,
        clauses: &[(SPattern, Expr)],
        expected: &Value,
    ) -> Term {
        let mut core = Vec::with_capacity(clauses.len());
        for (pattern, body) in clauses {
            let inner = self.check_pattern(ctx, id, pattern, scrutinee_ty);
            let body = self.check(&inner, body, expected);
            core.push((pattern.clone(), body));
        }

        let value = self.norm.force(self.eval(ctx, &scrutinee));
        if !value.is_neutral() {
            let patterns: Vec<_> = clauses.iter().map(|(p, _)| p).collect();
            if self.norm.match_fails(&value, &patterns) {
                self.report(Diagnostic::MatchFailure { id });
            }
        }

        Term::Match {
            scrutinee: Box::new(scrutinee),
            clauses: core,
        }
    }
}
