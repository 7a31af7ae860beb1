//! Programmatic construction of surface trees.
//!
//! Stands in for the parser in tests and tooling: every constructor mints a
//! fresh [`Id`] from the shared generator.

use super::{Expr, ExprKind, SBinder, SDef, SItem, SParam, SPattern, STest};
use crate::{IdGen, Modifiers, Name};

pub struct SurfaceBuilder<'a> {
    ids: &'a IdGen,
}

impl<'a> SurfaceBuilder<'a> {
    pub fn new(ids: &'a IdGen) -> Self {
        SurfaceBuilder { ids }
    }

    pub fn expr(&self, kind: ExprKind) -> Expr {
        Expr {
            id: self.ids.fresh(),
            kind,
        }
    }

    pub fn hole(&self) -> Expr {
        self.expr(ExprKind::Hole)
    }

    pub fn var(&self, name: &str) -> Expr {
        self.expr(ExprKind::Var(Name::new(name)))
    }

    pub fn unit(&self) -> Expr {
        self.expr(ExprKind::UnitOf)
    }

    pub fn bool(&self, b: bool) -> Expr {
        self.expr(ExprKind::BoolOf(b))
    }

    pub fn byte(&self, n: i8) -> Expr {
        self.expr(ExprKind::ByteOf(n))
    }

    pub fn int(&self, n: i32) -> Expr {
        self.expr(ExprKind::IntOf(n))
    }

    pub fn long(&self, n: i64) -> Expr {
        self.expr(ExprKind::LongOf(n))
    }

    pub fn string(&self, s: &str) -> Expr {
        self.expr(ExprKind::StringOf(s.to_owned()))
    }

    pub fn list(&self, elems: Vec<Expr>) -> Expr {
        self.expr(ExprKind::ListOf(elems))
    }

    pub fn tuple(&self, elems: Vec<Expr>) -> Expr {
        self.expr(ExprKind::TupleOf(elems))
    }

    pub fn compound(&self, fields: Vec<(&str, Expr)>) -> Expr {
        self.expr(ExprKind::CompoundOf(
            fields.into_iter().map(|(k, v)| (Name::new(k), v)).collect(),
        ))
    }

    pub fn apply(&self, func: Expr, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Apply {
            func: Box::new(func),
            args,
        })
    }

    /// `name(args...)` for a named callee.
    pub fn call(&self, name: &str, args: Vec<Expr>) -> Expr {
        let func = self.var(name);
        self.apply(func, args)
    }

    /// Lambda with annotated, relevant parameters.
    pub fn lam(&self, params: Vec<(&str, Expr)>, body: Expr) -> Expr {
        self.expr(ExprKind::FunOf {
            params: params
                .into_iter()
                .map(|(name, ty)| SBinder {
                    name: Name::new(name),
                    relevant: true,
                    ty: Some(ty),
                })
                .collect(),
            body: Box::new(body),
        })
    }

    pub fn let_in(&self, name: &str, anno: Option<Expr>, init: Expr, body: Expr) -> Expr {
        self.expr(ExprKind::Let {
            name: Name::new(name),
            anno: anno.map(Box::new),
            init: Box::new(init),
            body: Box::new(body),
        })
    }

    pub fn match_on(&self, scrutinee: Expr, clauses: Vec<(SPattern, Expr)>) -> Expr {
        self.expr(ExprKind::Match {
            scrutinee: Box::new(scrutinee),
            clauses,
        })
    }

    pub fn anno(&self, expr: Expr, ty: Expr) -> Expr {
        self.expr(ExprKind::Anno {
            expr: Box::new(expr),
            ty: Box::new(ty),
        })
    }

    pub fn code_of(&self, expr: Expr) -> Expr {
        self.expr(ExprKind::CodeOf(Box::new(expr)))
    }

    pub fn splice(&self, expr: Expr) -> Expr {
        self.expr(ExprKind::Splice(Box::new(expr)))
    }

    pub fn ty_unit(&self) -> Expr {
        self.expr(ExprKind::Unit)
    }

    pub fn ty_bool(&self) -> Expr {
        self.expr(ExprKind::Bool)
    }

    pub fn ty_byte(&self) -> Expr {
        self.expr(ExprKind::Byte)
    }

    pub fn ty_int(&self) -> Expr {
        self.expr(ExprKind::Int)
    }

    pub fn ty_type(&self) -> Expr {
        self.expr(ExprKind::Type)
    }

    pub fn ty_list(&self, elem: Expr) -> Expr {
        self.expr(ExprKind::List(Box::new(elem)))
    }

    pub fn ty_code(&self, elem: Expr) -> Expr {
        self.expr(ExprKind::Code(Box::new(elem)))
    }

    pub fn ty_fun(&self, params: Vec<SParam>, result: Expr, effects: &[&str]) -> Expr {
        self.expr(ExprKind::Fun {
            params,
            result: Box::new(result),
            effects: effects.iter().map(|e| Name::new(e)).collect(),
        })
    }

    /// A definition without parameters.
    pub fn def(&self, name: &str, modifiers: Modifiers, result: Expr, body: Expr) -> SItem {
        self.def_with(name, modifiers, Vec::new(), result, &[], Some(body))
    }

    pub fn def_with(
        &self,
        name: &str,
        modifiers: Modifiers,
        params: Vec<SParam>,
        result: Expr,
        effects: &[&str],
        body: Option<Expr>,
    ) -> SItem {
        SItem::Def(SDef {
            id: self.ids.fresh(),
            name: Name::new(name),
            modifiers,
            params,
            result,
            effects: effects.iter().map(|e| Name::new(e)).collect(),
            body,
        })
    }

    pub fn test(&self, name: &str, body: Expr) -> SItem {
        SItem::Test(STest {
            id: self.ids.fresh(),
            name: Name::new(name),
            body,
        })
    }
}
