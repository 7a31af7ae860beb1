//! Structural subtyping.

use std::rc::Rc;

use kiln_ir::{Lvl, Name};
use kiln_nbe::{FunClosure, Lazy, Value};
use kiln_stack::ensure_sufficient_stack;

use crate::Elaborator;

impl Elaborator {
    /// Whether `sub <: sup` at context depth `level`.
    ///
    /// Falls back to unification, so metavariables on either side get
    /// solved by equality rather than by a bound.
    pub fn subtype(&mut self, level: Lvl, sub: &Value, sup: &Value) -> bool {
        ensure_sufficient_stack(|| {
            let sub = self.norm.force(sub.clone());
            let sup = self.norm.force(sup.clone());
            self.subtype_forced(level, sub, sup)
        })
    }

    fn subtype_lazy(&mut self, level: Lvl, sub: &Lazy, sup: &Lazy) -> bool {
        let sub = sub.value(&self.norm);
        let sup = sup.value(&self.norm);
        self.subtype(level, &sub, &sup)
    }

    fn subtype_forced(&mut self, level: Lvl, sub: Value, sup: Value) -> bool {
        if is_flexible(&sub) || is_flexible(&sup) {
            return self.norm.unify(level, &sub, &sup);
        }
        match (sub, sup) {
            (Value::Hole, _) | (_, Value::Hole) => true,

            (Value::Or(members), sup) => members
                .iter()
                .all(|m| self.subtype(level, &m.value(&self.norm), &sup)),
            (sub, Value::And(members)) => members
                .iter()
                .all(|m| self.subtype(level, &sub, &m.value(&self.norm))),
            (sub, Value::Or(members)) => members
                .iter()
                .any(|m| self.subtype(level, &sub, &m.value(&self.norm))),
            (Value::And(members), sup) => members
                .iter()
                .any(|m| self.subtype(level, &m.value(&self.norm), &sup)),

            (Value::Fun(sub), Value::Fun(sup)) => self.subtype_fun(level, &sub, &sup),
            (Value::Compound(sub), Value::Compound(sup)) => self.subtype_fields(level, &sub, &sup),
            (Value::Tuple(sub), Value::Tuple(sup)) => {
                sub.len() == sup.len()
                    && sub
                        .iter()
                        .zip(&sup)
                        .all(|(a, b)| self.subtype_lazy(level, a, b))
            }
            (Value::List(sub), Value::List(sup)) | (Value::Code(sub), Value::Code(sup)) => {
                self.subtype_lazy(level, &sub, &sup)
            }
            (sub, sup) => self.norm.unify(level, &sub, &sup),
        }
    }

    /// Width and depth: every field of `sup` must be in `sub`.
    fn subtype_fields(&mut self, level: Lvl, sub: &[(Name, Lazy)], sup: &[(Name, Lazy)]) -> bool {
        sup.iter().all(|(key, sup_ty)| {
            match sub.iter().find(|(k, _)| k == key) {
                Some((_, sub_ty)) => self.subtype_lazy(level, sub_ty, sup_ty),
                None => false,
            }
        })
    }

    /// Parameters (with their bounds) contravariant, result covariant,
    /// effects by inclusion.
    fn subtype_fun(&mut self, level: Lvl, sub: &Rc<FunClosure>, sup: &Rc<FunClosure>) -> bool {
        if sub.arity() != sup.arity() || !sub.ty.effects.is_subset(&sup.ty.effects) {
            return false;
        }
        let mut vars: Vec<Lazy> = Vec::with_capacity(sub.arity());
        for (i, (ps, pp)) in sub.ty.params.iter().zip(&sup.ty.params).enumerate() {
            if ps.relevant != pp.relevant {
                return false;
            }
            let at = level.plus(i);
            let (sub_ty, sup_ty) = (sub.param_ty(&self.norm, i, &vars), sup.param_ty(&self.norm, i, &vars));
            if !self.subtype(at, &sup_ty, &sub_ty) {
                return false;
            }
            // The super type may only accept arguments the sub type accepts.
            match (sub.upper(&self.norm, i, &vars), sup.upper(&self.norm, i, &vars)) {
                (None, _) => {}
                (Some(_), None) => return false,
                (Some(sub_upper), Some(sup_upper)) => {
                    if !self.subtype(at, &sup_upper, &sub_upper) {
                        return false;
                    }
                }
            }
            match (sub.lower(&self.norm, i, &vars), sup.lower(&self.norm, i, &vars)) {
                (None, _) => {}
                (Some(_), None) => return false,
                (Some(sub_lower), Some(sup_lower)) => {
                    if !self.subtype(at, &sub_lower, &sup_lower) {
                        return false;
                    }
                }
            }
            vars.push(Lazy::ready(Value::var(ps.name, at)));
        }
        let (sub_result, sup_result) = (sub.result(&self.norm, &vars), sup.result(&self.norm, &vars));
        self.subtype(level.plus(vars.len()), &sub_result, &sup_result)
    }
}

fn is_flexible(value: &Value) -> bool {
    match value {
        Value::Meta(_) => true,
        Value::Apply(head, _) => matches!(**head, Value::Meta(_)),
        _ => false,
    }
}

#[cfg(test)]
mod tests;
