#![allow(clippy::unwrap_used, clippy::expect_used)]

use kiln_ir::{EffectSet, Lvl, Name, Param, Term};
use kiln_nbe::{Env, Normalizer, Value};

use crate::Elaborator;

fn elaborator() -> Elaborator {
    Elaborator::new(Normalizer::standalone())
}

fn value(elab: &Elaborator, ty: &Term) -> Value {
    elab.norm.eval(&Env::new(), ty)
}

fn holds(sub: &Term, sup: &Term) -> bool {
    let mut elab = elaborator();
    let (sub, sup) = (value(&elab, sub), value(&elab, sup));
    elab.subtype(Lvl::ZERO, &sub, &sup)
}

fn int_or_string() -> Term {
    Term::Or(vec![Term::Int, Term::String])
}

/// `(x: param) -> int`.
fn taking(param: Term) -> Term {
    Term::fun(vec![Param::new(Name::new("x"), param)], Term::Int, EffectSet::new())
}

fn with_effects(effects: &[&str]) -> Term {
    let effects = effects.iter().copied().map(Name::new).collect();
    Term::fun(vec![Param::new(Name::new("x"), Term::Int)], Term::Unit, effects)
}

/// `(@A: type <: upper) -> unit`.
fn bounded_above(upper: Term) -> Term {
    let param = Param {
        upper: Some(upper),
        ..Param::erased(Name::new("A"), Term::Type)
    };
    Term::fun(vec![param], Term::Unit, EffectSet::new())
}

/// `(@A: type :> lower) -> unit`.
fn bounded_below(lower: Option<Term>) -> Term {
    let param = Param {
        lower,
        ..Param::erased(Name::new("A"), Term::Type)
    };
    Term::fun(vec![param], Term::Unit, EffectSet::new())
}

#[test]
fn parameters_are_contravariant() {
    assert!(holds(&taking(int_or_string()), &taking(Term::Int)));
    assert!(!holds(&taking(Term::Int), &taking(int_or_string())));
}

#[test]
fn results_are_covariant() {
    let returning = |result| Term::fun(Vec::new(), result, EffectSet::new());
    assert!(holds(&returning(Term::Int), &returning(int_or_string())));
    assert!(!holds(&returning(int_or_string()), &returning(Term::Int)));
}

#[test]
fn effects_may_only_grow_towards_the_super_type() {
    assert!(holds(&with_effects(&[]), &with_effects(&["io"])));
    assert!(!holds(&with_effects(&["io"]), &with_effects(&[])));
    assert!(holds(&with_effects(&["io"]), &with_effects(&["io", "net"])));
}

#[test]
fn upper_bounds_narrow_contravariantly() {
    assert!(holds(&bounded_above(int_or_string()), &bounded_above(Term::Int)));
    assert!(!holds(&bounded_above(Term::Int), &bounded_above(int_or_string())));
}

#[test]
fn lower_bounds_widen_covariantly() {
    assert!(holds(&bounded_below(Some(Term::Int)), &bounded_below(Some(int_or_string()))));
    assert!(!holds(&bounded_below(Some(int_or_string())), &bounded_below(Some(Term::Int))));
}

#[test]
fn a_bound_cannot_be_dropped_by_the_super_type() {
    assert!(holds(&bounded_below(None), &bounded_below(Some(Term::Int))));
    assert!(!holds(&bounded_below(Some(Term::Int)), &bounded_below(None)));
}

#[test]
fn arity_must_agree() {
    let two = Term::fun(
        vec![
            Param::new(Name::new("x"), Term::Int),
            Param::new(Name::new("y"), Term::Int),
        ],
        Term::Int,
        EffectSet::new(),
    );
    assert!(!holds(&two, &taking(Term::Int)));
}
