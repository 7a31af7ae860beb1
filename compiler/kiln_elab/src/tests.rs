#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use kiln_diagnostic::{Diagnostic, ErrorCode};
use kiln_ir::surface::{ExprKind, SBinder, SItem, SModule, SParam, SurfaceBuilder};
use kiln_ir::{
    Def, DefTable, EffectSet, Id, IdGen, Item, Lvl, Modifiers, ModuleKind, Name, Param, Pattern,
    Term,
};
use kiln_nbe::Builtins;
use pretty_assertions::assert_eq;

use crate::{elaborate_item, zonk_item, Elaborated};

fn declared(name: &str, modifiers: Modifiers, params: Vec<Param>, result: Term) -> Def {
    Def {
        id: Id::DUMMY,
        name: Name::new(name),
        modifiers,
        params,
        result,
        effects: EffectSet::new(),
        body: None,
    }
}

/// `int/add`, an effectful `io/print`, a runtime `g` and a polymorphic
/// compile-time `id`.
fn prelude() -> DefTable {
    let int = |n: &str| Param::new(Name::new(n), Term::Int);
    let add = declared(
        "int/add",
        Modifiers::BUILTIN,
        vec![int("a"), int("b")],
        Term::Int,
    );
    let print = Def {
        effects: [Name::new("io")].into_iter().collect(),
        ..declared("io/print", Modifiers::BUILTIN, vec![int("x")], Term::Unit)
    };
    let g = Def {
        body: Some(Term::IntOf(1)),
        ..declared("g", Modifiers::empty(), Vec::new(), Term::Int)
    };
    let a = Term::var("A", Lvl::new(0));
    let id = Def {
        body: Some(Term::var("x", Lvl::new(1))),
        ..declared(
            "id",
            Modifiers::CONST,
            vec![
                Param::erased(Name::new("A"), Term::Type),
                Param::new(Name::new("x"), a.clone()),
            ],
            a,
        )
    };
    [add, print, g, id].into_iter().collect()
}

fn elaborate(item: &SItem) -> Elaborated {
    elaborate_item(Arc::new(prelude()), Arc::new(Builtins::default()), item)
}

fn codes(elaborated: &Elaborated) -> Vec<ErrorCode> {
    elaborated.diagnostics.sorted().iter().map(Diagnostic::code).collect()
}

fn body(item: &Item) -> Option<&Term> {
    match item {
        Item::Def(def) => def.body.as_ref(),
        Item::Test(test) => Some(&test.body),
        Item::Mod(_) => None,
    }
}

fn erased_param(name: &str, ty: kiln_ir::surface::Expr) -> SParam {
    SParam {
        relevant: false,
        ..SParam::new(name, ty)
    }
}

#[test]
fn literal_body_checks_cleanly() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let value = b.int(3);
    let value_id = value.id;
    let item = b.def("three", Modifiers::empty(), b.ty_int(), value);
    let out = elaborate(&item);
    assert!(out.diagnostics.is_empty());
    assert_eq!(body(&out.item), Some(&Term::IntOf(3)));
    assert_eq!(out.types.get(value_id), Some(&Term::Int));
}

#[test]
fn unknown_variable_is_reported_once() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let y = b.var("y");
    let y_id = y.id;
    let item = b.def("f", Modifiers::empty(), b.ty_int(), y);
    let out = elaborate(&item);
    assert_eq!(
        out.diagnostics.sorted(),
        vec![Diagnostic::VarNotFound {
            name: Name::new("y"),
            id: y_id,
        }]
    );
    assert_eq!(body(&out.item), Some(&Term::Hole));
}

#[test]
fn unknown_qualified_path_is_def_not_found() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let item = b.def("f", Modifiers::empty(), b.ty_int(), b.var("nowhere/x"));
    assert_eq!(codes(&elaborate(&item)), vec![ErrorCode::E2002]);
}

#[test]
fn builtin_application_elaborates() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let call = b.call("int/add", vec![b.int(1), b.int(2)]);
    let item = b.def("f", Modifiers::empty(), b.ty_int(), call);
    let out = elaborate(&item);
    assert!(out.diagnostics.is_empty());
    assert_eq!(
        body(&out.item),
        Some(&Term::apply(
            Term::Def(Name::new("int/add")),
            vec![Term::IntOf(1), Term::IntOf(2)]
        ))
    );
}

#[test]
fn splice_at_meta_stage_is_a_stage_mismatch() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let splice = b.splice(b.int(1));
    let splice_id = splice.id;
    let item = b.def("k", Modifiers::CONST, b.ty_int(), splice);
    let out = elaborate(&item);
    assert_eq!(
        out.diagnostics.sorted(),
        vec![Diagnostic::StageMismatch {
            expected: 1,
            actual: 0,
            id: splice_id,
        }]
    );
}

#[test]
fn quotation_in_runtime_code_is_a_stage_mismatch() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let item = b.def(
        "f",
        Modifiers::empty(),
        b.ty_code(b.ty_int()),
        b.code_of(b.int(1)),
    );
    let out = elaborate(&item);
    assert!(matches!(
        out.diagnostics.sorted().as_slice(),
        [Diagnostic::StageMismatch {
            expected: 0,
            actual: 1,
            ..
        }]
    ));
}

#[test]
fn runtime_definition_at_meta_stage_is_a_phase_mismatch() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let item = b.def("k", Modifiers::CONST, b.ty_int(), b.var("g"));
    assert_eq!(codes(&elaborate(&item)), vec![ErrorCode::E2007]);
}

#[test]
fn const_definition_in_runtime_code_is_a_stage_mismatch() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let call = b.call("id", vec![b.ty_int(), b.int(1)]);
    let item = b.def("f", Modifiers::empty(), b.ty_int(), call);
    assert_eq!(codes(&elaborate(&item)), vec![ErrorCode::E2006]);
}

#[test]
fn spliced_quotation_is_accepted_in_runtime_code() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let quoted = b.code_of(b.call("int/add", vec![b.int(1), b.int(2)]));
    let item = b.def("f", Modifiers::empty(), b.ty_int(), b.splice(quoted));
    let out = elaborate(&item);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert!(matches!(body(&out.item), Some(Term::Splice(_))));
}

#[test]
fn undeclared_effect_is_reported() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let call = b.call("io/print", vec![b.int(1)]);
    let call_id = call.id;
    let item = b.def("f", Modifiers::empty(), b.ty_unit(), call);
    let out = elaborate(&item);
    assert_eq!(
        out.diagnostics.sorted(),
        vec![Diagnostic::EffectMismatch {
            permitted: EffectSet::new(),
            required: [Name::new("io")].into_iter().collect(),
            id: call_id,
        }]
    );
}

#[test]
fn declared_effect_permits_the_call() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let call = b.call("io/print", vec![b.int(1)]);
    let item = b.def_with("f", Modifiers::empty(), Vec::new(), b.ty_unit(), &["io"], Some(call));
    assert!(elaborate(&item).diagnostics.is_empty());
}

#[test]
fn wrong_argument_count_is_an_arity_mismatch() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let call = b.call("io/print", vec![b.int(1), b.int(2)]);
    let call_id = call.id;
    let item = b.def_with("f", Modifiers::empty(), Vec::new(), b.ty_unit(), &["io"], Some(call));
    let out = elaborate(&item);
    assert_eq!(
        out.diagnostics.sorted(),
        vec![Diagnostic::ArityMismatch {
            expected: 1,
            actual: 2,
            id: call_id,
        }]
    );
}

#[test]
fn erased_parameter_in_runtime_position_is_a_relevance_mismatch() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let item = b.def_with(
        "f",
        Modifiers::empty(),
        vec![erased_param("x", b.ty_int())],
        b.ty_int(),
        &[],
        Some(b.var("x")),
    );
    assert_eq!(codes(&elaborate(&item)), vec![ErrorCode::E2008]);
}

#[test]
fn runtime_binder_of_variable_type_is_poly_repr() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let params = vec![
        erased_param("A", b.ty_type()),
        SParam::new("x", b.var("A")),
    ];
    let item = b.def_with("f", Modifiers::empty(), params, b.var("A"), &[], Some(b.var("x")));
    assert_eq!(codes(&elaborate(&item)), vec![ErrorCode::E2009]);
}

#[test]
fn poly_repr_of_a_lambda_points_at_the_parameter_type() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let anno = b.var("A");
    let anno_id = anno.id;
    let lam = b.lam(vec![("x", anno)], b.int(0));
    let body = b.let_in("g", None, lam, b.int(1));
    let item = b.def_with(
        "f",
        Modifiers::empty(),
        vec![erased_param("A", b.ty_type())],
        b.ty_int(),
        &[],
        Some(body),
    );
    assert_eq!(
        elaborate(&item).diagnostics.sorted(),
        vec![Diagnostic::PolyRepr {
            ty: Term::var("A", Lvl::new(0)),
            id: anno_id,
        }]
    );
}

#[test]
fn polymorphism_is_fine_at_the_meta_stage() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let params = vec![
        erased_param("A", b.ty_type()),
        SParam::new("x", b.var("A")),
    ];
    let item = b.def_with("k", Modifiers::CONST, params, b.var("A"), &[], Some(b.var("x")));
    assert!(elaborate(&item).diagnostics.is_empty());
}

#[test]
fn known_scrutinee_without_matching_clause_is_a_match_failure() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let m = b.match_on(b.bool(true), vec![(Pattern::BoolOf(false), b.int(1))]);
    let m_id = m.id;
    let item = b.def("f", Modifiers::empty(), b.ty_int(), m);
    let out = elaborate(&item);
    assert_eq!(out.diagnostics.sorted(), vec![Diagnostic::MatchFailure { id: m_id }]);
}

#[test]
fn match_binds_pattern_variables() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let pair = b.tuple(vec![b.int(1), b.bool(true)]);
    let pattern = Pattern::TupleOf(vec![Pattern::Var(Name::new("n")), Pattern::Drop]);
    let m = b.match_on(pair, vec![(pattern, b.var("n"))]);
    let item = b.def("f", Modifiers::empty(), b.ty_int(), m);
    let out = elaborate(&item);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let Some(Term::Match { clauses, .. }) = body(&out.item) else {
        panic!("expected a match, got {:?}", out.item);
    };
    assert_eq!(clauses[0].1, Term::var("n", Lvl::new(0)));
}

#[test]
fn recursive_reference_resolves_to_the_unit_itself() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let recurse = b.call("loop", vec![b.var("n")]);
    let item = b.def_with(
        "loop",
        Modifiers::CONST,
        vec![SParam::new("n", b.ty_int())],
        b.ty_int(),
        &[],
        Some(recurse),
    );
    let out = elaborate(&item);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    assert_eq!(
        body(&out.item),
        Some(&Term::apply(
            Term::Def(Name::new("loop")),
            vec![Term::var("n", Lvl::new(0))]
        ))
    );
}

#[test]
fn module_members_resolve_relative_to_the_module() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let module = SItem::Mod(SModule {
        id: ids.fresh(),
        name: Name::new("m"),
        modifiers: Modifiers::empty(),
        kind: ModuleKind::Structure,
        items: vec![
            b.def("a", Modifiers::empty(), b.ty_int(), b.int(1)),
            b.def("b", Modifiers::empty(), b.ty_int(), b.var("a")),
        ],
    });
    let out = elaborate(&module);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let Item::Mod(module) = &out.item else {
        panic!("expected a module");
    };
    assert_eq!(module.items[1].name(), Name::new("m/b"));
    assert_eq!(body(&module.items[1]), Some(&Term::Def(Name::new("m/a"))));
}

#[test]
fn hole_is_solved_by_unification_and_zonked() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let call = b.call("id", vec![b.hole(), b.int(3)]);
    let item = b.def("k", Modifiers::CONST, b.ty_int(), call);
    let out = elaborate(&item);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);

    let zonked = zonk_item(&out.norm, out.item.clone()).unwrap();
    let expected = Term::apply(Term::Def(Name::new("id")), vec![Term::Int, Term::IntOf(3)]);
    assert_eq!(body(&zonked), Some(&expected));

    let again = zonk_item(&out.norm, zonked.clone()).unwrap();
    assert_eq!(again, zonked);
}

#[test]
fn unsolved_holes_fail_zonking() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let body_expr = b.let_in("x", None, b.hole(), b.int(1));
    let item = b.def("k", Modifiers::CONST, b.ty_int(), body_expr);
    let out = elaborate(&item);
    assert!(out.diagnostics.is_empty());

    let errors = zonk_item(&out.norm, out.item).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|d| matches!(d, Diagnostic::UnsolvedMeta { .. }) && d.is_fatal()));
}

#[test]
fn empty_list_checks_against_any_list_type() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let empty = b.anno(b.list(Vec::new()), b.ty_list(b.ty_int()));
    let item = b.def("xs", Modifiers::empty(), b.ty_list(b.ty_int()), empty);
    assert!(elaborate(&item).diagnostics.is_empty());
}

#[test]
fn member_of_a_union_is_a_subtype() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let union = b.expr(ExprKind::Or(vec![b.ty_int(), b.ty_bool()]));
    let item = b.def("u", Modifiers::empty(), union, b.bool(false));
    assert!(elaborate(&item).diagnostics.is_empty());
}

#[test]
fn mismatched_literal_is_reported_with_both_types() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let value = b.bool(true);
    let value_id = value.id;
    let item = b.def("f", Modifiers::empty(), b.ty_int(), value);
    let out = elaborate(&item);
    assert_eq!(
        out.diagnostics.sorted(),
        vec![Diagnostic::TermMismatch {
            expected: Term::Int,
            actual: Term::Bool,
            id: value_id,
        }]
    );
}

#[test]
fn lambda_parameter_type_comes_from_the_expected_type() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let lam = b.expr(ExprKind::FunOf {
        params: vec![SBinder {
            name: Name::new("x"),
            relevant: true,
            ty: None,
        }],
        body: Box::new(b.call("int/add", vec![b.var("x"), b.int(1)])),
    });
    let ty = b.ty_fun(vec![SParam::new("y", b.ty_int())], b.ty_int(), &[]);
    let item = b.def("inc", Modifiers::CONST, ty, lam);
    let out = elaborate(&item);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    let Some(Term::FunOf { params, .. }) = body(&out.item) else {
        panic!("expected a closure");
    };
    assert_eq!(params[0].ty, Term::Int);
}

#[test]
fn lambda_performing_effects_needs_them_in_its_type() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let lam = b.lam(
        vec![("x", b.ty_int())],
        b.call("io/print", vec![b.var("x")]),
    );
    let ty = b.ty_fun(vec![SParam::new("y", b.ty_int())], b.ty_unit(), &[]);
    let item = b.def_with("f", Modifiers::CONST, Vec::new(), ty, &["io"], Some(lam));
    assert_eq!(codes(&elaborate(&item)), vec![ErrorCode::E2005]);
}

/// The test prelude plus `pick: (@A: type <: int) -> unit`.
fn bounded_prelude() -> DefTable {
    let mut table = prelude();
    let param = Param {
        upper: Some(Term::Int),
        ..Param::erased(Name::new("A"), Term::Type)
    };
    table.insert_def(declared("pick", Modifiers::BUILTIN, vec![param], Term::Unit));
    table
}

#[test]
fn argument_outside_the_upper_bound_is_a_mismatch() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let arg = b.ty_bool();
    let arg_id = arg.id;
    let item = b.test("t", b.call("pick", vec![arg]));
    let out = elaborate_item(Arc::new(bounded_prelude()), Arc::new(Builtins::default()), &item);
    assert_eq!(
        out.diagnostics.sorted(),
        vec![Diagnostic::TermMismatch {
            expected: Term::Int,
            actual: Term::Bool,
            id: arg_id,
        }]
    );
}

#[test]
fn argument_within_the_upper_bound_is_accepted() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let item = b.test("t", b.call("pick", vec![b.ty_int()]));
    let out = elaborate_item(Arc::new(bounded_prelude()), Arc::new(Builtins::default()), &item);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics.sorted());
}

#[test]
fn refl_between_distinct_values_reports_both_sides() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let ty = b.expr(ExprKind::Eq(Box::new(b.int(1)), Box::new(b.int(2))));
    let refl = b.expr(ExprKind::Refl);
    let refl_id = refl.id;
    let item = b.def("f", Modifiers::CONST, ty, refl);
    let out = elaborate(&item);
    assert_eq!(
        out.diagnostics.sorted(),
        vec![Diagnostic::TermMismatch {
            expected: Term::IntOf(1),
            actual: Term::IntOf(2),
            id: refl_id,
        }]
    );
}

#[test]
fn refl_between_equal_values_is_accepted() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let ty = b.expr(ExprKind::Eq(Box::new(b.int(3)), Box::new(b.int(3))));
    let item = b.def("f", Modifiers::CONST, ty, b.expr(ExprKind::Refl));
    let out = elaborate(&item);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics.sorted());
    assert_eq!(body(&out.item), Some(&Term::Refl));
}
