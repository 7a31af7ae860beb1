//! Units stopped before defunctionalization.

use kiln_defun::TagCounter;
use kiln_diagnostic::{Diagnostic, ErrorCode};
use kiln_ir::surface::SurfaceBuilder;
use kiln_ir::{IdGen, Item, Modifiers, Name, Term};
use kilnc::PipelineError;
use pretty_assertions::assert_eq;

use crate::common::session;

#[test]
fn unbound_variable_stops_after_elaboration() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let a = b.var("a");
    let a_id = a.id;
    let item = b.def("f", Modifiers::empty(), b.ty_int(), a);

    let unit = session().compile_unit(&item, &TagCounter::new());
    assert_eq!(
        unit.error(),
        Some(&PipelineError::Diagnostics(vec![Diagnostic::VarNotFound {
            name: Name::new("a"),
            id: a_id,
        }]))
    );
    let Item::Def(def) = &unit.item else {
        panic!("expected a definition, got {:?}", unit.item);
    };
    assert_eq!(def.body, Some(Term::Hole));
}

#[test]
fn splice_in_compile_time_code_is_a_stage_mismatch() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let splice = b.splice(b.int(1));
    let splice_id = splice.id;
    let item = b.def("k", Modifiers::CONST, b.ty_int(), splice);

    let unit = session().compile_unit(&item, &TagCounter::new());
    assert_eq!(
        unit.error(),
        Some(&PipelineError::Diagnostics(vec![Diagnostic::StageMismatch {
            expected: 1,
            actual: 0,
            id: splice_id,
        }]))
    );
}

#[test]
fn types_are_kept_when_elaboration_fails() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let three = b.int(3);
    let three_id = three.id;
    let body = b.call("int/add", vec![three, b.var("missing")]);
    let item = b.def("f", Modifiers::empty(), b.ty_int(), body);

    let unit = session().compile_unit(&item, &TagCounter::new());
    assert_eq!(unit.error().map(PipelineError::codes), Some(vec![ErrorCode::E2001]));
    assert_eq!(unit.types.get(three_id), Some(&Term::Int));
}

#[test]
fn unsolved_hole_stops_after_zonking() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let item = b.def("f", Modifiers::empty(), b.ty_int(), b.hole());

    let unit = session().compile_unit(&item, &TagCounter::new());
    let Some(PipelineError::Unsolved(unsolved)) = unit.error() else {
        panic!("expected unsolved metavariables, got {:?}", unit.output);
    };
    assert_eq!(unsolved.len(), 1);
    assert_eq!(
        unit.error().map(PipelineError::codes),
        Some(vec![ErrorCode::E3001])
    );
}

#[test]
fn capturing_closure_is_rejected_after_staging() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let lam = b.lam(
        vec![("x", b.ty_int())],
        b.call("int/add", vec![b.var("x"), b.var("y")]),
    );
    let body = b.let_in("y", None, b.int(1), b.apply(lam, vec![b.int(2)]));
    let item = b.test("t", body);

    let unit = session().compile_unit(&item, &TagCounter::new());
    assert_eq!(unit.error().map(PipelineError::codes), Some(vec![ErrorCode::E9002]));
}
