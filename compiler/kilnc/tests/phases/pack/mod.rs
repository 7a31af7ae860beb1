//! Units compiled end to end and run on the reference machine.

use kiln_ir::surface::{SParam, SurfaceBuilder};
use kiln_ir::{IdGen, Modifiers, Pattern};
use kiln_pack::machine::MachineError;
use kiln_pack::{DispatchStrategy, Instr, Nbt, Path, Source, StackKind};
use kilnc::{CompileOptions, PipelineError};
use pretty_assertions::assert_eq;

use crate::common::{int_stack, module, run, session, session_with, unit};

#[test]
fn byte_constant_is_one_append() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let item = b.def("const", Modifiers::empty(), b.ty_byte(), b.byte(0));

    let session = session();
    let program = session.compile_program(&[item]).unwrap();
    assert_eq!(
        program.get(&unit("const")),
        Some(
            &[Instr::Append {
                path: Path::stack(StackKind::Byte),
                source: Source::Value(Nbt::Byte(0)),
            }][..]
        )
    );
    let machine = run(&session, &program, "const");
    assert_eq!(machine.stack(StackKind::Byte), &[Nbt::Byte(0)]);
}

#[test]
fn applied_lambda_matches_inline_arithmetic() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let lam = b.lam(
        vec![("x", b.ty_int())],
        b.call("int/add", vec![b.var("x"), b.int(1)]),
    );
    let via_closure = b.test("closure", b.apply(lam, vec![b.int(2)]));
    let inline = b.test("inline", b.call("int/add", vec![b.int(2), b.int(1)]));

    let session = session();
    let program = session.compile_program(&[via_closure, inline]).unwrap();
    assert_eq!(program.table.len(), 1);

    let dispatched = run(&session, &program, "closure");
    let direct = run(&session, &program, "inline");
    assert_eq!(dispatched.storage(), direct.storage());
    assert_eq!(int_stack(&dispatched), vec![3]);
    assert!(dispatched.trace().contains(&unit("dispatch")));
}

#[test]
fn false_scrutinee_runs_only_the_false_branch() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let body = b.match_on(
        b.bool(false),
        vec![
            (Pattern::BoolOf(true), b.var("a")),
            (Pattern::BoolOf(false), b.var("b")),
        ],
    );
    let item = module(
        &ids,
        "m",
        vec![
            b.def("a", Modifiers::empty(), b.ty_int(), b.int(1)),
            b.def("b", Modifiers::empty(), b.ty_int(), b.int(2)),
            b.test("t", body),
        ],
    );

    let session = session();
    let program = session.compile_program(&[item]).unwrap();
    let machine = run(&session, &program, "m/t");
    assert!(machine.trace().contains(&unit("m/b")));
    assert!(!machine.trace().contains(&unit("m/a")));
    assert_eq!(int_stack(&machine), vec![2]);
}

#[test]
fn spliced_compile_time_code_runs_at_runtime() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let quoted = b.code_of(b.call("int/mul", vec![b.int(6), b.int(7)]));
    let generator = b.def("answer", Modifiers::CONST, b.ty_code(b.ty_int()), quoted);
    let test = b.test("t", b.splice(b.var("answer")));

    let mut session = session();
    let generated = session.compile_unit(&generator, &kiln_defun::TagCounter::new());
    assert_eq!(generated.error(), None);
    session.define(&generated);

    let program = session.compile_program(&[test]).unwrap();
    assert!(program.get(&unit("answer")).is_none());
    let machine = run(&session, &program, "t");
    assert_eq!(int_stack(&machine), vec![42]);
}

#[test]
fn definitions_pass_as_closures() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let fun_ty = b.ty_fun(vec![SParam::new("n", b.ty_int())], b.ty_int(), &[]);
    let twice = b.def_with(
        "twice",
        Modifiers::empty(),
        vec![SParam::new("f", fun_ty), SParam::new("x", b.ty_int())],
        b.ty_int(),
        &[],
        Some(b.apply(b.var("f"), vec![b.apply(b.var("f"), vec![b.var("x")])])),
    );
    let inc = b.def_with(
        "inc",
        Modifiers::empty(),
        vec![SParam::new("n", b.ty_int())],
        b.ty_int(),
        &[],
        Some(b.call("int/add", vec![b.var("n"), b.int(1)])),
    );
    let test = b.test("t", b.call("twice", vec![b.var("inc"), b.int(5)]));
    let item = module(&ids, "h", vec![inc, twice, test]);

    for dispatch in [DispatchStrategy::Linear, DispatchStrategy::Binary] {
        let session = session_with(CompileOptions {
            dispatch,
            ..CompileOptions::default()
        });
        let program = session.compile_program(std::slice::from_ref(&item)).unwrap();
        let machine = run(&session, &program, "h/t");
        assert_eq!(int_stack(&machine), vec![7]);
    }
}

#[test]
fn match_on_integers_binds_the_fallback() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let body = b.match_on(
        b.call("int/sub", vec![b.int(10), b.int(7)]),
        vec![
            (Pattern::IntOf(0), b.int(-1)),
            (
                Pattern::Var(kiln_ir::Name::new("n")),
                b.call("int/mul", vec![b.var("n"), b.var("n")]),
            ),
        ],
    );
    let session = session();
    let program = session.compile_program(&[b.test("t", body)]).unwrap();
    let machine = run(&session, &program, "t");
    assert_eq!(int_stack(&machine), vec![9]);
}

#[test]
fn runaway_recursion_hits_the_step_budget() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let spin = b.def_with(
        "spin",
        Modifiers::empty(),
        vec![SParam::new("n", b.ty_int())],
        b.ty_int(),
        &[],
        Some(b.call("spin", vec![b.var("n")])),
    );
    let test = b.test("t", b.call("spin", vec![b.int(3)]));
    let item = module(&ids, "r", vec![spin, test]);

    let session = session_with(CompileOptions {
        budget: 1_000,
        ..CompileOptions::default()
    });
    let program = session.compile_program(&[item]).unwrap();
    assert_eq!(
        session.run(&program, &unit("r/t")).err(),
        Some(MachineError::BudgetExhausted { budget: 1_000 })
    );
}

#[test]
fn pack_errors_surface_through_the_pipeline() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let print = b.def_with(
        "io/print",
        Modifiers::BUILTIN,
        vec![SParam::new("x", b.ty_int())],
        b.ty_unit(),
        &[],
        None,
    );
    let mut session = session();
    let declared = session.compile_unit(&print, &kiln_defun::TagCounter::new());
    session.define(&declared);

    let test = b.test("t", b.call("io/print", vec![b.int(1)]));
    let err = session.compile_program(&[test]).unwrap_err();
    assert!(matches!(err, PipelineError::Pack(_)), "{err:?}");
}
