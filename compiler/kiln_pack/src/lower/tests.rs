#![allow(clippy::unwrap_used, clippy::expect_used)]

use kiln_defun::{Closure, FunctionTable};
use kiln_ir::{
    Binder, Def, DefTable, EffectSet, Id, Item, Lvl, Modifiers, Name, Param, Pattern, Term, Test,
};
use pretty_assertions::assert_eq;

use crate::machine::Machine;
use crate::{
    pack_program, DispatchStrategy, Instr, LoweringTable, Nbt, PackError, PackOptions, Path,
    Program, Register, Source, StackKind, UnitName,
};

fn def(name: &str, params: Vec<Param>, result: Term, body: Term) -> Item {
    Item::Def(Def {
        id: Id::DUMMY,
        name: Name::new(name),
        modifiers: Modifiers::empty(),
        params,
        result,
        effects: EffectSet::new(),
        body: Some(body),
    })
}

fn test(body: Term) -> Item {
    Item::Test(Test {
        id: Id::DUMMY,
        name: Name::new("t"),
        body,
    })
}

fn int(name: &str) -> Param {
    Param::new(Name::new(name), Term::Int)
}

fn var(name: &str, level: u32) -> Term {
    Term::var(name, Lvl::new(level))
}

fn call(name: &str, args: Vec<Term>) -> Term {
    Term::apply(Term::Def(Name::new(name)), args)
}

fn closure(params: &[&str], body: Term) -> Closure {
    Closure {
        depth: Lvl::ZERO,
        params: params
            .iter()
            .map(|p| Binder {
                name: Name::new(p),
                relevant: true,
                ty: Term::Int,
            })
            .collect(),
        body,
    }
}

fn int_to_int() -> Term {
    Term::fun(vec![int("n")], Term::Int, EffectSet::new())
}

fn try_pack_with(
    items: Vec<Item>,
    table: FunctionTable,
    options: &PackOptions,
) -> Result<Program, PackError> {
    pack_program(&items, &table, &DefTable::new(), &LoweringTable::default(), options)
}

fn try_pack(items: Vec<Item>, table: FunctionTable) -> Result<Program, PackError> {
    try_pack_with(items, table, &PackOptions::default())
}

fn pack(items: Vec<Item>) -> Program {
    try_pack(items, FunctionTable::new()).unwrap()
}

fn unit(path: &str) -> UnitName {
    UnitName::new("kiln", path)
}

fn run<'p>(program: &'p Program, path: &str) -> Machine<'p> {
    let mut machine = Machine::new(program);
    machine.run(&unit(path)).unwrap();
    machine
}

fn ints(values: &[i32]) -> Vec<Nbt> {
    values.iter().map(|n| Nbt::Int(*n)).collect()
}

#[test]
fn constant_byte_is_a_single_append() {
    let program = pack(vec![def("c", Vec::new(), Term::Byte, Term::ByteOf(0))]);
    assert_eq!(
        program.get(&unit("c")),
        Some(
            &[Instr::Append {
                path: Path::stack(StackKind::Byte),
                source: Source::Value(Nbt::Byte(0)),
            }][..]
        )
    );
    let machine = run(&program, "c");
    assert_eq!(machine.stack(StackKind::Byte), &[Nbt::Byte(0)]);
}

#[test]
fn parameters_are_removed_beneath_the_result() {
    let f = def("f", vec![int("x"), int("y")], Term::Int, var("y", 1));
    let program = pack(vec![
        f,
        test(call("f", vec![Term::IntOf(1), Term::IntOf(2)])),
    ]);
    let int_at = |n| Path::stack_slot(StackKind::Int, n);
    assert_eq!(
        program.get(&unit("f")),
        Some(
            &[
                Instr::Append {
                    path: Path::stack(StackKind::Int),
                    source: Source::Path(int_at(-1)),
                },
                Instr::Remove { path: int_at(-2) },
                Instr::Remove { path: int_at(-2) },
            ][..]
        )
    );
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Int), ints(&[2]).as_slice());
}

#[test]
fn builtin_templates_compute_in_place() {
    let body = call(
        "int/add",
        vec![
            call("int/mul", vec![Term::IntOf(2), Term::IntOf(3)]),
            Term::IntOf(4),
        ],
    );
    let program = pack(vec![test(body)]);
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Int), ints(&[10]).as_slice());
}

#[test]
fn comparison_builtins_push_a_byte() {
    let program = pack(vec![test(call(
        "int/lt",
        vec![Term::IntOf(-3), Term::IntOf(2)],
    ))]);
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Byte), &[Nbt::Byte(1)]);
    assert!(machine.stack(StackKind::Int).is_empty());
}

#[test]
fn lets_are_dropped_after_their_body() {
    // let a = 5; let b = a - 1; a * b
    let body = Term::Let {
        name: Name::new("a"),
        ty: Box::new(Term::Int),
        init: Box::new(Term::IntOf(5)),
        body: Box::new(Term::Let {
            name: Name::new("b"),
            ty: Box::new(Term::Int),
            init: Box::new(call("int/sub", vec![var("a", 0), Term::IntOf(1)])),
            body: Box::new(call("int/mul", vec![var("a", 0), var("b", 1)])),
        }),
    };
    let program = pack(vec![test(body)]);
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Int), ints(&[20]).as_slice());
}

#[test]
fn offsets_only_count_slots_of_the_same_kind() {
    let pick = def(
        "pick",
        vec![
            Param::new(Name::new("flag"), Term::Bool),
            int("n"),
            Param::new(Name::new("s"), Term::String),
        ],
        Term::Int,
        var("n", 1),
    );
    let body = call(
        "pick",
        vec![
            Term::BoolOf(true),
            Term::IntOf(42),
            Term::StringOf("x".to_owned()),
        ],
    );
    let program = pack(vec![pick, test(body)]);
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Int), ints(&[42]).as_slice());
    assert!(machine.stack(StackKind::Byte).is_empty());
    assert!(machine.stack(StackKind::String).is_empty());
}

#[test]
fn erased_arguments_are_not_pushed() {
    let id = def(
        "id",
        vec![Param::erased(Name::new("A"), Term::Type), int("x")],
        Term::Int,
        var("x", 1),
    );
    let program = pack(vec![id, test(call("id", vec![Term::Int, Term::IntOf(4)]))]);
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Int), ints(&[4]).as_slice());
}

#[test]
fn computed_aggregates_are_filled_in_place() {
    let body = Term::CompoundOf(vec![
        (
            Name::new("a"),
            call("int/add", vec![Term::IntOf(1), Term::IntOf(2)]),
        ),
        (
            Name::new("b"),
            Term::ListOf(vec![
                Term::IntOf(1),
                call("int/add", vec![Term::IntOf(1), Term::IntOf(1)]),
            ]),
        ),
        (Name::new("c"), Term::StringOf("x".to_owned())),
    ]);
    let program = pack(vec![test(body)]);
    let machine = run(&program, "t");
    let expected = Nbt::Compound(
        [
            ("a".to_owned(), Nbt::Int(3)),
            ("b".to_owned(), Nbt::List(ints(&[1, 2]))),
            ("c".to_owned(), Nbt::String("x".to_owned())),
        ]
        .into_iter()
        .collect(),
    );
    assert_eq!(machine.stack(StackKind::Compound), &[expected]);
    assert!(machine.stack(StackKind::Int).is_empty());
    assert!(machine.stack(StackKind::List).is_empty());
}

#[test]
fn tuple_pattern_binds_components() {
    let tuple = Term::TupleOf(vec![
        Term::IntOf(1),
        call("int/add", vec![Term::IntOf(1), Term::IntOf(1)]),
    ]);
    let body = Term::Match {
        scrutinee: Box::new(tuple),
        clauses: vec![(
            Pattern::TupleOf(vec![
                Pattern::Var(Name::new("x")),
                Pattern::Var(Name::new("y")),
            ]),
            call("int/sub", vec![var("y", 1), var("x", 0)]),
        )],
    };
    let program = pack(vec![test(body)]);
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Int), ints(&[1]).as_slice());
    assert!(machine.stack(StackKind::Compound).is_empty());
}

#[test]
fn false_scrutinee_runs_only_the_false_clause() {
    let a = def("a", Vec::new(), Term::Int, Term::IntOf(1));
    let b = def("b", Vec::new(), Term::Int, Term::IntOf(2));
    let body = Term::Match {
        scrutinee: Box::new(Term::BoolOf(false)),
        clauses: vec![
            (Pattern::BoolOf(true), Term::Def(Name::new("a"))),
            (Pattern::BoolOf(false), Term::Def(Name::new("b"))),
        ],
    };
    let program = pack(vec![a, b, test(body)]);
    let machine = run(&program, "t");

    assert!(machine.trace().contains(&unit("b")));
    assert!(!machine.trace().contains(&unit("a")));
    assert!(!machine.trace().contains(&unit("t/match.0.0.body")));
    assert_eq!(machine.stack(StackKind::Int), ints(&[2]).as_slice());
    assert!(machine.stack(StackKind::Byte).is_empty());
}

#[test]
fn integer_clauses_fall_through_to_a_variable() {
    let body = Term::Match {
        scrutinee: Box::new(Term::IntOf(3)),
        clauses: vec![
            (Pattern::IntOf(1), Term::IntOf(10)),
            (Pattern::IntOf(2), Term::IntOf(20)),
            (
                Pattern::Var(Name::new("n")),
                call("int/mul", vec![var("n", 0), Term::IntOf(100)]),
            ),
        ],
    };
    let program = pack(vec![test(body)]);
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Int), ints(&[300]).as_slice());
    assert_eq!(machine.register(Register::R1), 1);
}

#[test]
fn list_patterns_test_the_length() {
    let x = || Pattern::Var(Name::new("x"));
    let body = Term::Match {
        scrutinee: Box::new(Term::ListOf(vec![Term::IntOf(1), Term::IntOf(2)])),
        clauses: vec![
            (Pattern::ListOf(vec![x()]), var("x", 0)),
            (
                Pattern::ListOf(vec![x(), Pattern::Var(Name::new("y"))]),
                call("int/add", vec![var("x", 0), var("y", 1)]),
            ),
            (Pattern::Drop, Term::IntOf(0)),
        ],
    };
    let program = pack(vec![test(body)]);
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Int), ints(&[3]).as_slice());
    assert!(machine.stack(StackKind::List).is_empty());
}

#[test]
fn string_patterns_use_containment() {
    let body = Term::Match {
        scrutinee: Box::new(Term::StringOf("b".to_owned())),
        clauses: vec![
            (Pattern::StringOf("a".to_owned()), Term::IntOf(1)),
            (Pattern::StringOf("b".to_owned()), Term::IntOf(2)),
            (Pattern::Drop, Term::IntOf(3)),
        ],
    };
    let program = pack(vec![test(body)]);
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Int), ints(&[2]).as_slice());
}

#[test]
fn dispatched_closure_matches_inline_code() {
    let mut table = FunctionTable::new();
    table.insert(
        0,
        closure(&["x"], call("int/add", vec![var("x", 0), Term::IntOf(1)])),
    );
    let dispatched = try_pack(
        vec![test(Term::apply(Term::IntOf(0), vec![Term::IntOf(2)]))],
        table,
    )
    .unwrap();
    let inline = pack(vec![test(call("int/add", vec![Term::IntOf(2), Term::IntOf(1)]))]);

    let via_dispatch = run(&dispatched, "t");
    let direct = run(&inline, "t");
    assert_eq!(via_dispatch.storage(), direct.storage());
    assert_eq!(via_dispatch.register(Register::R0), -1);
    assert!(via_dispatch.trace().contains(&unit("dispatch")));
}

#[test]
fn binary_dispatch_agrees_with_linear() {
    let mut table = FunctionTable::new();
    for tag in 0..5 {
        table.insert(tag, closure(&[], Term::IntOf(tag * 10)));
    }
    let items = || vec![test(Term::apply(Term::IntOf(3), Vec::new()))];
    let binary = PackOptions {
        dispatch: DispatchStrategy::Binary,
        ..PackOptions::default()
    };
    let linear = try_pack(items(), table.clone()).unwrap();
    let binary = try_pack_with(items(), table, &binary).unwrap();

    assert!(binary.units.contains_key(&unit("dispatch.2.4")));
    assert!(!linear.units.contains_key(&unit("dispatch.2.4")));
    for program in [&linear, &binary] {
        let machine = run(program, "t");
        assert_eq!(machine.stack(StackKind::Int), ints(&[30]).as_slice());
    }
}

#[test]
fn closures_passed_to_definitions_are_called_through_the_dispatcher() {
    let mut table = FunctionTable::new();
    table.insert(
        0,
        closure(&["x"], call("int/add", vec![var("x", 0), Term::IntOf(1)])),
    );
    let f = || var("f", 0);
    let twice = def(
        "twice",
        vec![Param::new(Name::new("f"), int_to_int()), int("x")],
        Term::Int,
        Term::apply(f(), vec![Term::apply(f(), vec![var("x", 1)])]),
    );
    let body = call("twice", vec![Term::IntOf(0), Term::IntOf(5)]);
    let program = try_pack(vec![twice, test(body)], table).unwrap();
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Int), ints(&[7]).as_slice());
}

#[test]
fn let_bound_closure_keeps_its_layout() {
    let mut table = FunctionTable::new();
    table.insert(0, closure(&["x"], call("int/mul", vec![var("x", 0), var("x", 0)])));
    let body = Term::Let {
        name: Name::new("sq"),
        ty: Box::new(int_to_int()),
        init: Box::new(Term::IntOf(0)),
        body: Box::new(Term::apply(var("sq", 0), vec![Term::IntOf(6)])),
    };
    let program = try_pack(vec![test(body)], table).unwrap();
    let machine = run(&program, "t");
    assert_eq!(machine.stack(StackKind::Int), ints(&[36]).as_slice());
}

#[test]
fn compile_time_definitions_get_no_unit() {
    let mut item = def("k", Vec::new(), Term::Int, Term::IntOf(1));
    if let Item::Def(def) = &mut item {
        def.modifiers = Modifiers::CONST;
    }
    let program = pack(vec![item]);
    assert!(program.units.is_empty());
}

#[test]
fn residual_holes_are_internal_errors() {
    assert_eq!(
        try_pack(vec![test(Term::Hole)], FunctionTable::new()),
        Err(PackError::Residual { term: Term::Hole })
    );
}

#[test]
fn abstract_definitions_cannot_be_called() {
    let ext = Item::Def(Def {
        id: Id::DUMMY,
        name: Name::new("ext"),
        modifiers: Modifiers::ABSTRACT,
        params: Vec::new(),
        result: Term::Int,
        effects: EffectSet::new(),
        body: None,
    });
    assert_eq!(
        try_pack(vec![ext, test(Term::Def(Name::new("ext")))], FunctionTable::new()),
        Err(PackError::Unresolved {
            name: Name::new("ext"),
        })
    );
}

#[test]
fn builtins_without_a_template_are_rejected() {
    let print = Item::Def(Def {
        id: Id::DUMMY,
        name: Name::new("io/print"),
        modifiers: Modifiers::BUILTIN,
        params: vec![int("x")],
        result: Term::Unit,
        effects: EffectSet::new(),
        body: None,
    });
    let body = call("io/print", vec![Term::IntOf(1)]);
    assert_eq!(
        try_pack(vec![print, test(body)], FunctionTable::new()),
        Err(PackError::UnknownBuiltin {
            name: Name::new("io/print"),
        })
    );
}

#[test]
fn unknown_tags_are_internal_errors() {
    let body = Term::apply(Term::IntOf(7), Vec::new());
    assert_eq!(
        try_pack(vec![test(body)], FunctionTable::new()),
        Err(PackError::UnknownTag { tag: 7 })
    );
}
