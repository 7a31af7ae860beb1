#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;

use kiln_defun::FunctionTable;
use kiln_diagnostic::ErrorCode;
use kiln_ir::{EffectSet, Name, Param, Term};
use pretty_assertions::assert_eq;

use crate::{Nbt, PackError, Path, Program, Repr, StackKind, UnitName};

fn fun(params: Vec<Param>, result: Term) -> Term {
    Term::fun(params, result, EffectSet::new())
}

#[test]
fn proofs_and_units_erase_to_a_byte() {
    let eq = Term::Eq(Box::new(Term::IntOf(1)), Box::new(Term::IntOf(1)));
    assert_eq!(Repr::of_type(&eq), Ok(Repr::Unit));
    assert_eq!(Repr::of_type(&Term::Unit).map(|r| r.stack()), Ok(StackKind::Byte));
}

#[test]
fn erased_parameters_leave_a_gap_in_function_layouts() {
    let ty = fun(
        vec![
            Param::erased(Name::new("A"), Term::Type),
            Param::new(Name::new("x"), Term::Int),
        ],
        Term::List(Box::new(Term::Int)),
    );
    let repr = Repr::of_type(&ty).unwrap();
    assert_eq!(
        repr,
        Repr::Fun {
            params: vec![None, Some(Repr::Int)],
            result: Box::new(Repr::List(Box::new(Repr::Int))),
        }
    );
    assert_eq!(repr.stack(), StackKind::Int);
    assert_eq!(repr.to_string(), "fun(_, int) -> list<int>");
}

#[test]
fn unions_take_the_layout_of_their_members() {
    let empty = Term::Or(Vec::new());
    assert_eq!(Repr::of_type(&empty), Ok(Repr::Empty));
    assert_eq!(
        Repr::of_type(&Term::Or(vec![Term::Int, empty.clone()])),
        Ok(Repr::Int)
    );
    let mixed = Term::Or(vec![Term::Int, Term::String]);
    assert_eq!(
        Repr::of_type(&mixed),
        Err(PackError::Unerasable { ty: mixed.clone() })
    );
}

#[test]
fn universes_and_code_have_no_layout() {
    for ty in [Term::Type, Term::Code(Box::new(Term::Int))] {
        assert_eq!(
            Repr::of_type(&ty),
            Err(PackError::Unerasable { ty: ty.clone() })
        );
    }
}

#[test]
fn compound_layouts_find_fields_by_name() {
    let ty = Term::Compound(vec![
        (Name::new("a"), Term::Byte),
        (Name::new("b"), Term::Tuple(vec![Term::Int, Term::String])),
    ]);
    let repr = Repr::of_type(&ty).unwrap();
    assert_eq!(repr.field(Name::new("a")), Some(&Repr::Byte));
    assert_eq!(repr.field(Name::new("c")), None);
    assert_eq!(repr.to_string(), "{a: byte, b: (int, string)}");
}

#[test]
fn tuples_encode_as_positional_compounds() {
    let tuple = Term::TupleOf(vec![Term::IntOf(1), Term::BoolOf(true)]);
    let nbt = Nbt::from_literal(&tuple).unwrap();
    assert_eq!(
        nbt,
        Nbt::Compound(BTreeMap::from([
            ("0".to_owned(), Nbt::Int(1)),
            ("1".to_owned(), Nbt::Byte(1)),
        ]))
    );
    assert_eq!(nbt.to_string(), "{0: 1, 1: 1b}");
}

#[test]
fn computed_elements_are_not_literals() {
    let sum = Term::apply(
        Term::Def(Name::new("int/add")),
        vec![Term::IntOf(1), Term::IntOf(2)],
    );
    assert_eq!(Nbt::from_literal(&Term::IntArrayOf(vec![sum.clone()])), None);
    assert_eq!(Nbt::from_literal(&Term::ListOf(vec![Term::IntOf(0), sum])), None);
    assert_eq!(
        Nbt::from_literal(&Term::RefOf(Box::new(Term::StringOf("s".to_owned())))),
        Some(Nbt::List(vec![Nbt::String("s".to_owned())]))
    );
}

#[test]
fn snbt_suffixes_and_quoting() {
    let value = Nbt::Compound(BTreeMap::from([
        ("a b".to_owned(), Nbt::String("x".to_owned())),
        ("n".to_owned(), Nbt::Short(2)),
        (
            "xs".to_owned(),
            Nbt::List(vec![Nbt::Long(3), Nbt::Double(0.5)]),
        ),
        ("ys".to_owned(), Nbt::LongArray(vec![-1])),
    ]));
    assert_eq!(
        value.to_string(),
        "{\"a b\": \"x\", n: 2s, xs: [3L, 0.5d], ys: [L; -1L]}"
    );
    assert_eq!(Nbt::Float(1.5).to_string(), "1.5f");
}

#[test]
fn register_reads_wrap_and_floor() {
    assert_eq!(Nbt::Long((1 << 32) + 5).as_register(), Some(5));
    assert_eq!(Nbt::Float(-1.5).as_register(), Some(-2));
    assert_eq!(Nbt::String("1".to_owned()).as_register(), None);
    assert_eq!(Nbt::Byte(0).with_register(300), Some(Nbt::Byte(44)));
}

#[test]
fn paths_render_keys_and_indices() {
    let path = Path::stack_slot(StackKind::List, -1).index(0).key("x y");
    assert_eq!(path.to_string(), "stack.list[-1][0].\"x y\"");
    let (parent, _) = path.split_last().unwrap();
    assert_eq!(parent.to_string(), "stack.list[-1][0]");
    assert!(Path::root().is_root());
}

#[test]
fn unit_names_nest_under_their_root() {
    let program = Program {
        namespace: "demo".to_owned(),
        storage: "demo:runtime".to_owned(),
        units: BTreeMap::new(),
        table: FunctionTable::new(),
    };
    let root = program.unit_of(Name::new("lib/f"));
    assert_eq!(root.as_str(), "demo:lib/f");
    assert_eq!(root.child("match.0.1").to_string(), "demo:lib/f/match.0.1");
    assert_eq!(program.dispatcher(), UnitName::new("demo", "dispatch"));
}

#[test]
fn pack_errors_share_one_code() {
    let err = PackError::UnknownTag { tag: 3 };
    assert_eq!(err.code(), ErrorCode::E9003);
    assert_eq!(err.to_string(), "closure tag 3 is not in the function table");
}
