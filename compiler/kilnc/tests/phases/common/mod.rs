//! Shared helpers for phase tests.

use kiln_ir::surface::{SItem, SModule};
use kiln_ir::{IdGen, Modifiers, ModuleKind, Name};
use kiln_pack::machine::Machine;
use kiln_pack::{Nbt, Program, StackKind, UnitName};
use kilnc::{prelude, CompileOptions, Session};

/// A session over the builtin prelude with default options.
pub fn session() -> Session {
    Session::new(prelude(), CompileOptions::default())
}

pub fn session_with(options: CompileOptions) -> Session {
    Session::new(prelude(), options)
}

/// Unit name in the default namespace.
pub fn unit(path: &str) -> UnitName {
    UnitName::new("kiln", path)
}

/// A structure module wrapping `items`.
pub fn module(ids: &IdGen, name: &str, items: Vec<SItem>) -> SItem {
    SItem::Mod(SModule {
        id: ids.fresh(),
        name: Name::new(name),
        modifiers: Modifiers::empty(),
        kind: ModuleKind::Structure,
        items,
    })
}

/// Run `path` and return the machine.
pub fn run<'p>(session: &Session, program: &'p Program, path: &str) -> Machine<'p> {
    session.run(program, &unit(path)).unwrap()
}

pub fn int_stack(machine: &Machine<'_>) -> Vec<i32> {
    machine
        .stack(StackKind::Int)
        .iter()
        .map(|value| match value {
            Nbt::Int(n) => *n,
            other => panic!("non-int `{other}` on the int stack"),
        })
        .collect()
}
