use pretty_assertions::assert_eq;

use super::*;

fn def(name: &str, modifiers: Modifiers) -> Def {
    Def {
        id: Id::DUMMY,
        name: Name::new(name),
        modifiers,
        params: Vec::new(),
        result: Term::Int,
        effects: EffectSet::new(),
        body: Some(Term::IntOf(0)),
    }
}

#[test]
fn signature_without_params_is_result() {
    assert_eq!(def("k", Modifiers::CONST).signature(), Term::Int);
}

#[test]
fn signature_with_params_is_function() {
    let mut d = def("f", Modifiers::empty());
    d.params.push(Param::new(Name::new("x"), Term::Int));
    let Term::Fun(fun) = d.signature() else {
        panic!("expected a function type");
    };
    assert_eq!(fun.params.len(), 1);
    assert_eq!(fun.result, Term::Int);
}

#[test]
fn only_const_defs_unfold() {
    assert!(def("a", Modifiers::CONST).is_unfoldable());
    assert!(!def("b", Modifiers::empty()).is_unfoldable());
    assert!(!def("c", Modifiers::CONST | Modifiers::ABSTRACT).is_unfoldable());
    assert!(!def("d", Modifiers::CONST | Modifiers::OPAQUE).is_unfoldable());
}

#[test]
fn opaque_module_members_are_marked() {
    let module = Item::Mod(Module {
        id: Id::DUMMY,
        name: Name::new("m"),
        modifiers: Modifiers::CONST,
        kind: ModuleKind::Opaque,
        items: vec![Item::Def(def("m/x", Modifiers::empty()))],
    });
    let mut table = DefTable::new();
    table.insert_item(&module);
    let x = table.get(Name::new("m/x")).map(|d| d.modifiers);
    assert_eq!(x, Some(Modifiers::CONST | Modifiers::OPAQUE));
    assert!(!table.get(Name::new("m/x")).is_some_and(|d| d.is_unfoldable()));
}

#[test]
fn lowered_defs_exclude_compile_time_ones() {
    assert!(def("r", Modifiers::empty()).is_lowered());
    assert!(!def("k", Modifiers::CONST).is_lowered());
    assert!(!def("b", Modifiers::BUILTIN).is_lowered());
}
