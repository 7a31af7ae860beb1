use std::sync::Arc;

use kiln_ir::{Def, DefTable, EffectSet, Id, Item, Lvl, Modifiers, Name, Param, Term, Test};
use kiln_nbe::{Builtins, Normalizer};
use pretty_assertions::assert_eq;

use crate::{stage_item, StageError};

fn def(name: &str, modifiers: Modifiers, params: Vec<Param>, result: Term, body: Term) -> Def {
    Def {
        id: Id::DUMMY,
        name: Name::new(name),
        modifiers,
        params,
        result,
        effects: EffectSet::new(),
        body: Some(body),
    }
}

fn runtime(params: Vec<Param>, body: Term) -> Item {
    Item::Def(def("f", Modifiers::empty(), params, Term::Int, body))
}

fn normalizer(defs: Vec<Def>) -> Normalizer {
    let table: DefTable = defs.into_iter().collect();
    Normalizer::new(Arc::new(table), Arc::new(Builtins::default()))
}

fn staged_body(item: Item) -> Option<Term> {
    match item {
        Item::Def(def) => def.body,
        Item::Test(test) => Some(test.body),
        Item::Mod(_) => None,
    }
}

fn splice(term: Term) -> Term {
    Term::Splice(Box::new(term))
}

fn quote(term: Term) -> Term {
    Term::CodeOf(Box::new(term))
}

#[test]
fn splice_of_quotation_is_inlined() {
    let norm = normalizer(Vec::new());
    let item = runtime(Vec::new(), splice(quote(Term::IntOf(3))));
    let staged = stage_item(&norm, item);
    assert_eq!(staged.map(staged_body), Ok(Some(Term::IntOf(3))));
}

#[test]
fn splice_runs_compile_time_definitions() {
    let add = Term::apply(
        Term::Def(Name::new("int/add")),
        vec![Term::IntOf(1), Term::IntOf(2)],
    );
    let mk = def(
        "mk",
        Modifiers::CONST,
        Vec::new(),
        Term::Code(Box::new(Term::Int)),
        quote(add),
    );
    let norm = normalizer(vec![mk]);
    let item = runtime(Vec::new(), splice(Term::Def(Name::new("mk"))));
    let staged = stage_item(&norm, item);
    assert_eq!(staged.map(staged_body), Ok(Some(Term::IntOf(3))));
}

#[test]
fn splice_under_binders_keeps_levels() {
    let norm = normalizer(Vec::new());
    let x = Term::var("x", Lvl::new(0));
    let y = Term::var("y", Lvl::new(1));
    let body = Term::Let {
        name: Name::new("y"),
        ty: Box::new(Term::Int),
        init: Box::new(x),
        body: Box::new(splice(quote(y.clone()))),
    };
    let params = vec![Param::new(Name::new("x"), Term::Int)];
    let Ok(Item::Def(staged)) = stage_item(&norm, runtime(params, body)) else {
        panic!("staging failed");
    };
    let Some(Term::Let { body, .. }) = staged.body else {
        panic!("expected a let");
    };
    assert_eq!(*body, y);
}

#[test]
fn splice_on_a_variable_is_stuck() {
    let norm = normalizer(Vec::new());
    let params = vec![Param::new(
        Name::new("c"),
        Term::Code(Box::new(Term::Int)),
    )];
    let item = runtime(params, splice(Term::var("c", Lvl::new(0))));
    assert_eq!(
        stage_item(&norm, item),
        Err(StageError::StuckSplice {
            term: Term::var("c", Lvl::new(0)),
        })
    );
}

#[test]
fn compile_time_bodies_are_erased() {
    let norm = normalizer(Vec::new());
    let item = Item::Def(def("k", Modifiers::CONST, Vec::new(), Term::Int, Term::IntOf(1)));
    assert_eq!(stage_item(&norm, item).map(staged_body), Ok(None));
}

#[test]
fn hole_in_runtime_code_is_residual() {
    let norm = normalizer(Vec::new());
    let body = Term::apply(Term::Def(Name::new("int/add")), vec![Term::Hole, Term::IntOf(1)]);
    assert_eq!(
        stage_item(&norm, runtime(Vec::new(), body)),
        Err(StageError::Residual {
            name: Name::new("f"),
            term: Term::Hole,
        })
    );
}

#[test]
fn type_aliases_unfold_in_signatures() {
    let alias = def("my_int", Modifiers::CONST, Vec::new(), Term::Type, Term::Int);
    let norm = normalizer(vec![alias]);
    let my_int = Term::Def(Name::new("my_int"));
    let item = Item::Def(def(
        "f",
        Modifiers::empty(),
        vec![Param::new(Name::new("x"), my_int.clone())],
        my_int,
        Term::var("x", Lvl::new(0)),
    ));
    let Ok(Item::Def(staged)) = stage_item(&norm, item) else {
        panic!("staging failed");
    };
    assert_eq!(staged.params[0].ty, Term::Int);
    assert_eq!(staged.result, Term::Int);
}

#[test]
fn tests_are_staged_like_runtime_code() {
    let norm = normalizer(Vec::new());
    let item = Item::Test(Test {
        id: Id::DUMMY,
        name: Name::new("t"),
        body: splice(quote(Term::BoolOf(true))),
    });
    assert_eq!(stage_item(&norm, item).map(staged_body), Ok(Some(Term::BoolOf(true))));
}
