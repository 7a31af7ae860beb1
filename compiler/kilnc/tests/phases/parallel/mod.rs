//! Several independent units compiled in one call.

use std::collections::BTreeSet;

use kiln_ir::surface::{SItem, SurfaceBuilder};
use kiln_ir::{IdGen, Item, Name};
use kilnc::PipelineError;
use pretty_assertions::assert_eq;

use crate::common::{int_stack, run, session};

/// `t<i> = (fun (x: Int) => x + i)(i)` for each `i`.
fn closure_tests(b: &SurfaceBuilder<'_>, count: i32) -> Vec<SItem> {
    (0..count)
        .map(|i| {
            let lam = b.lam(
                vec![("x", b.ty_int())],
                b.call("int/add", vec![b.var("x"), b.int(i)]),
            );
            b.test(&format!("t{i}"), b.apply(lam, vec![b.int(i)]))
        })
        .collect()
}

#[test]
fn results_keep_input_order_and_tags_stay_unique() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let items = closure_tests(&b, 8);

    let session = session();
    let compilation = session.compile_units(&items);
    assert_eq!(compilation.errors().count(), 0);
    assert_eq!(compilation.closures, 8);

    let names: Vec<Name> = compilation.units.iter().map(|unit| unit.item.name()).collect();
    let expected: Vec<Name> = (0..8).map(|i| Name::new(&format!("t{i}"))).collect();
    assert_eq!(names, expected);

    let tags: BTreeSet<i32> = compilation
        .units
        .iter()
        .filter_map(|unit| unit.output.as_ref().ok())
        .flat_map(|defun| defun.table.tags())
        .collect();
    assert_eq!(tags, (0..8).collect());

    let program = session.link(&compilation).unwrap();
    for i in 0..8 {
        let machine = run(&session, &program, &format!("t{i}"));
        assert_eq!(int_stack(&machine), vec![2 * i]);
    }
}

#[test]
fn one_failing_unit_does_not_stop_the_others() {
    let ids = IdGen::new();
    let b = SurfaceBuilder::new(&ids);
    let items = vec![
        b.test("good", b.call("int/max", vec![b.int(4), b.int(9)])),
        b.test("bad", b.var("nowhere")),
    ];

    let session = session();
    let compilation = session.compile_units(&items);
    assert!(compilation.units[0].output.is_ok());
    assert_eq!(compilation.errors().count(), 1);
    assert!(matches!(
        session.link(&compilation),
        Err(PipelineError::Diagnostics(_))
    ));
    assert!(matches!(compilation.units[1].item, Item::Test(_)));
}
