#![allow(clippy::unwrap_used, clippy::expect_used)]

use kiln_pack::DispatchStrategy;
use pretty_assertions::assert_eq;

use super::CompileOptions;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

#[test]
fn defaults_match_the_packer() {
    let options = CompileOptions::default();
    assert_eq!(options.namespace, "kiln");
    assert_eq!(options.storage, "kiln:runtime");
    assert_eq!(options.dispatch, DispatchStrategy::Linear);
    assert!(!options.trace);
}

#[test]
fn arguments_override_defaults() {
    let options = CompileOptions::parse_args(&args(&[
        "--namespace=demo",
        "--dispatch=binary",
        "--budget=500",
        "--trace",
    ]));
    assert_eq!(
        options,
        CompileOptions {
            namespace: "demo".to_owned(),
            storage: "kiln:runtime".to_owned(),
            dispatch: DispatchStrategy::Binary,
            budget: 500,
            trace: true,
        }
    );
}

#[test]
fn bad_values_keep_the_default() {
    let options = CompileOptions::parse_args(&args(&["--dispatch=hashed", "--budget=lots", "-x"]));
    assert_eq!(options, CompileOptions::default());
}

#[test]
fn environment_variables_are_read_by_name() {
    let options = CompileOptions::from_vars(|key| match key {
        "KILN_STORAGE" => Some("demo:stacks".to_owned()),
        "KILN_DISPATCH" => Some("binary".to_owned()),
        "KILN_TRACE" => Some("0".to_owned()),
        _ => None,
    });
    assert_eq!(options.storage, "demo:stacks");
    assert_eq!(options.dispatch, DispatchStrategy::Binary);
    assert!(!options.trace);
}

#[test]
fn pack_options_carry_the_target_fields() {
    let options = CompileOptions::parse_args(&args(&["--namespace=demo", "--storage=demo:s"]));
    let pack = options.pack_options();
    assert_eq!(pack.namespace, "demo");
    assert_eq!(pack.storage, "demo:s");
    assert_eq!(pack.dispatch, DispatchStrategy::Linear);
}
