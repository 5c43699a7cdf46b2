//! Exhaustiveness diagnostics through the full pipeline.

use rill_common::diagnostics::Structured;
use rill_parser::parse_source;
use rill_typeck::{typecheck, TypeckResult};

fn check(source: &str) -> TypeckResult {
    let (program, diags) = parse_source("test.rill", source);
    assert!(
        diags.iter().all(|d| !d.is_error()),
        "parse errors: {diags:#?}"
    );
    typecheck(&program)
}

#[test]
fn non_exhaustive_direction_match_lists_missing_variants() {
    // Spec scenario S3.
    let result = check(
        r#"
        sum Direction { North, South, East, West }
        fn is_north(d: Direction) -> Bool {
            match d { North -> true }
        }
        "#,
    );
    let diag = result
        .diagnostics
        .iter()
        .find(|d| d.code == "E3001")
        .expect("expected a NonExhaustiveMatch diagnostic");
    match &diag.structured {
        Structured::NonExhaustiveMatch { missing_patterns } => {
            let described: Vec<_> =
                missing_patterns.iter().map(|m| m.description.as_str()).collect();
            assert_eq!(described, vec!["South", "East", "West"]);
        }
        other => panic!("wrong structured payload: {other:?}"),
    }
}

#[test]
fn exhaustive_match_is_clean() {
    let result = check(
        r#"
        sum Direction { North, South, East, West }
        fn code(d: Direction) -> Int {
            match d { North -> 0, South -> 1, East -> 2, West -> 3 }
        }
        "#,
    );
    assert!(result.diagnostics.iter().all(|d| d.code != "E3001"));
}

#[test]
fn missing_payload_variant_uses_placeholder() {
    let result = check(
        r#"
        fn f(o: Option<Int>) -> Int {
            match o { None -> 0 }
        }
        "#,
    );
    let diag = result
        .diagnostics
        .iter()
        .find(|d| d.code == "E3001")
        .expect("expected E3001");
    match &diag.structured {
        Structured::NonExhaustiveMatch { missing_patterns } => {
            assert_eq!(missing_patterns[0].description, "Some(_)");
        }
        other => panic!("wrong structured payload: {other:?}"),
    }
}

#[test]
fn guarded_wildcard_does_not_cover() {
    let result = check(
        r#"
        sum D { A, B }
        fn f(d: D, flag: Bool) -> Int {
            match d { _ if flag -> 1, A -> 2 }
        }
        "#,
    );
    assert!(result.diagnostics.iter().any(|d| d.code == "E3001"));
}

#[test]
fn bool_scrutinee_uses_literal_classes() {
    let result = check("fn f(b: Bool) -> Int { match b { true -> 1 } }");
    assert!(result.diagnostics.iter().any(|d| d.code == "E3001"));

    let result = check("fn f(b: Bool) -> Int { match b { true -> 1, false -> 0 } }");
    assert!(result.diagnostics.iter().all(|d| d.code != "E3001"));
}

#[test]
fn open_scrutinee_requires_wildcard() {
    let result = check("fn f(n: Int) -> Int { match n { 1 -> 1, 2 -> 2 } }");
    assert!(result.diagnostics.iter().any(|d| d.code == "E3001"));
}

#[test]
fn unreachable_arm_is_a_warning_not_an_error() {
    let result = check(
        r#"
        sum D { A, B }
        fn f(d: D) -> Int {
            match d { _ -> 0, A -> 1 }
        }
        "#,
    );
    let warning = result
        .diagnostics
        .iter()
        .find(|d| d.code == "E3002")
        .expect("expected an unreachable-arm warning");
    assert!(!warning.is_error());
    assert!(result.success(), "warnings alone do not fail the compile");
}

#[test]
fn empty_match_is_tolerated_and_reported() {
    let result = check(
        r#"
        sum D { A, B }
        fn f(d: D) -> Int { match d { } }
        "#,
    );
    assert!(result.diagnostics.iter().any(|d| d.code == "E3001"));
}
