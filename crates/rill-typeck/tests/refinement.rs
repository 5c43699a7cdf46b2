//! Refinement-solver integration: obligations generated by the checker
//! and discharged (or not) against the fact environment.

use rill_parser::parse_source;
use rill_typeck::refine::SolverResult;
use rill_typeck::{typecheck, TypeckResult};

fn check(source: &str) -> TypeckResult {
    let (program, diags) = parse_source("test.rill", source);
    assert!(
        diags.iter().all(|d| !d.is_error()),
        "parse errors: {diags:#?}"
    );
    typecheck(&program)
}

fn assert_all_discharged(result: &TypeckResult) {
    let errors: Vec<_> = result.diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(errors.is_empty(), "unexpected errors: {errors:#?}");
    let open: Vec<_> = result.open_obligations().collect();
    assert!(open.is_empty(), "obligations left open: {open:#?}");
}

#[test]
fn arithmetic_chaining_discharges() {
    // Spec scenario S2.
    let result = check(
        r#"
        fn requires_positive(x: Int{x > 0}) -> Int { x }
        fn example(n: Int{n >= 0}) -> Int {
            let m = n + 1
            requires_positive(m)
        }
        "#,
    );
    assert_all_discharged(&result);
}

#[test]
fn array_bounds_discharge_from_length_fact() {
    // Spec scenario S6.
    let result = check("fn first(arr: [Int]{len(arr) > 0}) -> Int { arr[0] }");
    assert_all_discharged(&result);
}

#[test]
fn unconstrained_index_stays_open() {
    let result = check("fn get(arr: [Int], i: Int) -> Int { arr[i] }");
    let open: Vec<_> = result.open_obligations().collect();
    assert_eq!(open.len(), 1, "the bounds obligation must remain open");
    // Open obligations are not errors.
    assert!(result.success());
}

#[test]
fn branch_condition_becomes_a_fact() {
    let result = check(
        r#"
        fn requires_positive(x: Int{x > 0}) -> Int { x }
        fn example(n: Int) -> Int {
            if n > 0 { requires_positive(n) } else { 0 }
        }
        "#,
    );
    assert_all_discharged(&result);
}

#[test]
fn negated_condition_reaches_the_else_branch() {
    let result = check(
        r#"
        fn requires_nonneg(x: Int{x >= 0}) -> Int { x }
        fn example(n: Int) -> Int {
            if n < 0 { 0 } else { requires_nonneg(n) }
        }
        "#,
    );
    assert_all_discharged(&result);
}

#[test]
fn contradicting_argument_is_refuted() {
    let result = check(
        r#"
        fn requires_positive(x: Int{x > 0}) -> Int { x }
        fn example(n: Int{n < 0}) -> Int { requires_positive(n) }
        "#,
    );
    assert!(
        result.diagnostics.iter().any(|d| d.code == "E5001"),
        "a refuted obligation must produce E5001: {:#?}",
        result.diagnostics
    );
    assert!(result
        .obligations
        .iter()
        .any(|o| o.result == SolverResult::Refuted));
}

#[test]
fn refined_return_type_is_checked() {
    let result = check(
        r#"
        fn positive(n: Int{n > 0}) -> (Int{r | r > 0}) { n }
        "#,
    );
    assert_all_discharged(&result);
}

#[test]
fn refined_return_violation_is_refuted() {
    let result = check("fn bad() -> (Int{r | r > 0}) { 0 }");
    assert!(result.diagnostics.iter().any(|d| d.code == "E5001"));
}

#[test]
fn explicit_return_statements_carry_obligations() {
    let result = check(
        r#"
        fn sign(n: Int) -> (Int{r | r >= 0}) {
            if n >= 0 { return n }
            return 0
        }
        "#,
    );
    // The first return is discharged from the branch fact, the second
    // evaluates directly.
    assert_all_discharged(&result);
}

#[test]
fn facts_do_not_leak_past_their_branch() {
    // After the `if` statement the branch fact is popped; the trailing
    // return's obligation cannot use it and stays open.
    let result = check(
        r#"
        fn clamp_pos(n: Int) -> (Int{r | r >= 0}) {
            if n < 0 { return 0 }
            return n
        }
        "#,
    );
    assert!(result.success());
    assert_eq!(result.open_obligations().count(), 1);
}

#[test]
fn nat_is_nonnegative_int() {
    let result = check(
        r#"
        fn requires_nonneg(x: Int{x >= 0}) -> Int { x }
        fn example(n: Nat) -> Int { requires_nonneg(n) }
        "#,
    );
    assert_all_discharged(&result);
}

#[test]
fn literal_arguments_evaluate_directly() {
    let result = check(
        r#"
        fn requires_positive(x: Int{x > 0}) -> Int { x }
        fn ok() -> Int { requires_positive(3) }
        "#,
    );
    assert_all_discharged(&result);

    let result = check(
        r#"
        fn requires_positive(x: Int{x > 0}) -> Int { x }
        fn bad() -> Int { requires_positive(0) }
        "#,
    );
    assert!(result.diagnostics.iter().any(|d| d.code == "E5001"));
}

#[test]
fn chained_lets_substitute_transitively() {
    let result = check(
        r#"
        fn requires_big(x: Int{x >= 10}) -> Int { x }
        fn example(a: Int{a >= 2}) -> Int {
            let b = a + 3
            let c = b * 2
            requires_big(c)
        }
        "#,
    );
    assert_all_discharged(&result);
}

#[test]
fn obligations_record_their_origin() {
    use rill_typeck::refine::ObligationOrigin;
    let result = check(
        r#"
        fn requires_positive(x: Int{x > 0}) -> Int { x }
        fn example() -> Int { requires_positive(5) }
        "#,
    );
    assert!(result.obligations.iter().any(|o| matches!(
        &o.origin,
        ObligationOrigin::CallArgument { callee, param }
            if callee == "requires_positive" && param == "x"
    )));
}

#[test]
fn complex_witness_stays_open_not_refuted() {
    // The returned expression is not in the term fragment; the
    // obligation cannot be evaluated and must stay open.
    let result = check(
        r#"
        fn mystery(n: Int) -> (Int{r | r > 0}) {
            if n > 0 { n } else { 1 }
        }
        "#,
    );
    assert!(result.success(), "open obligations are not errors");
    assert!(result.open_obligations().count() >= 1);
}
