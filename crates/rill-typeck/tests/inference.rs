//! End-to-end inference tests: parse then typecheck.

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

fn assert_clean(result: &TypeckResult) {
    let errors: Vec<_> = result.diagnostics.iter().filter(|d| d.is_error()).collect();
    assert!(errors.is_empty(), "unexpected errors: {errors:#?}");
}

#[test]
fn simple_function_checks() {
    let result = check("fn add(a: Int, b: Int) -> Int { a + b }");
    assert_clean(&result);
    let sig = &result.function_types["add"];
    assert_eq!(sig.ty().to_string(), "(Int, Int) -> Int");
}

#[test]
fn type_mismatch_is_e2001() {
    let result = check(r#"fn f() -> Int { "text" }"#);
    assert!(result.diagnostics.iter().any(|d| d.code == "E2001"));
}

#[test]
fn unbound_name_is_e1004() {
    let result = check("fn f() -> Int { missing + 1 }");
    assert!(result.diagnostics.iter().any(|d| d.code == "E1004"));
}

#[test]
fn unresolved_type_is_e1001_and_checking_continues() {
    let result = check("fn f(x: Bogus) -> Int { 1 } fn g() -> Int { f(2) }");
    assert!(result.diagnostics.iter().any(|d| d.code == "E1001"));
    // `g` still checks against the placeholder signature.
    assert!(result.function_types.contains_key("g"));
}

#[test]
fn wrong_arity_is_e1003() {
    let result = check("fn f(a: Int) -> Int { a } fn g() -> Int { f(1, 2) }");
    assert!(result.diagnostics.iter().any(|d| d.code == "E1003"));
}

#[test]
fn type_param_arity_is_e1002() {
    let result = check("fn f(x: Option<Int, Str>) -> Int { 1 }");
    assert!(result.diagnostics.iter().any(|d| d.code == "E1002"));
}

#[test]
fn lambda_inference() {
    let result = check("fn apply(f: (Int) -> Int, x: Int) -> Int { f(x) } fn g() -> Int { apply(fn(y) -> y + 1, 3) }");
    assert_clean(&result);
}

#[test]
fn generic_function_instantiates_per_call() {
    let result = check(
        r#"
        fn id<T>(x: T) -> T { x }
        fn g() -> Int { id(1) }
        fn h() -> Str { id("s") }
        "#,
    );
    assert_clean(&result);
}

#[test]
fn sum_constructors_and_generic_match() {
    let result = check(
        r#"
        sum Shape<T> { Circle(T), Point }
        fn radius(s: Shape<Int>) -> Int {
            match s {
                Circle(r) -> r,
                Point -> 0,
            }
        }
        "#,
    );
    assert_clean(&result);
}

#[test]
fn variant_payload_type_flows_through_generic_instantiation() {
    // Binding the payload of Circle(Str) to an Int context must fail.
    let result = check(
        r#"
        sum Shape<T> { Circle(T), Point }
        fn bad(s: Shape<Str>) -> Int {
            match s {
                Circle(r) -> r + 1,
                Point -> 0,
            }
        }
        "#,
    );
    assert!(result.diagnostics.iter().any(|d| d.code == "E2001"));
}

#[test]
fn option_is_builtin() {
    let result = check(
        r#"
        fn first_or(xs: [Int], default: Int) -> Int {
            match head(xs) {
                Some(x) -> x,
                None -> default,
            }
        }
        fn head(xs: [Int]) -> Option<Int> {
            if len(xs) > 0 { Some(xs[0]) } else { None }
        }
        "#,
    );
    assert_clean(&result);
}

#[test]
fn record_declaration_and_field_access() {
    let result = check(
        r#"
        rec Point { x: Int, y: Int }
        fn norm1(p: Point) -> Int { p.x + p.y }
        "#,
    );
    assert_clean(&result);
}

#[test]
fn unknown_field_is_e1005() {
    let result = check(
        r#"
        rec Point { x: Int, y: Int }
        fn f(p: Point) -> Int { p.z }
        "#,
    );
    assert!(result.diagnostics.iter().any(|d| d.code == "E1005"));
}

#[test]
fn anonymous_record_literal_types() {
    let result = check("fn origin() -> {x: Int, y: Int} { {x: 0, y: 0} }");
    assert_clean(&result);
}

#[test]
fn tuple_pattern_in_let() {
    let result = check("fn swap(p: (Int, Str)) -> (Str, Int) { let (a, b) = p; (b, a) }");
    assert_clean(&result);
}

#[test]
fn propagate_unwraps_result() {
    let result = check(
        r#"
        fn parse(s: Str) -> Err + Result<Int, Str> { Ok(1) }
        fn run(s: Str) -> Err + Int { parse(s)? }
        "#,
    );
    assert_clean(&result);
}

#[test]
fn type_alias_expands() {
    let result = check(
        r#"
        type Ints = [Int]
        fn total(xs: Ints) -> Int { len(xs) }
        "#,
    );
    assert_clean(&result);
}

#[test]
fn for_loop_over_range_and_array() {
    let result = check(
        r#"
        fn sum(xs: [Int]) -> Mut + Int {
            let mut total = 0
            for x in xs { total = total + x }
            for i in 0..3 { total = total + i }
            total
        }
        "#,
    );
    assert_clean(&result);
}

#[test]
fn type_table_records_node_types() {
    let (program, _) = rill_parser::parse_source("t.rill", "fn f() -> Int { 1 + 2 }");
    let result = typecheck(&program);
    assert!(
        !result.type_table.is_empty(),
        "type table must carry entries for checked nodes"
    );
    // Every recorded type is fully printable (resolution happened).
    for ty in result.type_table.values() {
        let _ = ty.to_string();
    }
}

#[test]
fn duplicate_variant_is_e3003() {
    let result = check("sum D { North, North }");
    assert!(result.diagnostics.iter().any(|d| d.code == "E3003"));
}

#[test]
fn external_functions_have_signatures() {
    let result = check(
        r#"
        external fn now() -> IO + Int = "Date.now"
        fn tick() -> IO + Int { now() }
        "#,
    );
    assert_clean(&result);
    assert!(result.function_types["now"].external);
}
