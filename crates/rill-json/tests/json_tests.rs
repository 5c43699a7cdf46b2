//! Integration tests for the AST <-> JSON bridge: lossless round-trips,
//! hybrid source fragments, and error aggregation with JSON paths.

use rill_json::{
    deserialize_program, deserialize_program_str, program_to_json, serialize_program,
    SerializeOptions,
};
use rill_parser::parse_source;
use serde_json::json;

fn parse_ok(source: &str) -> rill_parser::ast::Program {
    let (program, diags) = parse_source("test.rill", source);
    assert!(
        diags.iter().all(|d| !d.is_error()),
        "parse errors: {diags:#?}"
    );
    program
}

/// Serialize without spans: the canonical shape string used to compare
/// trees modulo node ids and spans.
fn shape(program: &rill_parser::ast::Program) -> String {
    serialize_program(
        program,
        &SerializeOptions { include_spans: false, pretty: false },
    )
}

const SAMPLE: &str = r#"
    mod geo
    use std.list.{map} as l
    type Ints = [Int]
    rec Point { x: Int, y: Int }
    sum Direction { North, South, East, West }
    external fn now() -> IO + Int = "Date.now"
    fn dist(p: Point, q: Point) -> Int {
        let dx = p.x - q.x
        let dy = p.y - q.y
        dx * dx + dy * dy
    }
    fn classify(d: Direction) -> Int {
        match d { North -> 0, South -> 1, _ -> 2 }
    }
    fn range_sum(n: Int) -> Mut + Int {
        let mut total = 0
        for i in 0..n { total = total + i }
        total
    }
    fn first(arr: [Int]{len(arr) > 0}) -> Int { arr[0] }
"#;

#[test]
fn round_trip_preserves_structure() {
    let program = parse_ok(SAMPLE);
    let serialized = serialize_program(&program, &SerializeOptions::default());
    let result = deserialize_program_str(&serialized);
    assert!(result.ok, "round trip failed: {:#?}", result.errors);
    let restored = result.program.unwrap();
    assert_eq!(shape(&program), shape(&restored));
}

#[test]
fn round_trip_preserves_spans() {
    let program = parse_ok("fn f(x: Int) -> Int { x + 1 }");
    let serialized = serialize_program(&program, &SerializeOptions::default());
    let restored = deserialize_program_str(&serialized).program.unwrap();
    // With spans included, the round trip is exact span-for-span.
    assert_eq!(program.decls[0].span, restored.decls[0].span);
    assert_eq!(
        serialize_program(&restored, &SerializeOptions::default()),
        serialized
    );
}

#[test]
fn integers_serialize_as_decimal_strings() {
    let program = parse_ok("fn f() -> Int { 79228162514264337593543950335 }");
    let value = program_to_json(&program, &SerializeOptions::default());
    let body = &value["decls"][0]["body"]["value"];
    assert_eq!(body["kind"], "int");
    assert_eq!(body["value"], "79228162514264337593543950335");

    let restored = deserialize_program(&value);
    assert!(restored.ok);
    assert_eq!(shape(&program), shape(&restored.program.unwrap()));
}

#[test]
fn spans_can_be_omitted() {
    let program = parse_ok("fn f() -> Int { 1 }");
    let value = program_to_json(
        &program,
        &SerializeOptions { include_spans: false, pretty: false },
    );
    assert!(value.get("span").is_none());
    assert!(value["decls"][0].get("span").is_none());
    // Spanless JSON still deserializes (synthetic spans are filled in).
    assert!(deserialize_program(&value).ok);
}

#[test]
fn pretty_output_is_multiline() {
    let program = parse_ok("fn f() -> Int { 1 }");
    let pretty = serialize_program(
        &program,
        &SerializeOptions { include_spans: false, pretty: true },
    );
    assert!(pretty.contains('\n'));
}

#[test]
fn serialization_is_deterministic() {
    let a = parse_ok(SAMPLE);
    let b = parse_ok(SAMPLE);
    assert_eq!(
        serialize_program(&a, &SerializeOptions::default()),
        serialize_program(&b, &SerializeOptions::default())
    );
}

// ── Hybrid fragments ───────────────────────────────────────────────────

#[test]
fn hybrid_function_body_fragment() {
    // Spec scenario S5: a structural program whose function body is a
    // literal source fragment.
    let value = json!({
        "kind": "program",
        "decls": [{
            "kind": "function",
            "name": "answer",
            "ret": {"kind": "named", "name": "Int"},
            "body": {"source": "{ 42 }"}
        }]
    });
    let result = deserialize_program(&value);
    assert!(result.ok, "errors: {:#?}", result.errors);
    let program = result.program.unwrap();

    // The checker accepts it like the equivalent source form.
    let typeck = rill_typeck::typecheck(&program);
    assert!(typeck.success(), "diagnostics: {:#?}", typeck.diagnostics);

    let from_source = parse_ok("fn answer() -> Int { 42 }");
    assert_eq!(shape(&program), shape(&from_source));
}

#[test]
fn hybrid_fragments_at_many_positions() {
    let value = json!({
        "kind": "program",
        "decls": [
            {"source": "sum Direction { North, South, East, West }"},
            {
                "kind": "function",
                "name": "go",
                "params": [
                    {"name": "d", "ty": {"source": "Direction"}}
                ],
                "ret": {"kind": "named", "name": "Int"},
                "body": {
                    "kind": "block",
                    "stmts": [
                        {"source": "let base = 10"}
                    ],
                    "value": {
                        "kind": "match",
                        "scrutinee": {"source": "d"},
                        "arms": [
                            {"pattern": {"source": "North"}, "body": {"source": "base"}},
                            {"pattern": {"kind": "wildcard"}, "body": {"source": "0"}}
                        ]
                    }
                }
            }
        ]
    });
    let result = deserialize_program(&value);
    assert!(result.ok, "errors: {:#?}", result.errors);
    let typeck = rill_typeck::typecheck(&result.program.unwrap());
    assert!(typeck.success(), "diagnostics: {:#?}", typeck.diagnostics);
}

#[test]
fn node_ids_are_unique_across_fragments() {
    let value = json!({
        "kind": "program",
        "decls": [
            {"source": "fn a() -> Int { 1 }"},
            {"source": "fn b() -> Int { 2 }"}
        ]
    });
    let program = deserialize_program(&value).program.unwrap();
    let mut ids = std::collections::HashSet::new();
    for decl in &program.decls {
        assert!(ids.insert(decl.id), "duplicate node id across fragments");
    }
}

// ── Errors ─────────────────────────────────────────────────────────────

#[test]
fn invalid_json_reports_at_root() {
    let result = deserialize_program_str("{not json");
    assert!(!result.ok);
    assert_eq!(result.errors[0].path, "$");
}

#[test]
fn bad_fragment_reports_json_path() {
    let value = json!({
        "kind": "program",
        "decls": [{
            "kind": "function",
            "name": "broken",
            "body": {"source": "{ let = }"}
        }]
    });
    let result = deserialize_program(&value);
    assert!(!result.ok);
    assert!(result.program.is_none());
    assert!(
        result.errors.iter().any(|e| e.path == "$.decls[0].body"),
        "errors should carry the fragment's JSON path: {:#?}",
        result.errors
    );
}

#[test]
fn unknown_kind_reports_path_and_continues() {
    let value = json!({
        "kind": "program",
        "decls": [
            {"kind": "flux_capacitor"},
            {"source": "fn ok() -> Int { 1 }"}
        ]
    });
    let result = deserialize_program(&value);
    assert!(!result.ok);
    assert!(result.errors.iter().any(|e| e.path == "$.decls[0]"));
    // Aggregation, not abort: the error list is complete and the overall
    // result is withheld only because errors exist.
    assert_eq!(result.errors.len(), 1);
}

#[test]
fn missing_required_field_is_an_error() {
    let value = json!({
        "kind": "program",
        "decls": [{"kind": "function", "name": "f"}]
    });
    let result = deserialize_program(&value);
    assert!(!result.ok);
    assert!(result
        .errors
        .iter()
        .any(|e| e.message.contains("body")));
}

#[test]
fn snapshot_sample_json() {
    let program = parse_ok("fn one() -> Int { 1 }");
    let serialized = serialize_program(
        &program,
        &SerializeOptions { include_spans: false, pretty: false },
    );
    insta::assert_snapshot!(
        serialized,
        @r#"{"decls":[{"body":{"kind":"block","value":{"kind":"int","value":"1"}},"kind":"function","name":"one","ret":{"kind":"named","name":"Int"}}],"kind":"program"}"#
    );
}
