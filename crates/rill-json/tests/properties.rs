//! Property-based tests for the universal pipeline invariants:
//! serialize/deserialize round-trips, span sanity, and determinism over
//! generated source programs.

use proptest::prelude::*;

use rill_json::{deserialize_program_str, serialize_program, SerializeOptions};
use rill_parser::ast::Program;
use rill_parser::parse_source;

fn shape(program: &Program) -> String {
    serialize_program(
        program,
        &SerializeOptions { include_spans: false, pretty: false },
    )
}

/// Generated arithmetic/boolean expressions over two integer parameters.
fn expr_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just("a".to_string()),
        Just("b".to_string()),
        (0u32..1000).prop_map(|n| n.to_string()),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({l} + {r})")),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({l} - {r})")),
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({l} * {r})")),
            (inner.clone(), inner.clone())
                .prop_map(|(l, r)| format!("(if {l} < {r} {{ {l} }} else {{ {r} }})")),
            inner.prop_map(|e| format!("-({e})")),
        ]
    })
}

fn program_strategy() -> impl Strategy<Value = String> {
    expr_strategy().prop_map(|body| format!("fn gen(a: Int, b: Int) -> Int {{ {body} }}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// deserialize(serialize(parse(S))) is structurally identical to
    /// parse(S), modulo node ids.
    #[test]
    fn round_trip_is_lossless(source in program_strategy()) {
        let (program, diags) = parse_source("gen.rill", &source);
        prop_assert!(diags.iter().all(|d| !d.is_error()), "parse errors for {source}");

        let serialized = serialize_program(&program, &SerializeOptions::default());
        let restored = deserialize_program_str(&serialized);
        prop_assert!(restored.ok, "round trip errors: {:?}", restored.errors);
        prop_assert_eq!(shape(&program), shape(&restored.program.unwrap()));
    }

    /// Two parses of byte-identical source serialize byte-identically
    /// (fresh id state per parse).
    #[test]
    fn parse_is_deterministic(source in program_strategy()) {
        let (a, _) = parse_source("gen.rill", &source);
        let (b, _) = parse_source("gen.rill", &source);
        prop_assert_eq!(
            serialize_program(&a, &SerializeOptions::default()),
            serialize_program(&b, &SerializeOptions::default())
        );
    }

    /// Every span is well-formed and contained within the program span.
    #[test]
    fn spans_are_ordered_and_contained(source in program_strategy()) {
        let (program, _) = parse_source("gen.rill", &source);
        for decl in &program.decls {
            prop_assert!(decl.span.start.offset <= decl.span.end.offset);
            prop_assert!(
                program.span.contains(&decl.span),
                "decl span escapes program span"
            );
        }
    }
}
