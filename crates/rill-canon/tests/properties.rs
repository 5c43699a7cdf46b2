//! Property-based canonicalization invariants: idempotence and
//! determinism over generated programs with sugar in random positions.

use proptest::prelude::*;

use rill_canon::{canonicalize, CanonOptions};
use rill_json::{serialize_program, SerializeOptions};
use rill_parser::ast::Program;
use rill_parser::parse_source;

fn shape(program: &Program) -> String {
    serialize_program(
        program,
        &SerializeOptions { include_spans: false, pretty: false },
    )
}

/// Expressions that exercise the desugar and normalize phases: pipes,
/// ranges (via for loops), bare ifs, and plain arithmetic.
fn body_strategy() -> impl Strategy<Value = String> {
    let atom = prop_oneof![
        Just("x".to_string()),
        (0u32..100).prop_map(|n| n.to_string()),
    ];
    atom.prop_recursive(3, 12, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| format!("({l} + {r})")),
            inner.clone().prop_map(|e| format!("({e} |> helper)")),
            (inner.clone(), inner.clone())
                .prop_map(|(l, r)| format!("(if {l} < {r} {{ {l} }} else {{ {r} }})")),
        ]
    })
}

fn program_strategy() -> impl Strategy<Value = String> {
    (body_strategy(), any::<bool>()).prop_map(|(body, with_loop)| {
        let extra = if with_loop {
            "for i in 0..3 { }\n        if x > 0 { }"
        } else {
            ""
        };
        format!(
            "fn helper(n: Int) -> Int {{ n }}\n\
             fn gen(x: Int) -> Int {{\n        {extra}\n        {body}\n}}"
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// canonicalize(canonicalize(P)) == canonicalize(P) modulo ids/spans.
    #[test]
    fn canonicalize_is_idempotent(source in program_strategy()) {
        let (program, diags) = parse_source("gen.rill", &source);
        prop_assert!(diags.iter().all(|d| !d.is_error()), "parse errors for {source}");

        let once = canonicalize(&program, &CanonOptions::all());
        let twice = canonicalize(&once.program, &CanonOptions::all());
        prop_assert_eq!(shape(&once.program), shape(&twice.program));
    }

    /// Two pipelines over byte-identical input produce byte-identical
    /// canonical JSON.
    #[test]
    fn canonicalize_is_deterministic(source in program_strategy()) {
        let (a, _) = parse_source("gen.rill", &source);
        let (b, _) = parse_source("gen.rill", &source);
        let ca = canonicalize(&a, &CanonOptions::all());
        let cb = canonicalize(&b, &CanonOptions::all());
        prop_assert_eq!(
            serialize_program(&ca.program, &SerializeOptions::default()),
            serialize_program(&cb.program, &SerializeOptions::default())
        );
    }
}
