//! Canonicalization integration tests: desugaring, normalization,
//! effect annotation, validator insertion, idempotence, determinism.

use rill_canon::{canonicalize, CanonOptions};
use rill_json::{serialize_program, SerializeOptions};
use rill_parser::ast::{DeclKind, ExprKind, Program, StmtKind};
use rill_parser::parse_source;

fn parse_ok(source: &str) -> Program {
    let (program, diags) = parse_source("test.rill", source);
    assert!(
        diags.iter().all(|d| !d.is_error()),
        "parse errors: {diags:#?}"
    );
    program
}

/// Canonical shape with ids and spans elided.
fn shape(program: &Program) -> String {
    serialize_program(
        program,
        &SerializeOptions { include_spans: false, pretty: false },
    )
}

fn body_of<'p>(program: &'p Program, name: &str) -> &'p rill_parser::ast::Expr {
    program
        .decls
        .iter()
        .find_map(|d| match &d.kind {
            DeclKind::Function(f) if f.name == name => Some(&f.body),
            _ => None,
        })
        .expect("function not found")
}

#[test]
fn pipe_desugars_to_call() {
    // Spec scenario S1.
    let program = parse_ok("fn f(x: Int) -> Int { x + 1 } fn test() -> Int { 5 |> f }");
    let result = canonicalize(&program, &CanonOptions::all());

    let ExprKind::Block(block) = &body_of(&result.program, "test").kind else {
        panic!("expected block body");
    };
    let value = block.value.as_ref().expect("block value");
    match &value.kind {
        ExprKind::Call { callee, args } => {
            assert!(matches!(&callee.kind, ExprKind::Ident(name) if name == "f"));
            assert_eq!(args.len(), 1);
        }
        other => panic!("pipe should desugar to a call, got {other:?}"),
    }

    // Second round: same structure.
    let again = canonicalize(&result.program, &CanonOptions::all());
    assert_eq!(shape(&result.program), shape(&again.program));
}

#[test]
fn pipe_chain_desugars_left_to_right() {
    let program = parse_ok(
        "fn f(x: Int) -> Int { x } fn g(x: Int) -> Int { x } fn t() -> Int { 1 |> f |> g }",
    );
    let result = canonicalize(&program, &CanonOptions::all());
    let ExprKind::Block(block) = &body_of(&result.program, "t").kind else {
        panic!("expected block");
    };
    let ExprKind::Call { callee, args } = &block.value.as_ref().unwrap().kind else {
        panic!("expected outer call");
    };
    assert!(matches!(&callee.kind, ExprKind::Ident(n) if n == "g"));
    let ExprKind::Call { callee: inner, .. } = &args[0].kind else {
        panic!("expected inner call");
    };
    assert!(matches!(&inner.kind, ExprKind::Ident(n) if n == "f"));
}

#[test]
fn range_desugars_to_range_helper() {
    let program = parse_ok("fn t() -> Unit { for i in 0..=9 { } }");
    let result = canonicalize(&program, &CanonOptions::all());
    let ExprKind::Block(block) = &body_of(&result.program, "t").kind else {
        panic!("expected block");
    };
    let StmtKind::For { iter, .. } = &block.stmts[0].kind else {
        panic!("expected for");
    };
    match &iter.kind {
        ExprKind::Call { callee, args } => {
            assert!(matches!(&callee.kind, ExprKind::Ident(n) if n == "__range"));
            assert_eq!(args.len(), 3, "start, end, inclusive flag");
        }
        other => panic!("range should desugar to __range, got {other:?}"),
    }
}

#[test]
fn if_without_else_gains_unit_else() {
    let program = parse_ok("fn t(c: Bool) -> Unit { if c { } }");
    let result = canonicalize(&program, &CanonOptions::all());
    let ExprKind::Block(block) = &body_of(&result.program, "t").kind else {
        panic!("expected block");
    };
    // `if c { }` is the block's trailing value.
    let if_expr = block.value.as_ref().expect("if expression");
    let ExprKind::If { else_branch, then_branch, .. } = &if_expr.kind else {
        panic!("expected if");
    };
    let els = else_branch.as_ref().expect("synthetic else inserted");
    assert!(els.span.is_synthetic());
    // The empty then-block was unit-filled.
    let ExprKind::Block(then_block) = &then_branch.kind else {
        panic!("expected block");
    };
    assert!(then_block.value.is_some());
}

#[test]
fn bare_return_gains_unit_value() {
    let program = parse_ok("fn t() -> Unit { return }");
    let result = canonicalize(&program, &CanonOptions::all());
    let ExprKind::Block(block) = &body_of(&result.program, "t").kind else {
        panic!("expected block");
    };
    let StmtKind::Return(value) = &block.stmts[0].kind else {
        panic!("expected return");
    };
    assert!(value.is_some(), "bare return must carry an explicit unit");
}

#[test]
fn input_program_is_not_mutated() {
    let program = parse_ok("fn t() -> Int { 5 |> f } fn f(x: Int) -> Int { x }");
    let before = shape(&program);
    let _ = canonicalize(&program, &CanonOptions::all());
    assert_eq!(shape(&program), before);
}

#[test]
fn idempotence_over_a_mixed_program() {
    let program = parse_ok(
        r#"
        external fn now() -> IO + Int = "Date.now"
        fn f(x: Int) -> Int { x + 1 }
        fn t(c: Bool) -> IO + Int {
            if c { }
            let stamp = now()
            for i in 0..3 { }
            5 |> f
        }
        "#,
    );
    let once = canonicalize(&program, &CanonOptions::all());
    let twice = canonicalize(&once.program, &CanonOptions::all());
    assert_eq!(shape(&once.program), shape(&twice.program));
    // No validator is inserted twice.
    assert_eq!(once.validator_insertions.len(), 1);
    assert_eq!(twice.validator_insertions.len(), 0);
}

#[test]
fn determinism_byte_identical_output() {
    let source = r#"
        fn f(x: Int) -> Int { x + 1 }
        fn t() -> Int { 5 |> f }
    "#;
    let a = canonicalize(&parse_ok(source), &CanonOptions::all());
    let b = canonicalize(&parse_ok(source), &CanonOptions::all());
    assert_eq!(
        serialize_program(&a.program, &SerializeOptions::default()),
        serialize_program(&b.program, &SerializeOptions::default()),
        "two runs over identical input must serialize byte-identically"
    );
}

#[test]
fn phases_can_be_disabled() {
    let program = parse_ok("fn f(x: Int) -> Int { x } fn t() -> Int { 5 |> f }");
    let options = CanonOptions {
        desugar: false,
        normalize: false,
        annotate_effects: false,
        insert_validators: false,
        type_info: None,
        effect_info: None,
    };
    let result = canonicalize(&program, &options);
    // Structure untouched (pipe survives), only ids are fresh.
    assert_eq!(shape(&program), shape(&result.program));
    assert!(result.effect_annotations.is_empty());
    assert!(result.validator_insertions.is_empty());
}

// ── Effect annotation ──────────────────────────────────────────────────

#[test]
fn effect_annotations_union_children() {
    let source = r#"
        fn log(s: Str) -> IO + Unit { println(s) }
        fn t(s: Str) -> IO + Err + Unit {
            log(s)
            might_fail()?
        }
        fn might_fail() -> Err + Result<Int, Str> { Ok(1) }
    "#;
    let program = parse_ok(source);
    let typeck = rill_typeck::typecheck(&program);
    let result = canonicalize(&program, &CanonOptions::all().with_typeck(&typeck));

    let body = body_of(&result.program, "t");
    let annotation = result.effect_annotations[&body.id];
    assert!(annotation.has_io, "IO flows up from the call to log");
    assert!(annotation.has_err, "Err flows up from `?`");
    assert!(!annotation.has_async);
}

#[test]
fn assignment_annotates_mut() {
    let program = parse_ok("fn t() -> Int { let mut n = 0\n n = 1\n n }");
    let typeck = rill_typeck::typecheck(&program);
    let result = canonicalize(&program, &CanonOptions::all().with_typeck(&typeck));
    let body = body_of(&result.program, "t");
    assert!(result.effect_annotations[&body.id].has_mut);
}

#[test]
fn missing_effect_info_is_tolerated() {
    let program = parse_ok("fn t(s: Str) -> IO + Unit { println(s) }");
    // No effect_info: declared sets are treated as empty.
    let result = canonicalize(&program, &CanonOptions::all());
    let body = body_of(&result.program, "t");
    assert!(!result.effect_annotations[&body.id].has_io);
}

// ── Validator insertion ────────────────────────────────────────────────

#[test]
fn external_calls_are_wrapped() {
    let source = r#"
        external fn now() -> IO + Int = "Date.now"
        external mod console = "console" {
            fn read_line() -> IO + Str
        }
        fn t() -> IO + Str {
            let stamp = now()
            read_line()
        }
    "#;
    let program = parse_ok(source);
    let result = canonicalize(&program, &CanonOptions::all());
    assert_eq!(result.validator_insertions.len(), 2);
    let names: Vec<_> = result
        .validator_insertions
        .iter()
        .map(|v| v.validator.as_str())
        .collect();
    assert_eq!(names, vec!["__validate_int", "__validate_str"]);

    // The wrapped call is now the argument of the validator call.
    let ExprKind::Block(block) = &body_of(&result.program, "t").kind else {
        panic!("expected block");
    };
    let value = block.value.as_ref().unwrap();
    let ExprKind::Call { callee, args } = &value.kind else {
        panic!("expected validator call");
    };
    assert!(matches!(&callee.kind, ExprKind::Ident(n) if n == "__validate_str"));
    assert!(matches!(&args[0].kind, ExprKind::Call { .. }));
}

#[test]
fn validator_names_follow_return_types() {
    let source = r#"
        external fn xs() -> [Int] = "host.xs"
        external fn pair() -> (Int, Int) = "host.pair"
        external fn find() -> Option<Int> = "host.find"
        fn t() -> Unit {
            xs()
            pair()
            find()
        }
    "#;
    let program = parse_ok(source);
    let result = canonicalize(&program, &CanonOptions::all());
    let names: Vec<_> = result
        .validator_insertions
        .iter()
        .map(|v| v.validator.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["__validate_array", "__validate_tuple", "__validate_option"]
    );
}

#[test]
fn non_external_calls_are_not_wrapped() {
    let program = parse_ok("fn f() -> Int { 1 } fn t() -> Int { f() }");
    let result = canonicalize(&program, &CanonOptions::all());
    assert!(result.validator_insertions.is_empty());
}

#[test]
fn snapshot_canonical_form() {
    // An empty body: normalization fills in the unit value.
    let program = parse_ok("fn t() -> Unit { }");
    let result = canonicalize(&program, &CanonOptions::all());
    insta::assert_snapshot!(
        serialize_program(
            &result.program,
            &SerializeOptions { include_spans: false, pretty: true },
        ),
        @r#"
    {
      "decls": [
        {
          "body": {
            "kind": "block",
            "value": {
              "kind": "unit"
            }
          },
          "kind": "function",
          "name": "t",
          "ret": {
            "kind": "named",
            "name": "Unit"
          }
        }
      ],
      "kind": "program"
    }
    "#
    );
}
