//! Integration tests for the Rill lexer: full-program token streams,
//! dual-syntax equivalence, and error recovery.

use rill_common::token::{TokenKind, TokenValue};
use rill_lexer::tokenize;

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize("test.rill", source).0.iter().map(|t| t.kind).collect()
}

#[test]
fn tokenizes_a_full_function() {
    let source = r#"
        fn clamp(x: Int, lo: Int, hi: Int) -> Int {
            if x < lo { lo } else if x > hi { hi } else { x }
        }
    "#;
    let (tokens, errs) = tokenize("clamp.rill", source);
    assert!(errs.is_empty());
    assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    // `fn`, name, and 3 parameter names + 4 Int type keywords appear.
    assert_eq!(tokens.iter().filter(|t| t.kind == TokenKind::TyInt).count(), 4);
    assert_eq!(tokens[0].kind, TokenKind::Fn);
}

#[test]
fn unicode_program_lexes_identically_to_ascii() {
    let ascii = "fn f(x: Int) -> Bool { x != 0 && x <= 10 || !done }";
    let unicode = "ƒ f(x: ℤ) → Bool { x ≠ 0 ∧ x ≤ 10 ∨ ¬done }";
    assert_eq!(kinds(ascii), kinds(unicode));
}

#[test]
fn refinement_type_tokens() {
    let source = "fn f(x: Int{x > 0}) -> Int { x }";
    let ks = kinds(source);
    // The refinement brace sequence: TyInt LBrace Ident Gt Int RBrace
    let idx = ks.iter().position(|k| *k == TokenKind::TyInt).unwrap();
    assert_eq!(
        &ks[idx..idx + 6],
        &[
            TokenKind::TyInt,
            TokenKind::LBrace,
            TokenKind::Ident,
            TokenKind::Gt,
            TokenKind::Int,
            TokenKind::RBrace,
        ]
    );
}

#[test]
fn refinement_bar_separator() {
    assert_eq!(
        kinds("Int{n | n > 0}"),
        vec![
            TokenKind::TyInt,
            TokenKind::LBrace,
            TokenKind::Ident,
            TokenKind::Bar,
            TokenKind::Ident,
            TokenKind::Gt,
            TokenKind::Int,
            TokenKind::RBrace,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn effect_row_tokens() {
    assert_eq!(
        kinds("fn log(s: Str) -> IO + Unit"),
        vec![
            TokenKind::Fn,
            TokenKind::Ident,
            TokenKind::LParen,
            TokenKind::Ident,
            TokenKind::Colon,
            TokenKind::TyStr,
            TokenKind::RParen,
            TokenKind::Arrow,
            TokenKind::TypeIdent,
            TokenKind::Plus,
            TokenKind::TyUnit,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn external_declaration_tokens() {
    let ks = kinds(r#"external fn now() -> Int = "Date.now""#);
    assert_eq!(ks[0], TokenKind::External);
    assert_eq!(ks[1], TokenKind::Fn);
    assert!(ks.contains(&TokenKind::Str));
}

#[test]
fn recovery_produces_error_tokens_and_continues() {
    let (tokens, errs) = tokenize("bad.rill", "let x = £ + 1");
    let ks: Vec<_> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        ks,
        vec![
            TokenKind::Let,
            TokenKind::Ident,
            TokenKind::Eq,
            TokenKind::Error,
            TokenKind::Plus,
            TokenKind::Int,
            TokenKind::Eof,
        ]
    );
    assert_eq!(errs.len(), 1);
    assert!(errs[0].message.contains("unexpected character"));
}

#[test]
fn template_string_with_nested_braces() {
    let (tokens, errs) = tokenize("t.rill", "`total: ${sum({x: 1, y: 2})}`");
    assert!(errs.is_empty());
    match &tokens[0].value {
        Some(TokenValue::Str(s)) => assert_eq!(s, "total: ${sum({x: 1, y: 2})}"),
        other => panic!("expected template content, got {other:?}"),
    }
}

#[test]
fn spans_cover_the_source_in_order() {
    let (tokens, _) = tokenize("t.rill", "let x = 1 + 2");
    let mut last_end = 0;
    for token in &tokens {
        assert!(token.span.start.offset >= last_end, "tokens must not overlap");
        assert!(token.span.start.offset <= token.span.end.offset);
        last_end = token.span.start.offset;
    }
}

#[test]
fn snapshot_token_stream() {
    let (tokens, errs) = tokenize("snap.rill", "fn add(a: Int, b: Int) -> Int { a + b }");
    assert!(errs.is_empty());
    let summary: Vec<String> = tokens
        .iter()
        .map(|t| match &t.value {
            Some(TokenValue::Ident(s)) => format!("{:?}({s})", t.kind),
            Some(TokenValue::Int { digits, .. }) => format!("{:?}({digits})", t.kind),
            _ => format!("{:?}", t.kind),
        })
        .collect();
    insta::assert_snapshot!(
        summary.join(" "),
        @"Fn Ident(add) LParen Ident(a) Colon TyInt Comma Ident(b) Colon TyInt RParen Arrow TyInt LBrace Ident(a) Plus Ident(b) RBrace Eof"
    );
}
