//! Rill parser: recursive-descent + Pratt parser producing a typed AST.
//!
//! The parser turns the token stream from `rill-lexer` into an owned
//! tagged-variant tree (`ast`). Every node gets a stable id from a
//! per-parse [`ast::IdGen`] and a source span. Errors never abort: the
//! parser synchronizes at declaration/statement boundaries and always
//! returns a (possibly partial) tree alongside its diagnostics.
//!
//! Besides whole-program parsing, standalone entry points exist for
//! expressions, type expressions, patterns, statements, and blocks; the
//! JSON bridge uses them to parse embedded source fragments.

pub mod ast;
mod parser;

use rill_common::diagnostics::Diagnostic;
use rill_common::span::Span;
use rill_common::token::{Token, TokenKind};

use ast::{Expr, Pattern, Program, Stmt, TypeExpr};
use parser::Parser;

/// Parse a token stream into a program. A partial program is returned
/// even when errors occur.
pub fn parse(tokens: &[Token]) -> (Program, Vec<Diagnostic>) {
    if tokens.is_empty() {
        let mut ids = ast::IdGen::new();
        return (
            Program { id: ids.fresh(), span: Span::synthetic(), decls: Vec::new() },
            Vec::new(),
        );
    }
    let mut p = Parser::new(tokens);
    let program = p.parse_program();
    (program, p.diagnostics)
}

/// Parse a standalone expression fragment.
pub fn parse_expression(tokens: &[Token]) -> (Option<Expr>, Vec<Diagnostic>) {
    parse_fragment(tokens, |p| parser::expressions::parse_expr(p))
}

/// Parse a standalone type-expression fragment (refinements allowed).
pub fn parse_type_expr(tokens: &[Token]) -> (Option<TypeExpr>, Vec<Diagnostic>) {
    parse_fragment(tokens, |p| parser::types::parse_type(p, true))
}

/// Parse a standalone pattern fragment.
pub fn parse_pattern(tokens: &[Token]) -> (Option<Pattern>, Vec<Diagnostic>) {
    parse_fragment(tokens, |p| parser::patterns::parse_pattern(p))
}

/// Parse a standalone statement fragment.
pub fn parse_statement(tokens: &[Token]) -> (Option<Stmt>, Vec<Diagnostic>) {
    parse_fragment(tokens, |p| parser::statements::parse_stmt(p))
}

/// Parse a standalone block fragment (`{ ... }`), returned as a block
/// expression.
pub fn parse_block(tokens: &[Token]) -> (Option<Expr>, Vec<Diagnostic>) {
    parse_fragment(tokens, |p| parser::statements::parse_block_expr(p))
}

/// Parse a standalone declaration fragment.
pub fn parse_declaration(tokens: &[Token]) -> (Option<ast::Decl>, Vec<Diagnostic>) {
    parse_fragment(tokens, |p| parser::items::parse_decl(p))
}

fn parse_fragment<T>(
    tokens: &[Token],
    f: impl FnOnce(&mut Parser) -> Option<T>,
) -> (Option<T>, Vec<Diagnostic>) {
    if tokens.is_empty() {
        return (None, Vec::new());
    }
    let mut p = Parser::new(tokens);
    let result = f(&mut p);
    if result.is_some() && !p.at_eof() {
        p.error(format!(
            "unexpected trailing input after fragment: {}",
            parser::describe(p.current().kind)
        ));
    }
    let failed = p.diagnostics.iter().any(Diagnostic::is_error);
    (if failed { None } else { result }, p.diagnostics)
}

// ── Source-level conveniences ──────────────────────────────────────────
//
// These run the lexer and parser back to back, concatenating diagnostics
// in pipeline order (lexical first). Error tokens inside the stream are
// tolerated by the parser's recovery.

/// Tokenize and parse a whole source file.
pub fn parse_source(file: &str, source: &str) -> (Program, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = rill_lexer::tokenize(file, source);
    let (program, parse_diags) = parse(&tokens);
    diagnostics.extend(parse_diags);
    (program, diagnostics)
}

/// Tokenize and parse an expression fragment.
pub fn parse_expression_source(file: &str, source: &str) -> (Option<Expr>, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = rill_lexer::tokenize(file, source);
    let (expr, parse_diags) = parse_expression(&tokens);
    diagnostics.extend(parse_diags);
    (expr, diagnostics)
}

/// Tokenize and parse a type-expression fragment.
pub fn parse_type_expr_source(file: &str, source: &str) -> (Option<TypeExpr>, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = rill_lexer::tokenize(file, source);
    let (ty, parse_diags) = parse_type_expr(&tokens);
    diagnostics.extend(parse_diags);
    (ty, diagnostics)
}

/// Tokenize and parse a pattern fragment.
pub fn parse_pattern_source(file: &str, source: &str) -> (Option<Pattern>, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = rill_lexer::tokenize(file, source);
    let (pat, parse_diags) = parse_pattern(&tokens);
    diagnostics.extend(parse_diags);
    (pat, diagnostics)
}

/// Tokenize and parse a statement fragment.
pub fn parse_statement_source(file: &str, source: &str) -> (Option<Stmt>, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = rill_lexer::tokenize(file, source);
    let (stmt, parse_diags) = parse_statement(&tokens);
    diagnostics.extend(parse_diags);
    (stmt, diagnostics)
}

/// Tokenize and parse a block fragment.
pub fn parse_block_source(file: &str, source: &str) -> (Option<Expr>, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = rill_lexer::tokenize(file, source);
    let (block, parse_diags) = parse_block(&tokens);
    diagnostics.extend(parse_diags);
    (block, diagnostics)
}

/// Tokenize and parse a declaration fragment.
pub fn parse_declaration_source(file: &str, source: &str) -> (Option<ast::Decl>, Vec<Diagnostic>) {
    let (tokens, mut diagnostics) = rill_lexer::tokenize(file, source);
    let (decl, parse_diags) = parse_declaration(&tokens);
    diagnostics.extend(parse_diags);
    (decl, diagnostics)
}
