//! Type-expression parsers.
//!
//! `allow_refinement` is threaded through every entry: in function return
//! position it is false, so `-> Int {` unambiguously starts the function
//! body and a refined return type must be parenthesized `-> (Int{...})`.
//! Parameter types, function-type components, and array element types all
//! accept refinements.

use rill_common::token::TokenKind;

use crate::ast::{RecordTypeField, TypeExpr, TypeExprKind};

use super::{describe, expressions, Parser};

/// Parse a type expression, including effect rows (`IO + Err + T`).
pub(crate) fn parse_type(p: &mut Parser, allow_refinement: bool) -> Option<TypeExpr> {
    let start = p.current_span();
    let first = parse_type_unit(p, allow_refinement)?;

    if !p.at(TokenKind::Plus) {
        return Some(first);
    }

    // Effect row: types joined by `+`; the last element is the result.
    let id = p.fresh();
    let mut parts = vec![first];
    while p.eat(TokenKind::Plus) {
        parts.push(parse_type_unit(p, allow_refinement)?);
    }
    let result = parts.pop().expect("row has at least two elements");
    Some(TypeExpr {
        id,
        span: p.span_from(&start),
        kind: TypeExprKind::Effect {
            effects: parts,
            result: Box::new(result),
        },
    })
}

/// A single type, with an optional trailing refinement brace.
fn parse_type_unit(p: &mut Parser, allow_refinement: bool) -> Option<TypeExpr> {
    let start = p.current_span();
    let base = parse_type_atom(p)?;
    if allow_refinement && p.at(TokenKind::LBrace) {
        return parse_refinement(p, base, start);
    }
    Some(base)
}

fn parse_type_atom(p: &mut Parser) -> Option<TypeExpr> {
    let start = p.current_span();
    match p.kind() {
        // Built-in type keywords.
        kind if kind.is_builtin_type() => {
            let id = p.fresh();
            let name = kind.builtin_type_name().expect("checked above").to_string();
            p.bump();
            Some(TypeExpr {
                id,
                span: p.span_from(&start),
                kind: TypeExprKind::Named { name, args: Vec::new() },
            })
        }

        // Named types, possibly applied: `Option<Int>`.
        TokenKind::TypeIdent => {
            let id = p.fresh();
            let name = p.bump().ident_text().to_string();
            let mut args = Vec::new();
            if p.eat(TokenKind::Lt) {
                while !p.at(TokenKind::Gt) && !p.at_eof() {
                    args.push(parse_type(p, true)?);
                    if !p.eat(TokenKind::Comma) {
                        break;
                    }
                }
                p.expect(TokenKind::Gt, "`>`");
            }
            Some(TypeExpr {
                id,
                span: p.span_from(&start),
                kind: TypeExprKind::Named { name, args },
            })
        }

        // Array type: `[T]`.
        TokenKind::LBracket => {
            let id = p.fresh();
            p.bump();
            let elem = parse_type(p, true)?;
            p.expect(TokenKind::RBracket, "`]`");
            Some(TypeExpr {
                id,
                span: p.span_from(&start),
                kind: TypeExprKind::Array(Box::new(elem)),
            })
        }

        // `(...)`: unit, grouping, tuple, or function type.
        TokenKind::LParen => parse_paren_type(p),

        // Record type: `{x: Int, y: Str}` or open `{x: Int, ..}`.
        TokenKind::LBrace => parse_record_type(p),

        _ => {
            p.error(format!("expected a type, found {}", describe(p.kind())));
            None
        }
    }
}

/// `()` -> Unit; `(T)` -> T (grouping; refined types reach return position
/// this way); `(T, U)` -> tuple; any of those followed by `->` -> function.
fn parse_paren_type(p: &mut Parser) -> Option<TypeExpr> {
    let start = p.current_span();
    p.bump(); // (

    let mut elems = Vec::new();
    let mut trailing_comma = false;
    while !p.at(TokenKind::RParen) && !p.at_eof() {
        elems.push(parse_type(p, true)?);
        trailing_comma = p.eat(TokenKind::Comma);
        if !trailing_comma {
            break;
        }
    }
    p.expect(TokenKind::RParen, "`)`");

    if p.eat(TokenKind::Arrow) {
        let id = p.fresh();
        let ret = parse_type(p, true)?;
        return Some(TypeExpr {
            id,
            span: p.span_from(&start),
            kind: TypeExprKind::Function {
                params: elems,
                ret: Box::new(ret),
            },
        });
    }

    match elems.len() {
        0 => {
            let id = p.fresh();
            Some(TypeExpr {
                id,
                span: p.span_from(&start),
                kind: TypeExprKind::Named { name: "Unit".to_string(), args: Vec::new() },
            })
        }
        1 if !trailing_comma => Some(elems.into_iter().next().expect("one element")),
        _ => {
            let id = p.fresh();
            Some(TypeExpr {
                id,
                span: p.span_from(&start),
                kind: TypeExprKind::Tuple(elems),
            })
        }
    }
}

fn parse_record_type(p: &mut Parser) -> Option<TypeExpr> {
    let id = p.fresh();
    let start = p.current_span();
    p.bump(); // {
    let mut fields = Vec::new();
    let mut open = false;
    while !p.at(TokenKind::RBrace) && !p.at_eof() {
        if p.eat(TokenKind::DotDot) {
            open = true;
            break;
        }
        let field_start = p.current_span();
        let name = if p.at(TokenKind::Ident) {
            p.bump().ident_text().to_string()
        } else {
            p.error(format!("expected a field name, found {}", describe(p.kind())));
            return None;
        };
        p.expect(TokenKind::Colon, "`:`");
        let ty = parse_type(p, true)?;
        fields.push(RecordTypeField {
            name,
            ty,
            span: p.span_from(&field_start),
        });
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(TokenKind::RBrace, "`}`");
    Some(TypeExpr {
        id,
        span: p.span_from(&start),
        kind: TypeExprKind::RecordType { fields, open },
    })
}

/// `{v | pred}` or `{pred}` after a base type.
fn parse_refinement(
    p: &mut Parser,
    base: TypeExpr,
    start: rill_common::span::Span,
) -> Option<TypeExpr> {
    let id = p.fresh();
    p.bump(); // {

    let var = if p.at(TokenKind::Ident) && p.nth_kind(1) == TokenKind::Bar {
        let name = p.bump().ident_text().to_string();
        p.bump(); // |
        Some(name)
    } else {
        None
    };

    let pred = expressions::parse_expr(p)?;
    p.expect(TokenKind::RBrace, "`}`");

    Some(TypeExpr {
        id,
        span: p.span_from(&start),
        kind: TypeExprKind::Refined {
            base: Box::new(base),
            var,
            pred: Box::new(pred),
        },
    })
}
