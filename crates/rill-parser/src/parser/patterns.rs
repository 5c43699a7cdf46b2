//! Pattern parsers.

use rill_common::token::{TokenKind, TokenValue};

use crate::ast::{Literal, Pattern, PatternKind, RecordPatternField};

use super::{describe, items, Parser};

/// Parse a pattern.
pub(crate) fn parse_pattern(p: &mut Parser) -> Option<Pattern> {
    let start = p.current_span();
    match p.kind() {
        // `_` lexes as an identifier; it is the wildcard pattern.
        TokenKind::Ident => {
            let id = p.fresh();
            let name = p.bump().ident_text().to_string();
            let kind = if name == "_" {
                PatternKind::Wildcard
            } else {
                PatternKind::Ident(name)
            };
            Some(Pattern { id, span: p.span_from(&start), kind })
        }

        TokenKind::Int | TokenKind::Float | TokenKind::Str => {
            let id = p.fresh();
            let token = p.bump();
            let literal = match token.value {
                Some(TokenValue::Int { digits, width }) => Literal::Int { digits, width },
                Some(TokenValue::Float(v)) => Literal::Float(v),
                Some(TokenValue::Str(s)) => Literal::Str(s),
                _ => Literal::Unit,
            };
            Some(Pattern {
                id,
                span: p.span_from(&start),
                kind: PatternKind::Literal(literal),
            })
        }

        TokenKind::True | TokenKind::False => {
            let id = p.fresh();
            let value = p.bump().kind == TokenKind::True;
            Some(Pattern {
                id,
                span: p.span_from(&start),
                kind: PatternKind::Literal(Literal::Bool(value)),
            })
        }

        // `(a, b)` tuple, `(pat)` grouping, `()` unit literal.
        TokenKind::LParen => {
            let id = p.fresh();
            p.bump();
            if p.eat(TokenKind::RParen) {
                return Some(Pattern {
                    id,
                    span: p.span_from(&start),
                    kind: PatternKind::Literal(Literal::Unit),
                });
            }
            let mut elems = Vec::new();
            let mut saw_comma = false;
            while !p.at(TokenKind::RParen) && !p.at_eof() {
                elems.push(parse_pattern(p)?);
                if p.eat(TokenKind::Comma) {
                    saw_comma = true;
                } else {
                    break;
                }
            }
            p.expect(TokenKind::RParen, "`)`");
            if elems.len() == 1 && !saw_comma {
                return Some(elems.into_iter().next().expect("one element"));
            }
            Some(Pattern {
                id,
                span: p.span_from(&start),
                kind: PatternKind::Tuple(elems),
            })
        }

        // `{x, y: pat}` record pattern.
        TokenKind::LBrace => {
            let id = p.fresh();
            p.bump();
            let mut fields = Vec::new();
            while !p.at(TokenKind::RBrace) && !p.at_eof() {
                let field_start = p.current_span();
                let name = if p.at(TokenKind::Ident) {
                    p.bump().ident_text().to_string()
                } else {
                    p.error(format!(
                        "expected a field name, found {}",
                        describe(p.kind())
                    ));
                    return None;
                };
                let pattern = if p.eat(TokenKind::Colon) {
                    Some(parse_pattern(p)?)
                } else {
                    None
                };
                fields.push(RecordPatternField {
                    name,
                    pattern,
                    span: p.span_from(&field_start),
                });
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            p.expect(TokenKind::RBrace, "`}`");
            Some(Pattern {
                id,
                span: p.span_from(&start),
                kind: PatternKind::Record { fields },
            })
        }

        // Variant pattern: a type identifier, optionally with payload.
        // Built-in type keywords double as variant names.
        kind if kind == TokenKind::TypeIdent || kind.is_builtin_type() => {
            let id = p.fresh();
            let name = items::parse_variant_name(p)?;
            let mut args = Vec::new();
            if p.eat(TokenKind::LParen) {
                while !p.at(TokenKind::RParen) && !p.at_eof() {
                    args.push(parse_pattern(p)?);
                    if !p.eat(TokenKind::Comma) {
                        break;
                    }
                }
                p.expect(TokenKind::RParen, "`)`");
            }
            Some(Pattern {
                id,
                span: p.span_from(&start),
                kind: PatternKind::Variant { name, args },
            })
        }

        _ => {
            p.error(format!("expected a pattern, found {}", describe(p.kind())));
            None
        }
    }
}
