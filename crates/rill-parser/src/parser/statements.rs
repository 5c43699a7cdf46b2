//! Statement and block parsers.
//!
//! Semicolons are optional separators. A trailing expression without a
//! semicolon, immediately before `}`, becomes the block's value.

use rill_common::token::TokenKind;

use crate::ast::{Block, Expr, Stmt, StmtKind};

use super::{expressions, patterns, types, Parser};

/// Parse a block as an expression. The current token must be `{` (an
/// error is reported otherwise and `None` returned).
pub(crate) fn parse_block_expr(p: &mut Parser) -> Option<Expr> {
    let start = p.current_span();
    let id = p.fresh();
    if !p.expect(TokenKind::LBrace, "`{`") {
        return None;
    }

    let mut stmts = Vec::new();
    let mut value = None;

    while !p.at(TokenKind::RBrace) && !p.at_eof() {
        if is_stmt_keyword(p.kind()) {
            match parse_keyword_stmt(p) {
                Some(stmt) => {
                    stmts.push(stmt);
                    p.eat(TokenKind::Semicolon);
                }
                None => p.synchronize(),
            }
            continue;
        }

        // Expression, assignment, or the block's trailing value.
        let stmt_start = p.current_span();
        let Some(expr) = expressions::parse_expr(p) else {
            p.synchronize();
            continue;
        };

        if p.at(TokenKind::RBrace) {
            value = Some(Box::new(expr));
            break;
        }

        if p.at(TokenKind::Eq) {
            let stmt_id = p.fresh();
            p.bump(); // =
            match expressions::parse_expr(p) {
                Some(rhs) => {
                    stmts.push(Stmt {
                        id: stmt_id,
                        span: p.span_from(&stmt_start),
                        kind: StmtKind::Assign { target: expr, value: rhs },
                    });
                }
                None => {
                    p.synchronize();
                    continue;
                }
            }
        } else {
            let stmt_id = p.fresh();
            stmts.push(Stmt {
                id: stmt_id,
                span: p.span_from(&stmt_start),
                kind: StmtKind::Expr(expr),
            });
        }
        p.eat(TokenKind::Semicolon);
    }

    p.expect(TokenKind::RBrace, "`}`");
    Some(expressions::block_expr(id, p.span_from(&start), Block { stmts, value }))
}

fn is_stmt_keyword(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Let
            | TokenKind::Return
            | TokenKind::Break
            | TokenKind::Continue
            | TokenKind::For
            | TokenKind::While
            | TokenKind::Loop
            | TokenKind::Assert
    )
}

/// Parse a statement introduced by a keyword. Expression statements and
/// assignments are handled by the block loop (and by `parse_stmt` for the
/// standalone entry point).
fn parse_keyword_stmt(p: &mut Parser) -> Option<Stmt> {
    let start = p.current_span();
    match p.kind() {
        TokenKind::Let => {
            let id = p.fresh();
            p.bump();
            let mutable = p.eat(TokenKind::Mut);
            let pattern = patterns::parse_pattern(p)?;
            let ty = if p.eat(TokenKind::Colon) {
                Some(types::parse_type(p, true)?)
            } else {
                None
            };
            p.expect(TokenKind::Eq, "`=`");
            let init = expressions::parse_expr(p)?;
            Some(Stmt {
                id,
                span: p.span_from(&start),
                kind: StmtKind::Let { pattern, ty, mutable, init },
            })
        }

        TokenKind::Return => {
            let id = p.fresh();
            p.bump();
            let value = if starts_expression(p.kind()) {
                Some(expressions::parse_expr(p)?)
            } else {
                None
            };
            Some(Stmt {
                id,
                span: p.span_from(&start),
                kind: StmtKind::Return(value),
            })
        }

        TokenKind::Break => {
            let id = p.fresh();
            p.bump();
            Some(Stmt { id, span: p.span_from(&start), kind: StmtKind::Break })
        }

        TokenKind::Continue => {
            let id = p.fresh();
            p.bump();
            Some(Stmt { id, span: p.span_from(&start), kind: StmtKind::Continue })
        }

        TokenKind::For => {
            let id = p.fresh();
            p.bump();
            let binding = patterns::parse_pattern(p)?;
            p.expect(TokenKind::In, "`in`");
            let iter = expressions::parse_expr(p)?;
            let body = parse_block_expr(p)?;
            Some(Stmt {
                id,
                span: p.span_from(&start),
                kind: StmtKind::For { binding, iter, body },
            })
        }

        TokenKind::While => {
            let id = p.fresh();
            p.bump();
            let cond = expressions::parse_expr(p)?;
            let body = parse_block_expr(p)?;
            Some(Stmt {
                id,
                span: p.span_from(&start),
                kind: StmtKind::While { cond, body },
            })
        }

        TokenKind::Loop => {
            let id = p.fresh();
            p.bump();
            let body = parse_block_expr(p)?;
            Some(Stmt {
                id,
                span: p.span_from(&start),
                kind: StmtKind::Loop { body },
            })
        }

        TokenKind::Assert => {
            let id = p.fresh();
            p.bump();
            let cond = expressions::parse_expr(p)?;
            let message = if p.eat(TokenKind::Comma) {
                Some(expressions::parse_expr(p)?)
            } else {
                None
            };
            Some(Stmt {
                id,
                span: p.span_from(&start),
                kind: StmtKind::Assert { cond, message },
            })
        }

        _ => unreachable!("caller checked is_stmt_keyword"),
    }
}

/// Parse a single statement (the standalone entry point used by the JSON
/// bridge for statement fragments).
pub(crate) fn parse_stmt(p: &mut Parser) -> Option<Stmt> {
    if is_stmt_keyword(p.kind()) {
        return parse_keyword_stmt(p);
    }
    let start = p.current_span();
    let expr = expressions::parse_expr(p)?;
    if p.at(TokenKind::Eq) {
        let id = p.fresh();
        p.bump();
        let value = expressions::parse_expr(p)?;
        return Some(Stmt {
            id,
            span: p.span_from(&start),
            kind: StmtKind::Assign { target: expr, value },
        });
    }
    let id = p.fresh();
    Some(Stmt {
        id,
        span: p.span_from(&start),
        kind: StmtKind::Expr(expr),
    })
}

/// Whether a token can begin an expression (used to decide if `return`
/// carries a value).
fn starts_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Int
            | TokenKind::Float
            | TokenKind::Str
            | TokenKind::TemplateStr
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Ident
            | TokenKind::TypeIdent
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::If
            | TokenKind::Match
            | TokenKind::Fn
            | TokenKind::Minus
            | TokenKind::Bang
    ) || kind.is_builtin_type()
}
