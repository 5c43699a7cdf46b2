//! Pratt expression parser.
//!
//! Operator precedence via binding-power tables; a single loop handles
//! postfix forms (call, index, field, `?`) and infix operators. Atoms
//! cover literals, names, grouping/tuples, arrays, record literals,
//! blocks, `if`, `match`, and lambdas.

use rill_common::token::{TokenKind, TokenValue};

use crate::ast::{
    BinaryOp, Block, Expr, ExprKind, Literal, MatchArm, Param, RecordExprField, UnaryOp,
};

use super::{describe, patterns, statements, types, Parser};

// ── Binding power tables ───────────────────────────────────────────────

/// Returns (left_bp, right_bp) for infix operators; left < right is
/// left-associative, left > right is right-associative.
fn infix_binding_power(op: TokenKind) -> Option<(u8, u8)> {
    match op {
        // Pipe: lowest expression precedence, left-associative.
        TokenKind::PipeGt => Some((1, 2)),

        TokenKind::PipePipe => Some((3, 4)),
        TokenKind::AmpAmp => Some((5, 6)),

        TokenKind::EqEq | TokenKind::NotEq => Some((7, 8)),

        TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => Some((9, 10)),

        // Ranges sit between comparison and concatenation.
        TokenKind::DotDot | TokenKind::DotDotEq => Some((11, 12)),

        TokenKind::PlusPlus => Some((13, 14)),

        TokenKind::Plus | TokenKind::Minus => Some((15, 16)),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some((17, 18)),

        // Power: right-associative.
        TokenKind::StarStar => Some((20, 19)),

        _ => None,
    }
}

/// Binding power of prefix `-` and `!`: tighter than every infix operator.
const PREFIX_BP: u8 = 21;

/// Postfix operations (call, index, field, `?`) bind tighter than all
/// prefix and infix operators.
const POSTFIX_BP: u8 = 23;

// ── Entry point ────────────────────────────────────────────────────────

pub(crate) fn parse_expr(p: &mut Parser) -> Option<Expr> {
    expr_bp(p, 0)
}

fn expr_bp(p: &mut Parser, min_bp: u8) -> Option<Expr> {
    let start = p.current_span();
    let mut lhs = parse_prefix(p)?;

    loop {
        let current = p.kind();

        // ── Postfix: call ──
        if current == TokenKind::LParen && POSTFIX_BP >= min_bp {
            let id = p.fresh();
            p.bump(); // (
            let mut args = Vec::new();
            while !p.at(TokenKind::RParen) && !p.at_eof() {
                args.push(expr_bp(p, 0)?);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            p.expect(TokenKind::RParen, "`)`");
            lhs = Expr {
                id,
                span: p.span_from(&start),
                kind: ExprKind::Call { callee: Box::new(lhs), args },
            };
            continue;
        }

        // ── Postfix: index ──
        if current == TokenKind::LBracket && POSTFIX_BP >= min_bp {
            let id = p.fresh();
            p.bump(); // [
            let index = expr_bp(p, 0)?;
            p.expect(TokenKind::RBracket, "`]`");
            lhs = Expr {
                id,
                span: p.span_from(&start),
                kind: ExprKind::Index { base: Box::new(lhs), index: Box::new(index) },
            };
            continue;
        }

        // ── Postfix: field access ──
        if current == TokenKind::Dot && POSTFIX_BP >= min_bp {
            let id = p.fresh();
            p.bump(); // .
            let name = if p.at(TokenKind::Ident) {
                p.bump().ident_text().to_string()
            } else {
                p.error(format!("expected a field name, found {}", describe(p.kind())));
                return None;
            };
            lhs = Expr {
                id,
                span: p.span_from(&start),
                kind: ExprKind::Field { base: Box::new(lhs), name },
            };
            continue;
        }

        // ── Postfix: error propagation ──
        if current == TokenKind::Question && POSTFIX_BP >= min_bp {
            let id = p.fresh();
            p.bump(); // ?
            lhs = Expr {
                id,
                span: p.span_from(&start),
                kind: ExprKind::Propagate(Box::new(lhs)),
            };
            continue;
        }

        // ── Record construction on a type name is rejected ──
        if current == TokenKind::LBrace && looks_like_rejected_record(p, &lhs) {
            p.error_with_hint(
                "record literals cannot be constructed with a type name",
                "use positional construction `Name(...)` or an anonymous record `{field: ...}`",
            );
            return None;
        }

        // ── Infix operators ──
        let Some((left_bp, right_bp)) = infix_binding_power(current) else {
            break;
        };
        if left_bp < min_bp {
            break;
        }

        let id = p.fresh();
        let op_token = p.bump();
        let rhs = expr_bp(p, right_bp)?;
        let span = p.span_from(&start);

        lhs = match op_token.kind {
            TokenKind::DotDot | TokenKind::DotDotEq => Expr {
                id,
                span,
                kind: ExprKind::Range {
                    start: Box::new(lhs),
                    end: Box::new(rhs),
                    inclusive: op_token.kind == TokenKind::DotDotEq,
                },
            },
            kind => Expr {
                id,
                span,
                kind: ExprKind::Binary {
                    op: binary_op(kind),
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
            },
        };
    }

    Some(lhs)
}

/// `TypeName { field: ... }` at a postfix position. The inherent ambiguity
/// with block expressions is resolved by rejecting the form outright.
fn looks_like_rejected_record(p: &Parser, lhs: &Expr) -> bool {
    let is_type_name = match &lhs.kind {
        ExprKind::Ident(name) => name.chars().next().is_some_and(char::is_uppercase),
        _ => false,
    };
    is_type_name && p.nth_kind(1) == TokenKind::Ident && p.nth_kind(2) == TokenKind::Colon
}

fn binary_op(kind: TokenKind) -> BinaryOp {
    match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::StarStar => BinaryOp::Pow,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::PipePipe => BinaryOp::Or,
        TokenKind::PlusPlus => BinaryOp::Concat,
        TokenKind::PipeGt => BinaryOp::Pipe,
        other => unreachable!("not an infix operator: {other:?}"),
    }
}

// ── Prefix and atoms ───────────────────────────────────────────────────

fn parse_prefix(p: &mut Parser) -> Option<Expr> {
    let start = p.current_span();
    let op = match p.kind() {
        TokenKind::Minus => UnaryOp::Neg,
        TokenKind::Bang => UnaryOp::Not,
        _ => return parse_atom(p),
    };
    let id = p.fresh();
    p.bump();
    let operand = expr_bp(p, PREFIX_BP)?;
    Some(Expr {
        id,
        span: p.span_from(&start),
        kind: ExprKind::Unary { op, operand: Box::new(operand) },
    })
}

fn parse_atom(p: &mut Parser) -> Option<Expr> {
    let start = p.current_span();
    match p.kind() {
        TokenKind::Int | TokenKind::Float | TokenKind::Str | TokenKind::TemplateStr => {
            let id = p.fresh();
            let token = p.bump();
            let literal = match (token.kind, token.value) {
                (_, Some(TokenValue::Int { digits, width })) => Literal::Int { digits, width },
                (_, Some(TokenValue::Float(v))) => Literal::Float(v),
                (TokenKind::TemplateStr, Some(TokenValue::Str(s))) => Literal::TemplateStr(s),
                (_, Some(TokenValue::Str(s))) => Literal::Str(s),
                _ => Literal::Unit,
            };
            Some(Expr {
                id,
                span: p.span_from(&start),
                kind: ExprKind::Literal(literal),
            })
        }

        TokenKind::True | TokenKind::False => {
            let id = p.fresh();
            let value = p.bump().kind == TokenKind::True;
            Some(Expr {
                id,
                span: p.span_from(&start),
                kind: ExprKind::Literal(Literal::Bool(value)),
            })
        }

        TokenKind::Ident | TokenKind::TypeIdent => {
            let id = p.fresh();
            let name = p.bump().ident_text().to_string();
            Some(Expr {
                id,
                span: p.span_from(&start),
                kind: ExprKind::Ident(name),
            })
        }

        // Built-in type keywords double as nullary variant constructors.
        kind if kind.is_builtin_type() => {
            let id = p.fresh();
            let name = kind.builtin_type_name().expect("checked above").to_string();
            p.bump();
            Some(Expr {
                id,
                span: p.span_from(&start),
                kind: ExprKind::Ident(name),
            })
        }

        TokenKind::LParen => parse_paren(p),
        TokenKind::LBracket => parse_array(p),
        TokenKind::LBrace => {
            // `{name: ...}` is a record literal; anything else is a block.
            if p.nth_kind(1) == TokenKind::Ident && p.nth_kind(2) == TokenKind::Colon {
                parse_record_literal(p)
            } else {
                statements::parse_block_expr(p)
            }
        }
        TokenKind::If => parse_if(p),
        TokenKind::Match => parse_match(p),
        TokenKind::Fn => parse_lambda(p),

        _ => {
            p.error(format!(
                "expected an expression, found {}",
                describe(p.kind())
            ));
            None
        }
    }
}

/// `()` unit, `(e)` grouping, `(a, b)` tuple.
fn parse_paren(p: &mut Parser) -> Option<Expr> {
    let start = p.current_span();
    let id = p.fresh();
    p.bump(); // (
    if p.eat(TokenKind::RParen) {
        return Some(Expr {
            id,
            span: p.span_from(&start),
            kind: ExprKind::Literal(Literal::Unit),
        });
    }
    let mut elems = Vec::new();
    let mut saw_comma = false;
    while !p.at(TokenKind::RParen) && !p.at_eof() {
        elems.push(expr_bp(p, 0)?);
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
    Some(Expr {
        id,
        span: p.span_from(&start),
        kind: ExprKind::Tuple(elems),
    })
}

fn parse_array(p: &mut Parser) -> Option<Expr> {
    let start = p.current_span();
    let id = p.fresh();
    p.bump(); // [
    let mut elems = Vec::new();
    while !p.at(TokenKind::RBracket) && !p.at_eof() {
        elems.push(expr_bp(p, 0)?);
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(TokenKind::RBracket, "`]`");
    Some(Expr {
        id,
        span: p.span_from(&start),
        kind: ExprKind::Array(elems),
    })
}

/// Anonymous record literal `{x: 1, y: f(2)}`.
fn parse_record_literal(p: &mut Parser) -> Option<Expr> {
    let start = p.current_span();
    let id = p.fresh();
    p.bump(); // {
    let mut fields = Vec::new();
    while !p.at(TokenKind::RBrace) && !p.at_eof() {
        let field_start = p.current_span();
        let name = if p.at(TokenKind::Ident) {
            p.bump().ident_text().to_string()
        } else {
            p.error(format!("expected a field name, found {}", describe(p.kind())));
            return None;
        };
        p.expect(TokenKind::Colon, "`:`");
        let value = expr_bp(p, 0)?;
        fields.push(RecordExprField {
            name,
            value,
            span: p.span_from(&field_start),
        });
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(TokenKind::RBrace, "`}`");
    Some(Expr {
        id,
        span: p.span_from(&start),
        kind: ExprKind::Record { fields },
    })
}

/// `if cond { ... } [else { ... } | else if ...]`. Branches are blocks.
fn parse_if(p: &mut Parser) -> Option<Expr> {
    let start = p.current_span();
    let id = p.fresh();
    p.bump(); // if
    let cond = expr_bp(p, 0)?;
    let then_branch = statements::parse_block_expr(p)?;
    let else_branch = if p.eat(TokenKind::Else) {
        if p.at(TokenKind::If) {
            Some(Box::new(parse_if(p)?))
        } else {
            Some(Box::new(statements::parse_block_expr(p)?))
        }
    } else {
        None
    };
    Some(Expr {
        id,
        span: p.span_from(&start),
        kind: ExprKind::If {
            cond: Box::new(cond),
            then_branch: Box::new(then_branch),
            else_branch,
        },
    })
}

/// `match scrutinee { Pat [if guard] -> body, ... }`
fn parse_match(p: &mut Parser) -> Option<Expr> {
    let start = p.current_span();
    let id = p.fresh();
    p.bump(); // match
    let scrutinee = expr_bp(p, 0)?;
    p.expect(TokenKind::LBrace, "`{`");
    let mut arms = Vec::new();
    while !p.at(TokenKind::RBrace) && !p.at_eof() {
        let arm_start = p.current_span();
        let pattern = patterns::parse_pattern(p)?;
        let guard = if p.eat(TokenKind::If) {
            Some(expr_bp(p, 0)?)
        } else {
            None
        };
        p.expect(TokenKind::Arrow, "`->`");
        let body = expr_bp(p, 0)?;
        arms.push(MatchArm {
            pattern,
            guard,
            body,
            span: p.span_from(&arm_start),
        });
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(TokenKind::RBrace, "`}`");
    Some(Expr {
        id,
        span: p.span_from(&start),
        kind: ExprKind::Match {
            scrutinee: Box::new(scrutinee),
            arms,
        },
    })
}

/// `fn(x, y: Int) -> body` / `λ(x) → body`. Parameter annotations are
/// optional; the body is any expression (often a block).
fn parse_lambda(p: &mut Parser) -> Option<Expr> {
    let start = p.current_span();
    let id = p.fresh();
    p.bump(); // fn / λ
    p.expect(TokenKind::LParen, "`(`");
    let mut params = Vec::new();
    while !p.at(TokenKind::RParen) && !p.at_eof() {
        let param_start = p.current_span();
        let name = if p.at(TokenKind::Ident) {
            p.bump().ident_text().to_string()
        } else {
            p.error(format!(
                "expected a parameter name, found {}",
                describe(p.kind())
            ));
            return None;
        };
        let ty = if p.eat(TokenKind::Colon) {
            Some(types::parse_type(p, true)?)
        } else {
            None
        };
        params.push(Param {
            name,
            ty,
            span: p.span_from(&param_start),
        });
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(TokenKind::RParen, "`)`");
    p.expect(TokenKind::Arrow, "`->`");
    let body = expr_bp(p, 0)?;
    Some(Expr {
        id,
        span: p.span_from(&start),
        kind: ExprKind::Lambda {
            params,
            body: Box::new(body),
        },
    })
}

/// Build a block value from pre-parsed parts (used by statement parsing).
pub(crate) fn block_expr(id: crate::ast::NodeId, span: rill_common::span::Span, block: Block) -> Expr {
    Expr { id, span, kind: ExprKind::Block(block) }
}
