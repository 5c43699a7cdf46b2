//! Structural normalization.
//!
//! - `if` without `else` gains a synthetic `else { () }`,
//! - empty blocks gain a trailing unit value,
//! - bare `return` gains an explicit unit value.
//!
//! `else if` chains stay as nested if-expressions; they are not
//! flattened. All synthetic nodes carry synthetic spans.

use rill_common::span::Span;
use rill_parser::ast::{
    Block, DeclKind, Expr, ExprKind, IdGen, Literal, Program, Stmt, StmtKind,
};

pub(crate) fn normalize_program(program: &mut Program, ids: &mut IdGen) {
    for decl in &mut program.decls {
        if let DeclKind::Function(f) = &mut decl.kind {
            normalize_expr(&mut f.body, ids);
        }
    }
}

fn unit_literal(ids: &mut IdGen) -> Expr {
    Expr {
        id: ids.fresh(),
        span: Span::synthetic(),
        kind: ExprKind::Literal(Literal::Unit),
    }
}

/// A synthetic `{ () }` block used as the inserted `else` branch.
fn unit_block(ids: &mut IdGen) -> Expr {
    let id = ids.fresh();
    let value = unit_literal(ids);
    Expr {
        id,
        span: Span::synthetic(),
        kind: ExprKind::Block(Block { stmts: Vec::new(), value: Some(Box::new(value)) }),
    }
}

pub(crate) fn normalize_expr(expr: &mut Expr, ids: &mut IdGen) {
    match &mut expr.kind {
        ExprKind::Unary { operand, .. } => normalize_expr(operand, ids),
        ExprKind::Binary { lhs, rhs, .. } => {
            normalize_expr(lhs, ids);
            normalize_expr(rhs, ids);
        }
        ExprKind::Call { callee, args } => {
            normalize_expr(callee, ids);
            for arg in args {
                normalize_expr(arg, ids);
            }
        }
        ExprKind::Index { base, index } => {
            normalize_expr(base, ids);
            normalize_expr(index, ids);
        }
        ExprKind::Field { base, .. } => normalize_expr(base, ids),
        ExprKind::Lambda { body, .. } => normalize_expr(body, ids),
        ExprKind::If { cond, then_branch, else_branch } => {
            normalize_expr(cond, ids);
            normalize_expr(then_branch, ids);
            match else_branch {
                Some(els) => normalize_expr(els, ids),
                None => *else_branch = Some(Box::new(unit_block(ids))),
            }
        }
        ExprKind::Match { scrutinee, arms } => {
            normalize_expr(scrutinee, ids);
            for arm in arms {
                if let Some(guard) = &mut arm.guard {
                    normalize_expr(guard, ids);
                }
                normalize_expr(&mut arm.body, ids);
            }
        }
        ExprKind::Block(block) => normalize_block(block, ids),
        ExprKind::Array(elems) | ExprKind::Tuple(elems) => {
            for e in elems {
                normalize_expr(e, ids);
            }
        }
        ExprKind::Record { fields } => {
            for f in fields {
                normalize_expr(&mut f.value, ids);
            }
        }
        ExprKind::Range { start, end, .. } => {
            normalize_expr(start, ids);
            normalize_expr(end, ids);
        }
        ExprKind::Propagate(inner) => normalize_expr(inner, ids),
        ExprKind::Literal(_) | ExprKind::Ident(_) => {}
    }
}

fn normalize_block(block: &mut Block, ids: &mut IdGen) {
    for stmt in &mut block.stmts {
        normalize_stmt(stmt, ids);
    }
    match &mut block.value {
        Some(value) => normalize_expr(value, ids),
        None if block.stmts.is_empty() => {
            block.value = Some(Box::new(unit_literal(ids)));
        }
        None => {}
    }
}

fn normalize_stmt(stmt: &mut Stmt, ids: &mut IdGen) {
    match &mut stmt.kind {
        StmtKind::Let { init, .. } => normalize_expr(init, ids),
        StmtKind::Assign { target, value } => {
            normalize_expr(target, ids);
            normalize_expr(value, ids);
        }
        StmtKind::Expr(expr) => normalize_expr(expr, ids),
        StmtKind::For { iter, body, .. } => {
            normalize_expr(iter, ids);
            normalize_expr(body, ids);
        }
        StmtKind::While { cond, body } => {
            normalize_expr(cond, ids);
            normalize_expr(body, ids);
        }
        StmtKind::Loop { body } => normalize_expr(body, ids),
        StmtKind::Return(value) => match value {
            Some(v) => normalize_expr(v, ids),
            None => *value = Some(unit_literal(ids)),
        },
        StmtKind::Break | StmtKind::Continue => {}
        StmtKind::Assert { cond, message } => {
            normalize_expr(cond, ids);
            if let Some(m) = message {
                normalize_expr(m, ids);
            }
        }
    }
}
