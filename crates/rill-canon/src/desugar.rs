//! Desugaring: pipes and ranges.
//!
//! - `x |> f` becomes `f(x)`, left-to-right for chains (children are
//!   rewritten first, so `x |> f |> g` ends as `g(f(x))`).
//! - `a..b` / `a..=b` become `__range(a, b, inclusive)` calls for the
//!   back-end's range helper.
//!
//! Unicode operators need no work here: the lexer resolves `≠ ≤ ≥ ∧ ∨ ¬`
//! to the same token kinds as their ASCII forms, so the AST only ever
//! carries ASCII operators.

use std::mem;

use rill_common::span::Span;
use rill_parser::ast::{
    BinaryOp, Decl, DeclKind, Expr, ExprKind, IdGen, Literal, Program, Stmt, StmtKind, TypeExpr,
    TypeExprKind,
};

pub(crate) fn desugar_program(program: &mut Program, ids: &mut IdGen) {
    for decl in &mut program.decls {
        desugar_decl_types(decl, ids);
        if let DeclKind::Function(f) = &mut decl.kind {
            desugar_expr(&mut f.body, ids);
        }
    }
}

/// Refinement predicates are expressions too; sugar inside them is
/// rewritten the same way.
fn desugar_decl_types(decl: &mut Decl, ids: &mut IdGen) {
    match &mut decl.kind {
        DeclKind::TypeAlias { ty, .. } => desugar_type(ty, ids),
        DeclKind::Record { fields, .. } => {
            for field in fields {
                desugar_type(&mut field.ty, ids);
            }
        }
        DeclKind::Function(f) => {
            for param in &mut f.params {
                if let Some(ty) = &mut param.ty {
                    desugar_type(ty, ids);
                }
            }
            if let Some(ret) = &mut f.ret {
                desugar_type(ret, ids);
            }
        }
        DeclKind::ExternalFn(f) => {
            for param in &mut f.params {
                if let Some(ty) = &mut param.ty {
                    desugar_type(ty, ids);
                }
            }
            if let Some(ret) = &mut f.ret {
                desugar_type(ret, ids);
            }
        }
        DeclKind::ExternalMod { fns, .. } => {
            for inner in fns {
                desugar_decl_types(inner, ids);
            }
        }
        _ => {}
    }
}

fn desugar_type(ty: &mut TypeExpr, ids: &mut IdGen) {
    match &mut ty.kind {
        TypeExprKind::Named { args, .. } => {
            for arg in args {
                desugar_type(arg, ids);
            }
        }
        TypeExprKind::Array(elem) => desugar_type(elem, ids),
        TypeExprKind::Tuple(elems) => {
            for e in elems {
                desugar_type(e, ids);
            }
        }
        TypeExprKind::Function { params, ret } => {
            for p in params {
                desugar_type(p, ids);
            }
            desugar_type(ret, ids);
        }
        TypeExprKind::Refined { base, pred, .. } => {
            desugar_type(base, ids);
            desugar_expr(pred, ids);
        }
        TypeExprKind::Effect { effects, result } => {
            for e in effects {
                desugar_type(e, ids);
            }
            desugar_type(result, ids);
        }
        TypeExprKind::RecordType { fields, .. } => {
            for f in fields {
                desugar_type(&mut f.ty, ids);
            }
        }
    }
}

pub(crate) fn desugar_expr(expr: &mut Expr, ids: &mut IdGen) {
    // Children first, so pipe chains rewrite left-to-right.
    match &mut expr.kind {
        ExprKind::Unary { operand, .. } => desugar_expr(operand, ids),
        ExprKind::Binary { lhs, rhs, .. } => {
            desugar_expr(lhs, ids);
            desugar_expr(rhs, ids);
        }
        ExprKind::Call { callee, args } => {
            desugar_expr(callee, ids);
            for arg in args {
                desugar_expr(arg, ids);
            }
        }
        ExprKind::Index { base, index } => {
            desugar_expr(base, ids);
            desugar_expr(index, ids);
        }
        ExprKind::Field { base, .. } => desugar_expr(base, ids),
        ExprKind::Lambda { body, .. } => desugar_expr(body, ids),
        ExprKind::If { cond, then_branch, else_branch } => {
            desugar_expr(cond, ids);
            desugar_expr(then_branch, ids);
            if let Some(els) = else_branch {
                desugar_expr(els, ids);
            }
        }
        ExprKind::Match { scrutinee, arms } => {
            desugar_expr(scrutinee, ids);
            for arm in arms {
                if let Some(guard) = &mut arm.guard {
                    desugar_expr(guard, ids);
                }
                desugar_expr(&mut arm.body, ids);
            }
        }
        ExprKind::Block(block) => {
            for stmt in &mut block.stmts {
                desugar_stmt(stmt, ids);
            }
            if let Some(value) = &mut block.value {
                desugar_expr(value, ids);
            }
        }
        ExprKind::Array(elems) | ExprKind::Tuple(elems) => {
            for e in elems {
                desugar_expr(e, ids);
            }
        }
        ExprKind::Record { fields } => {
            for f in fields {
                desugar_expr(&mut f.value, ids);
            }
        }
        ExprKind::Range { start, end, .. } => {
            desugar_expr(start, ids);
            desugar_expr(end, ids);
        }
        ExprKind::Propagate(inner) => desugar_expr(inner, ids),
        ExprKind::Literal(_) | ExprKind::Ident(_) => {}
    }

    // Then rewrite this node.
    if matches!(expr.kind, ExprKind::Binary { op: BinaryOp::Pipe, .. }) {
        let ExprKind::Binary { lhs, rhs, .. } =
            mem::replace(&mut expr.kind, ExprKind::Literal(Literal::Unit))
        else {
            unreachable!("checked above");
        };
        expr.kind = ExprKind::Call { callee: rhs, args: vec![*lhs] };
    } else if matches!(expr.kind, ExprKind::Range { .. }) {
        let ExprKind::Range { start, end, inclusive } =
            mem::replace(&mut expr.kind, ExprKind::Literal(Literal::Unit))
        else {
            unreachable!("checked above");
        };
        let callee = Expr {
            id: ids.fresh(),
            span: Span::synthetic(),
            kind: ExprKind::Ident("__range".to_string()),
        };
        let incl = Expr {
            id: ids.fresh(),
            span: Span::synthetic(),
            kind: ExprKind::Literal(Literal::Bool(inclusive)),
        };
        expr.kind = ExprKind::Call {
            callee: Box::new(callee),
            args: vec![*start, *end, incl],
        };
    }
}

fn desugar_stmt(stmt: &mut Stmt, ids: &mut IdGen) {
    match &mut stmt.kind {
        StmtKind::Let { ty, init, .. } => {
            if let Some(ty) = ty {
                desugar_type(ty, ids);
            }
            desugar_expr(init, ids);
        }
        StmtKind::Assign { target, value } => {
            desugar_expr(target, ids);
            desugar_expr(value, ids);
        }
        StmtKind::Expr(expr) => desugar_expr(expr, ids),
        StmtKind::For { iter, body, .. } => {
            desugar_expr(iter, ids);
            desugar_expr(body, ids);
        }
        StmtKind::While { cond, body } => {
            desugar_expr(cond, ids);
            desugar_expr(body, ids);
        }
        StmtKind::Loop { body } => desugar_expr(body, ids),
        StmtKind::Return(value) => {
            if let Some(v) = value {
                desugar_expr(v, ids);
            }
        }
        StmtKind::Break | StmtKind::Continue => {}
        StmtKind::Assert { cond, message } => {
            desugar_expr(cond, ids);
            if let Some(m) = message {
                desugar_expr(m, ids);
            }
        }
    }
}
