//! Effect annotation.
//!
//! Walks the canonical AST and computes, for every expression and
//! statement node, the union of its children's effect sets, adding `Err`
//! at `?`, `Mut` at assignments, and the declared effect set of any
//! identifier callee. The result is a side table for the back-end; the
//! tree itself is untouched.

use rustc_hash::FxHashMap;
use serde::Serialize;

use rill_parser::ast::{
    BinaryOp, Block, DeclKind, Expr, ExprKind, NodeId, Program, Stmt, StmtKind,
};
use rill_typeck::effects::EffectSet;

/// Per-node effect summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectAnnotation {
    pub effects: EffectSet,
    pub has_io: bool,
    pub has_err: bool,
    pub has_async: bool,
    pub has_mut: bool,
}

impl EffectAnnotation {
    fn from_set(effects: EffectSet) -> Self {
        EffectAnnotation {
            effects,
            has_io: effects.contains(EffectSet::IO),
            has_err: effects.contains(EffectSet::ERR),
            has_async: effects.contains(EffectSet::ASYNC),
            has_mut: effects.contains(EffectSet::MUT),
        }
    }
}

pub(crate) fn annotate_program(
    program: &Program,
    effect_info: Option<&FxHashMap<String, EffectSet>>,
) -> FxHashMap<NodeId, EffectAnnotation> {
    let empty = FxHashMap::default();
    let declared = effect_info.unwrap_or(&empty);
    let mut table = FxHashMap::default();
    for decl in &program.decls {
        if let DeclKind::Function(f) = &decl.kind {
            annotate_expr(&f.body, declared, &mut table);
        }
    }
    table
}

fn annotate_expr(
    expr: &Expr,
    declared: &FxHashMap<String, EffectSet>,
    table: &mut FxHashMap<NodeId, EffectAnnotation>,
) -> EffectSet {
    let mut set = EffectSet::empty();
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Ident(_) => {}
        ExprKind::Unary { operand, .. } => {
            set.insert(annotate_expr(operand, declared, table));
        }
        ExprKind::Binary { op, lhs, rhs } => {
            set.insert(annotate_expr(lhs, declared, table));
            set.insert(annotate_expr(rhs, declared, table));
            // An undesugared pipe is a call to its right-hand side.
            if *op == BinaryOp::Pipe {
                if let ExprKind::Ident(name) = &rhs.kind {
                    if let Some(&callee) = declared.get(name) {
                        set.insert(callee);
                    }
                }
            }
        }
        ExprKind::Call { callee, args } => {
            set.insert(annotate_expr(callee, declared, table));
            for arg in args {
                set.insert(annotate_expr(arg, declared, table));
            }
            if let ExprKind::Ident(name) = &callee.kind {
                if let Some(&callee_effects) = declared.get(name) {
                    set.insert(callee_effects);
                }
            }
        }
        ExprKind::Index { base, index } => {
            set.insert(annotate_expr(base, declared, table));
            set.insert(annotate_expr(index, declared, table));
        }
        ExprKind::Field { base, .. } => {
            set.insert(annotate_expr(base, declared, table));
        }
        ExprKind::Lambda { body, .. } => {
            set.insert(annotate_expr(body, declared, table));
        }
        ExprKind::If { cond, then_branch, else_branch } => {
            set.insert(annotate_expr(cond, declared, table));
            set.insert(annotate_expr(then_branch, declared, table));
            if let Some(els) = else_branch {
                set.insert(annotate_expr(els, declared, table));
            }
        }
        ExprKind::Match { scrutinee, arms } => {
            set.insert(annotate_expr(scrutinee, declared, table));
            for arm in arms {
                if let Some(guard) = &arm.guard {
                    set.insert(annotate_expr(guard, declared, table));
                }
                set.insert(annotate_expr(&arm.body, declared, table));
            }
        }
        ExprKind::Block(block) => {
            set.insert(annotate_block(block, declared, table));
        }
        ExprKind::Array(elems) | ExprKind::Tuple(elems) => {
            for e in elems {
                set.insert(annotate_expr(e, declared, table));
            }
        }
        ExprKind::Record { fields } => {
            for f in fields {
                set.insert(annotate_expr(&f.value, declared, table));
            }
        }
        ExprKind::Range { start, end, .. } => {
            set.insert(annotate_expr(start, declared, table));
            set.insert(annotate_expr(end, declared, table));
        }
        ExprKind::Propagate(inner) => {
            set.insert(EffectSet::ERR);
            set.insert(annotate_expr(inner, declared, table));
        }
    }
    table.insert(expr.id, EffectAnnotation::from_set(set));
    set
}

fn annotate_block(
    block: &Block,
    declared: &FxHashMap<String, EffectSet>,
    table: &mut FxHashMap<NodeId, EffectAnnotation>,
) -> EffectSet {
    let mut set = EffectSet::empty();
    for stmt in &block.stmts {
        set.insert(annotate_stmt(stmt, declared, table));
    }
    if let Some(value) = &block.value {
        set.insert(annotate_expr(value, declared, table));
    }
    set
}

fn annotate_stmt(
    stmt: &Stmt,
    declared: &FxHashMap<String, EffectSet>,
    table: &mut FxHashMap<NodeId, EffectAnnotation>,
) -> EffectSet {
    let mut set = EffectSet::empty();
    match &stmt.kind {
        StmtKind::Let { init, .. } => {
            set.insert(annotate_expr(init, declared, table));
        }
        StmtKind::Assign { target, value } => {
            set.insert(EffectSet::MUT);
            set.insert(annotate_expr(target, declared, table));
            set.insert(annotate_expr(value, declared, table));
        }
        StmtKind::Expr(expr) => {
            set.insert(annotate_expr(expr, declared, table));
        }
        StmtKind::For { iter, body, .. } => {
            set.insert(annotate_expr(iter, declared, table));
            set.insert(annotate_expr(body, declared, table));
        }
        StmtKind::While { cond, body } => {
            set.insert(annotate_expr(cond, declared, table));
            set.insert(annotate_expr(body, declared, table));
        }
        StmtKind::Loop { body } => {
            set.insert(annotate_expr(body, declared, table));
        }
        StmtKind::Return(value) => {
            if let Some(v) = value {
                set.insert(annotate_expr(v, declared, table));
            }
        }
        StmtKind::Break | StmtKind::Continue => {}
        StmtKind::Assert { cond, message } => {
            set.insert(annotate_expr(cond, declared, table));
            if let Some(m) = message {
                set.insert(annotate_expr(m, declared, table));
            }
        }
    }
    table.insert(stmt.id, EffectAnnotation::from_set(set));
    set
}
