//! Validator insertion at external-function boundaries.
//!
//! Values crossing back from the host runtime are untrusted; each call
//! whose callee is a declared external function is wrapped in
//! `__validate_T(...)`, where `T` is derived from the callee's declared
//! return type. Already-wrapped calls are left alone, which keeps the
//! phase idempotent.

use std::mem;

use rustc_hash::FxHashMap;
use serde::Serialize;

use rill_common::span::Span;
use rill_parser::ast::{
    DeclKind, Expr, ExprKind, IdGen, Literal, NodeId, Program, Stmt, StmtKind, TypeExpr,
    TypeExprKind,
};
use rill_typeck::effects::split_effect_row;
use rill_typeck::ty::Ty;
use rill_typeck::FnSig;

const VALIDATOR_PREFIX: &str = "__validate_";

/// Record of one inserted validator, for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatorInsertion {
    /// Id of the wrapped call node (in the canonical tree).
    pub original_call: NodeId,
    /// Name of the inserted helper, e.g. `__validate_int`.
    pub validator: String,
    pub span: Span,
}

pub(crate) fn insert_validators(
    program: &mut Program,
    ids: &mut IdGen,
    type_info: Option<&FxHashMap<String, FnSig>>,
) -> Vec<ValidatorInsertion> {
    let validators = collect_external_validators(program, type_info);
    let mut log = Vec::new();
    for decl in &mut program.decls {
        if let DeclKind::Function(f) = &mut decl.kind {
            visit_expr(&mut f.body, ids, &validators, &mut log, false);
        }
    }
    log
}

/// Map each external function name to its validator helper name.
///
/// Return types come from the checker's signature table when provided;
/// otherwise they are derived from the program's own external
/// declarations.
fn collect_external_validators(
    program: &Program,
    type_info: Option<&FxHashMap<String, FnSig>>,
) -> FxHashMap<String, String> {
    let mut map = FxHashMap::default();
    for decl in &program.decls {
        match &decl.kind {
            DeclKind::ExternalFn(ext) => {
                map.insert(ext.name.clone(), validator_for(&ext.name, ext.ret.as_ref(), type_info));
            }
            DeclKind::ExternalMod { fns, .. } => {
                for inner in fns {
                    if let DeclKind::ExternalFn(ext) = &inner.kind {
                        map.insert(
                            ext.name.clone(),
                            validator_for(&ext.name, ext.ret.as_ref(), type_info),
                        );
                    }
                }
            }
            _ => {}
        }
    }
    map
}

fn validator_for(
    name: &str,
    declared_ret: Option<&TypeExpr>,
    type_info: Option<&FxHashMap<String, FnSig>>,
) -> String {
    if let Some(sig) = type_info.and_then(|m| m.get(name)) {
        return format!("{VALIDATOR_PREFIX}{}", suffix_from_ty(&sig.ret));
    }
    let (_, result) = split_effect_row(declared_ret);
    let suffix = match &result {
        Some(te) => suffix_from_type_expr(te),
        None => "unit".to_string(),
    };
    format!("{VALIDATOR_PREFIX}{suffix}")
}

fn suffix_from_ty(ty: &Ty) -> String {
    match ty {
        Ty::Refined { base, .. } => suffix_from_ty(base),
        Ty::Con(con) => scalar_suffix(&con.name),
        Ty::App(con, _) => match con.as_ref() {
            Ty::Con(con) => scalar_suffix(&con.name),
            _ => "value".to_string(),
        },
        Ty::Array(_) => "array".to_string(),
        Ty::Tuple(_) => "tuple".to_string(),
        Ty::Record { .. } => "record".to_string(),
        Ty::Fun { .. } => "fn".to_string(),
        Ty::Var(_) | Ty::Never => "value".to_string(),
    }
}

fn suffix_from_type_expr(te: &TypeExpr) -> String {
    match &te.kind {
        TypeExprKind::Named { name, .. } => scalar_suffix(name),
        TypeExprKind::Array(_) => "array".to_string(),
        TypeExprKind::Tuple(_) => "tuple".to_string(),
        TypeExprKind::Function { .. } => "fn".to_string(),
        TypeExprKind::Refined { base, .. } => suffix_from_type_expr(base),
        TypeExprKind::Effect { result, .. } => suffix_from_type_expr(result),
        TypeExprKind::RecordType { .. } => "record".to_string(),
    }
}

fn scalar_suffix(name: &str) -> String {
    match name {
        "Int" | "Int32" | "Int64" | "Nat" => "int".to_string(),
        "Float" => "float".to_string(),
        "Bool" => "bool".to_string(),
        "Str" => "str".to_string(),
        "Unit" => "unit".to_string(),
        other => other.to_lowercase(),
    }
}

/// Post-order walk; `skip_wrap` is set for the direct argument of an
/// existing validator call so re-canonicalization does not double-wrap.
fn visit_expr(
    expr: &mut Expr,
    ids: &mut IdGen,
    validators: &FxHashMap<String, String>,
    log: &mut Vec<ValidatorInsertion>,
    skip_wrap: bool,
) {
    let is_validator_call = matches!(
        &expr.kind,
        ExprKind::Call { callee, .. }
            if matches!(&callee.kind, ExprKind::Ident(name) if name.starts_with(VALIDATOR_PREFIX))
    );

    match &mut expr.kind {
        ExprKind::Unary { operand, .. } => visit_expr(operand, ids, validators, log, false),
        ExprKind::Binary { lhs, rhs, .. } => {
            visit_expr(lhs, ids, validators, log, false);
            visit_expr(rhs, ids, validators, log, false);
        }
        ExprKind::Call { callee, args } => {
            visit_expr(callee, ids, validators, log, false);
            for arg in args {
                visit_expr(arg, ids, validators, log, is_validator_call);
            }
        }
        ExprKind::Index { base, index } => {
            visit_expr(base, ids, validators, log, false);
            visit_expr(index, ids, validators, log, false);
        }
        ExprKind::Field { base, .. } => visit_expr(base, ids, validators, log, false),
        ExprKind::Lambda { body, .. } => visit_expr(body, ids, validators, log, false),
        ExprKind::If { cond, then_branch, else_branch } => {
            visit_expr(cond, ids, validators, log, false);
            visit_expr(then_branch, ids, validators, log, false);
            if let Some(els) = else_branch {
                visit_expr(els, ids, validators, log, false);
            }
        }
        ExprKind::Match { scrutinee, arms } => {
            visit_expr(scrutinee, ids, validators, log, false);
            for arm in arms {
                if let Some(guard) = &mut arm.guard {
                    visit_expr(guard, ids, validators, log, false);
                }
                visit_expr(&mut arm.body, ids, validators, log, false);
            }
        }
        ExprKind::Block(block) => {
            for stmt in &mut block.stmts {
                visit_stmt(stmt, ids, validators, log);
            }
            if let Some(value) = &mut block.value {
                visit_expr(value, ids, validators, log, false);
            }
        }
        ExprKind::Array(elems) | ExprKind::Tuple(elems) => {
            for e in elems {
                visit_expr(e, ids, validators, log, false);
            }
        }
        ExprKind::Record { fields } => {
            for f in fields {
                visit_expr(&mut f.value, ids, validators, log, false);
            }
        }
        ExprKind::Range { start, end, .. } => {
            visit_expr(start, ids, validators, log, false);
            visit_expr(end, ids, validators, log, false);
        }
        ExprKind::Propagate(inner) => visit_expr(inner, ids, validators, log, false),
        ExprKind::Literal(_) | ExprKind::Ident(_) => {}
    }

    if skip_wrap {
        return;
    }
    let validator = match &expr.kind {
        ExprKind::Call { callee, .. } => match &callee.kind {
            ExprKind::Ident(name) => validators.get(name).cloned(),
            _ => None,
        },
        _ => None,
    };
    let Some(validator) = validator else {
        return;
    };

    let span = expr.span.clone();
    let inner = mem::replace(
        expr,
        Expr {
            id: NodeId(0),
            span: Span::synthetic(),
            kind: ExprKind::Literal(Literal::Unit),
        },
    );
    log.push(ValidatorInsertion {
        original_call: inner.id,
        validator: validator.clone(),
        span: span.clone(),
    });
    let callee = Expr {
        id: ids.fresh(),
        span: Span::synthetic(),
        kind: ExprKind::Ident(validator),
    };
    *expr = Expr {
        id: ids.fresh(),
        span,
        kind: ExprKind::Call { callee: Box::new(callee), args: vec![inner] },
    };
}

fn visit_stmt(
    stmt: &mut Stmt,
    ids: &mut IdGen,
    validators: &FxHashMap<String, String>,
    log: &mut Vec<ValidatorInsertion>,
) {
    match &mut stmt.kind {
        StmtKind::Let { init, .. } => visit_expr(init, ids, validators, log, false),
        StmtKind::Assign { target, value } => {
            visit_expr(target, ids, validators, log, false);
            visit_expr(value, ids, validators, log, false);
        }
        StmtKind::Expr(expr) => visit_expr(expr, ids, validators, log, false),
        StmtKind::For { iter, body, .. } => {
            visit_expr(iter, ids, validators, log, false);
            visit_expr(body, ids, validators, log, false);
        }
        StmtKind::While { cond, body } => {
            visit_expr(cond, ids, validators, log, false);
            visit_expr(body, ids, validators, log, false);
        }
        StmtKind::Loop { body } => visit_expr(body, ids, validators, log, false),
        StmtKind::Return(value) => {
            if let Some(v) = value {
                visit_expr(v, ids, validators, log, false);
            }
        }
        StmtKind::Break | StmtKind::Continue => {}
        StmtKind::Assert { cond, message } => {
            visit_expr(cond, ids, validators, log, false);
            if let Some(m) = message {
                visit_expr(m, ids, validators, log, false);
            }
        }
    }
}
