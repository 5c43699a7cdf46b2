//! Fresh-id deep clone of the AST.
//!
//! Passes that must not mutate their input (the canonicalizer) and
//! builders that splice separately-parsed fragments into one tree (the
//! JSON deserializer) both need a structurally identical copy whose
//! nodes carry fresh ids from the caller's allocator. Spans are
//! preserved.

use super::{
    Block, Decl, DeclKind, Expr, ExprKind, ExternalFnDecl, FnDecl, IdGen, MatchArm, Param,
    Pattern, PatternKind, Program, RecordExprField, RecordPatternField, RecordField,
    RecordTypeField, Stmt, StmtKind, TypeExpr, TypeExprKind, Variant, VariantFields,
};

pub fn clone_program(program: &Program, ids: &mut IdGen) -> Program {
    Program {
        id: ids.fresh(),
        span: program.span.clone(),
        decls: program.decls.iter().map(|d| clone_decl(d, ids)).collect(),
    }
}

pub fn clone_decl(decl: &Decl, ids: &mut IdGen) -> Decl {
    let kind = match &decl.kind {
        DeclKind::Module { path } => DeclKind::Module { path: path.clone() },
        DeclKind::Use { path, items, alias, external } => DeclKind::Use {
            path: path.clone(),
            items: items.clone(),
            alias: alias.clone(),
            external: *external,
        },
        DeclKind::TypeAlias { name, params, ty } => DeclKind::TypeAlias {
            name: name.clone(),
            params: params.clone(),
            ty: clone_type(ty, ids),
        },
        DeclKind::Record { name, params, fields } => DeclKind::Record {
            name: name.clone(),
            params: params.clone(),
            fields: fields.iter().map(|f| clone_record_field(f, ids)).collect(),
        },
        DeclKind::Sum { name, params, variants } => DeclKind::Sum {
            name: name.clone(),
            params: params.clone(),
            variants: variants.iter().map(|v| clone_variant(v, ids)).collect(),
        },
        DeclKind::Function(f) => DeclKind::Function(FnDecl {
            name: f.name.clone(),
            type_params: f.type_params.clone(),
            params: f.params.iter().map(|p| clone_param(p, ids)).collect(),
            ret: f.ret.as_ref().map(|t| clone_type(t, ids)),
            body: clone_expr(&f.body, ids),
        }),
        DeclKind::ExternalFn(f) => DeclKind::ExternalFn(clone_external_fn(f, ids)),
        DeclKind::ExternalMod { name, module, fns } => DeclKind::ExternalMod {
            name: name.clone(),
            module: module.clone(),
            fns: fns.iter().map(|d| clone_decl(d, ids)).collect(),
        },
    };
    Decl { id: ids.fresh(), span: decl.span.clone(), kind }
}

fn clone_external_fn(f: &ExternalFnDecl, ids: &mut IdGen) -> ExternalFnDecl {
    ExternalFnDecl {
        name: f.name.clone(),
        type_params: f.type_params.clone(),
        params: f.params.iter().map(|p| clone_param(p, ids)).collect(),
        ret: f.ret.as_ref().map(|t| clone_type(t, ids)),
        host_name: f.host_name.clone(),
    }
}

fn clone_param(param: &Param, ids: &mut IdGen) -> Param {
    Param {
        name: param.name.clone(),
        ty: param.ty.as_ref().map(|t| clone_type(t, ids)),
        span: param.span.clone(),
    }
}

fn clone_record_field(field: &RecordField, ids: &mut IdGen) -> RecordField {
    RecordField {
        name: field.name.clone(),
        ty: clone_type(&field.ty, ids),
        span: field.span.clone(),
    }
}

fn clone_variant(variant: &Variant, ids: &mut IdGen) -> Variant {
    let fields = match &variant.fields {
        VariantFields::Unit => VariantFields::Unit,
        VariantFields::Positional(tys) => {
            VariantFields::Positional(tys.iter().map(|t| clone_type(t, ids)).collect())
        }
        VariantFields::Named(fields) => VariantFields::Named(
            fields.iter().map(|f| clone_record_field(f, ids)).collect(),
        ),
    };
    Variant { name: variant.name.clone(), fields, span: variant.span.clone() }
}

pub fn clone_type(ty: &TypeExpr, ids: &mut IdGen) -> TypeExpr {
    let kind = match &ty.kind {
        TypeExprKind::Named { name, args } => TypeExprKind::Named {
            name: name.clone(),
            args: args.iter().map(|a| clone_type(a, ids)).collect(),
        },
        TypeExprKind::Array(elem) => TypeExprKind::Array(Box::new(clone_type(elem, ids))),
        TypeExprKind::Tuple(elems) => {
            TypeExprKind::Tuple(elems.iter().map(|e| clone_type(e, ids)).collect())
        }
        TypeExprKind::Function { params, ret } => TypeExprKind::Function {
            params: params.iter().map(|p| clone_type(p, ids)).collect(),
            ret: Box::new(clone_type(ret, ids)),
        },
        TypeExprKind::Refined { base, var, pred } => TypeExprKind::Refined {
            base: Box::new(clone_type(base, ids)),
            var: var.clone(),
            pred: Box::new(clone_expr(pred, ids)),
        },
        TypeExprKind::Effect { effects, result } => TypeExprKind::Effect {
            effects: effects.iter().map(|e| clone_type(e, ids)).collect(),
            result: Box::new(clone_type(result, ids)),
        },
        TypeExprKind::RecordType { fields, open } => TypeExprKind::RecordType {
            fields: fields
                .iter()
                .map(|f| RecordTypeField {
                    name: f.name.clone(),
                    ty: clone_type(&f.ty, ids),
                    span: f.span.clone(),
                })
                .collect(),
            open: *open,
        },
    };
    TypeExpr { id: ids.fresh(), span: ty.span.clone(), kind }
}

pub fn clone_expr(expr: &Expr, ids: &mut IdGen) -> Expr {
    let kind = match &expr.kind {
        ExprKind::Literal(lit) => ExprKind::Literal(lit.clone()),
        ExprKind::Ident(name) => ExprKind::Ident(name.clone()),
        ExprKind::Unary { op, operand } => ExprKind::Unary {
            op: *op,
            operand: Box::new(clone_expr(operand, ids)),
        },
        ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
            op: *op,
            lhs: Box::new(clone_expr(lhs, ids)),
            rhs: Box::new(clone_expr(rhs, ids)),
        },
        ExprKind::Call { callee, args } => ExprKind::Call {
            callee: Box::new(clone_expr(callee, ids)),
            args: args.iter().map(|a| clone_expr(a, ids)).collect(),
        },
        ExprKind::Index { base, index } => ExprKind::Index {
            base: Box::new(clone_expr(base, ids)),
            index: Box::new(clone_expr(index, ids)),
        },
        ExprKind::Field { base, name } => ExprKind::Field {
            base: Box::new(clone_expr(base, ids)),
            name: name.clone(),
        },
        ExprKind::Lambda { params, body } => ExprKind::Lambda {
            params: params.iter().map(|p| clone_param(p, ids)).collect(),
            body: Box::new(clone_expr(body, ids)),
        },
        ExprKind::If { cond, then_branch, else_branch } => ExprKind::If {
            cond: Box::new(clone_expr(cond, ids)),
            then_branch: Box::new(clone_expr(then_branch, ids)),
            else_branch: else_branch.as_ref().map(|e| Box::new(clone_expr(e, ids))),
        },
        ExprKind::Match { scrutinee, arms } => ExprKind::Match {
            scrutinee: Box::new(clone_expr(scrutinee, ids)),
            arms: arms
                .iter()
                .map(|arm| MatchArm {
                    pattern: clone_pattern(&arm.pattern, ids),
                    guard: arm.guard.as_ref().map(|g| clone_expr(g, ids)),
                    body: clone_expr(&arm.body, ids),
                    span: arm.span.clone(),
                })
                .collect(),
        },
        ExprKind::Block(block) => ExprKind::Block(clone_block(block, ids)),
        ExprKind::Array(elems) => {
            ExprKind::Array(elems.iter().map(|e| clone_expr(e, ids)).collect())
        }
        ExprKind::Tuple(elems) => {
            ExprKind::Tuple(elems.iter().map(|e| clone_expr(e, ids)).collect())
        }
        ExprKind::Record { fields } => ExprKind::Record {
            fields: fields
                .iter()
                .map(|f| RecordExprField {
                    name: f.name.clone(),
                    value: clone_expr(&f.value, ids),
                    span: f.span.clone(),
                })
                .collect(),
        },
        ExprKind::Range { start, end, inclusive } => ExprKind::Range {
            start: Box::new(clone_expr(start, ids)),
            end: Box::new(clone_expr(end, ids)),
            inclusive: *inclusive,
        },
        ExprKind::Propagate(inner) => ExprKind::Propagate(Box::new(clone_expr(inner, ids))),
    };
    Expr { id: ids.fresh(), span: expr.span.clone(), kind }
}

pub fn clone_block(block: &Block, ids: &mut IdGen) -> Block {
    Block {
        stmts: block.stmts.iter().map(|s| clone_stmt(s, ids)).collect(),
        value: block.value.as_ref().map(|v| Box::new(clone_expr(v, ids))),
    }
}

pub fn clone_stmt(stmt: &Stmt, ids: &mut IdGen) -> Stmt {
    let kind = match &stmt.kind {
        StmtKind::Let { pattern, ty, mutable, init } => StmtKind::Let {
            pattern: clone_pattern(pattern, ids),
            ty: ty.as_ref().map(|t| clone_type(t, ids)),
            mutable: *mutable,
            init: clone_expr(init, ids),
        },
        StmtKind::Assign { target, value } => StmtKind::Assign {
            target: clone_expr(target, ids),
            value: clone_expr(value, ids),
        },
        StmtKind::Expr(expr) => StmtKind::Expr(clone_expr(expr, ids)),
        StmtKind::For { binding, iter, body } => StmtKind::For {
            binding: clone_pattern(binding, ids),
            iter: clone_expr(iter, ids),
            body: clone_expr(body, ids),
        },
        StmtKind::While { cond, body } => StmtKind::While {
            cond: clone_expr(cond, ids),
            body: clone_expr(body, ids),
        },
        StmtKind::Loop { body } => StmtKind::Loop { body: clone_expr(body, ids) },
        StmtKind::Return(value) => {
            StmtKind::Return(value.as_ref().map(|v| clone_expr(v, ids)))
        }
        StmtKind::Break => StmtKind::Break,
        StmtKind::Continue => StmtKind::Continue,
        StmtKind::Assert { cond, message } => StmtKind::Assert {
            cond: clone_expr(cond, ids),
            message: message.as_ref().map(|m| clone_expr(m, ids)),
        },
    };
    Stmt { id: ids.fresh(), span: stmt.span.clone(), kind }
}

pub fn clone_pattern(pattern: &Pattern, ids: &mut IdGen) -> Pattern {
    let kind = match &pattern.kind {
        PatternKind::Wildcard => PatternKind::Wildcard,
        PatternKind::Ident(name) => PatternKind::Ident(name.clone()),
        PatternKind::Literal(lit) => PatternKind::Literal(lit.clone()),
        PatternKind::Tuple(elems) => {
            PatternKind::Tuple(elems.iter().map(|e| clone_pattern(e, ids)).collect())
        }
        PatternKind::Record { fields } => PatternKind::Record {
            fields: fields
                .iter()
                .map(|f| RecordPatternField {
                    name: f.name.clone(),
                    pattern: f.pattern.as_ref().map(|p| clone_pattern(p, ids)),
                    span: f.span.clone(),
                })
                .collect(),
        },
        PatternKind::Variant { name, args } => PatternKind::Variant {
            name: name.clone(),
            args: args.iter().map(|a| clone_pattern(a, ids)).collect(),
        },
    };
    Pattern { id: ids.fresh(), span: pattern.span.clone(), kind }
}
