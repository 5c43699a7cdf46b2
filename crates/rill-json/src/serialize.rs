//! AST -> JSON serialization.
//!
//! Every node object carries a `kind` tag plus the variant's structural
//! fields. Node ids are not serialized (they are session-local). Spans
//! are included by default as `{file, start, end}` with full
//! line/column/offset positions. Integer literals serialize as decimal
//! strings so arbitrary precision survives. Empty lists and absent
//! optional fields are omitted.

use serde_json::{json, Map, Value};

use rill_common::span::Span;
use rill_parser::ast::{
    Block, Decl, DeclKind, Expr, ExprKind, ExternalFnDecl, Literal, MatchArm, Param, Pattern,
    PatternKind, Program, RecordField, Stmt, StmtKind, TypeExpr, TypeExprKind, Variant,
    VariantFields,
};

/// Serialization options.
#[derive(Debug, Clone, Copy)]
pub struct SerializeOptions {
    pub include_spans: bool,
    pub pretty: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        SerializeOptions { include_spans: true, pretty: false }
    }
}

/// Serialize a program to a JSON string.
pub fn serialize_program(program: &Program, options: &SerializeOptions) -> String {
    let value = program_to_json(program, options);
    if options.pretty {
        serde_json::to_string_pretty(&value).expect("AST JSON cannot fail to serialize")
    } else {
        serde_json::to_string(&value).expect("AST JSON cannot fail to serialize")
    }
}

/// Serialize a program to a JSON value.
pub fn program_to_json(program: &Program, options: &SerializeOptions) -> Value {
    let mut obj = node("program", &program.span, options);
    obj.insert(
        "decls".to_string(),
        Value::Array(program.decls.iter().map(|d| decl_to_json(d, options)).collect()),
    );
    Value::Object(obj)
}

fn node(kind: &str, span: &Span, options: &SerializeOptions) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("kind".to_string(), Value::String(kind.to_string()));
    if options.include_spans && !span.is_synthetic() {
        obj.insert("span".to_string(), span_to_json(span));
    }
    obj
}

fn span_to_json(span: &Span) -> Value {
    json!({
        "file": &*span.file,
        "start": {"line": span.start.line, "column": span.start.column, "offset": span.start.offset},
        "end": {"line": span.end.line, "column": span.end.column, "offset": span.end.offset},
    })
}

fn push_list(obj: &mut Map<String, Value>, key: &str, items: Vec<Value>) {
    if !items.is_empty() {
        obj.insert(key.to_string(), Value::Array(items));
    }
}

fn push_strings(obj: &mut Map<String, Value>, key: &str, items: &[String]) {
    if !items.is_empty() {
        obj.insert(
            key.to_string(),
            Value::Array(items.iter().map(|s| Value::String(s.clone())).collect()),
        );
    }
}

// ── Declarations ───────────────────────────────────────────────────────

pub(crate) fn decl_to_json(decl: &Decl, options: &SerializeOptions) -> Value {
    let mut obj;
    match &decl.kind {
        DeclKind::Module { path } => {
            obj = node("module", &decl.span, options);
            push_strings(&mut obj, "path", path);
        }
        DeclKind::Use { path, items, alias, external } => {
            obj = node("use", &decl.span, options);
            push_strings(&mut obj, "path", path);
            if let Some(items) = items {
                obj.insert(
                    "items".to_string(),
                    Value::Array(items.iter().map(|s| Value::String(s.clone())).collect()),
                );
            }
            if let Some(alias) = alias {
                obj.insert("alias".to_string(), Value::String(alias.clone()));
            }
            if *external {
                obj.insert("external".to_string(), Value::Bool(true));
            }
        }
        DeclKind::TypeAlias { name, params, ty } => {
            obj = node("type_alias", &decl.span, options);
            obj.insert("name".to_string(), Value::String(name.clone()));
            push_strings(&mut obj, "params", params);
            obj.insert("ty".to_string(), type_to_json(ty, options));
        }
        DeclKind::Record { name, params, fields } => {
            obj = node("record", &decl.span, options);
            obj.insert("name".to_string(), Value::String(name.clone()));
            push_strings(&mut obj, "params", params);
            push_list(
                &mut obj,
                "fields",
                fields.iter().map(|f| record_field_to_json(f, options)).collect(),
            );
        }
        DeclKind::Sum { name, params, variants } => {
            obj = node("sum", &decl.span, options);
            obj.insert("name".to_string(), Value::String(name.clone()));
            push_strings(&mut obj, "params", params);
            push_list(
                &mut obj,
                "variants",
                variants.iter().map(|v| variant_to_json(v, options)).collect(),
            );
        }
        DeclKind::Function(f) => {
            obj = node("function", &decl.span, options);
            obj.insert("name".to_string(), Value::String(f.name.clone()));
            push_strings(&mut obj, "type_params", &f.type_params);
            push_list(
                &mut obj,
                "params",
                f.params.iter().map(|p| param_to_json(p, options)).collect(),
            );
            if let Some(ret) = &f.ret {
                obj.insert("ret".to_string(), type_to_json(ret, options));
            }
            obj.insert("body".to_string(), expr_to_json(&f.body, options));
        }
        DeclKind::ExternalFn(f) => {
            obj = external_fn_to_json(f, &decl.span, options);
        }
        DeclKind::ExternalMod { name, module, fns } => {
            obj = node("external_mod", &decl.span, options);
            obj.insert("name".to_string(), Value::String(name.clone()));
            obj.insert("module".to_string(), Value::String(module.clone()));
            push_list(
                &mut obj,
                "fns",
                fns.iter().map(|d| decl_to_json(d, options)).collect(),
            );
        }
    }
    Value::Object(obj)
}

fn external_fn_to_json(
    f: &ExternalFnDecl,
    span: &Span,
    options: &SerializeOptions,
) -> Map<String, Value> {
    let mut obj = node("external_fn", span, options);
    obj.insert("name".to_string(), Value::String(f.name.clone()));
    push_strings(&mut obj, "type_params", &f.type_params);
    push_list(
        &mut obj,
        "params",
        f.params.iter().map(|p| param_to_json(p, options)).collect(),
    );
    if let Some(ret) = &f.ret {
        obj.insert("ret".to_string(), type_to_json(ret, options));
    }
    obj.insert("host_name".to_string(), Value::String(f.host_name.clone()));
    obj
}

fn param_to_json(param: &Param, options: &SerializeOptions) -> Value {
    let mut obj = Map::new();
    obj.insert("name".to_string(), Value::String(param.name.clone()));
    if let Some(ty) = &param.ty {
        obj.insert("ty".to_string(), type_to_json(ty, options));
    }
    Value::Object(obj)
}

fn record_field_to_json(field: &RecordField, options: &SerializeOptions) -> Value {
    json!({
        "name": field.name,
        "ty": type_to_json(&field.ty, options),
    })
}

fn variant_to_json(variant: &Variant, options: &SerializeOptions) -> Value {
    let mut obj = Map::new();
    obj.insert("name".to_string(), Value::String(variant.name.clone()));
    match &variant.fields {
        VariantFields::Unit => {}
        VariantFields::Positional(tys) => {
            push_list(
                &mut obj,
                "fields",
                tys.iter().map(|t| type_to_json(t, options)).collect(),
            );
        }
        VariantFields::Named(fields) => {
            push_list(
                &mut obj,
                "named_fields",
                fields.iter().map(|f| record_field_to_json(f, options)).collect(),
            );
        }
    }
    Value::Object(obj)
}

// ── Type expressions ───────────────────────────────────────────────────

pub(crate) fn type_to_json(ty: &TypeExpr, options: &SerializeOptions) -> Value {
    let mut obj;
    match &ty.kind {
        TypeExprKind::Named { name, args } => {
            obj = node("named", &ty.span, options);
            obj.insert("name".to_string(), Value::String(name.clone()));
            push_list(
                &mut obj,
                "args",
                args.iter().map(|a| type_to_json(a, options)).collect(),
            );
        }
        TypeExprKind::Array(elem) => {
            obj = node("array", &ty.span, options);
            obj.insert("elem".to_string(), type_to_json(elem, options));
        }
        TypeExprKind::Tuple(elems) => {
            obj = node("tuple", &ty.span, options);
            push_list(
                &mut obj,
                "elems",
                elems.iter().map(|e| type_to_json(e, options)).collect(),
            );
        }
        TypeExprKind::Function { params, ret } => {
            obj = node("function", &ty.span, options);
            push_list(
                &mut obj,
                "params",
                params.iter().map(|p| type_to_json(p, options)).collect(),
            );
            obj.insert("ret".to_string(), type_to_json(ret, options));
        }
        TypeExprKind::Refined { base, var, pred } => {
            obj = node("refined", &ty.span, options);
            obj.insert("base".to_string(), type_to_json(base, options));
            if let Some(var) = var {
                obj.insert("var".to_string(), Value::String(var.clone()));
            }
            obj.insert("pred".to_string(), expr_to_json(pred, options));
        }
        TypeExprKind::Effect { effects, result } => {
            obj = node("effect", &ty.span, options);
            push_list(
                &mut obj,
                "effects",
                effects.iter().map(|e| type_to_json(e, options)).collect(),
            );
            obj.insert("result".to_string(), type_to_json(result, options));
        }
        TypeExprKind::RecordType { fields, open } => {
            obj = node("record", &ty.span, options);
            push_list(
                &mut obj,
                "fields",
                fields
                    .iter()
                    .map(|f| json!({"name": f.name, "ty": type_to_json(&f.ty, options)}))
                    .collect(),
            );
            if *open {
                obj.insert("open".to_string(), Value::Bool(true));
            }
        }
    }
    Value::Object(obj)
}

// ── Expressions ────────────────────────────────────────────────────────

pub(crate) fn expr_to_json(expr: &Expr, options: &SerializeOptions) -> Value {
    let mut obj;
    match &expr.kind {
        ExprKind::Literal(lit) => {
            obj = literal_to_json(lit, &expr.span, options);
        }
        ExprKind::Ident(name) => {
            obj = node("ident", &expr.span, options);
            obj.insert("name".to_string(), Value::String(name.clone()));
        }
        ExprKind::Unary { op, operand } => {
            obj = node("unary", &expr.span, options);
            obj.insert("op".to_string(), Value::String(op.symbol().to_string()));
            obj.insert("operand".to_string(), expr_to_json(operand, options));
        }
        ExprKind::Binary { op, lhs, rhs } => {
            obj = node("binary", &expr.span, options);
            obj.insert("op".to_string(), Value::String(op.symbol().to_string()));
            obj.insert("lhs".to_string(), expr_to_json(lhs, options));
            obj.insert("rhs".to_string(), expr_to_json(rhs, options));
        }
        ExprKind::Call { callee, args } => {
            obj = node("call", &expr.span, options);
            obj.insert("callee".to_string(), expr_to_json(callee, options));
            push_list(
                &mut obj,
                "args",
                args.iter().map(|a| expr_to_json(a, options)).collect(),
            );
        }
        ExprKind::Index { base, index } => {
            obj = node("index", &expr.span, options);
            obj.insert("base".to_string(), expr_to_json(base, options));
            obj.insert("index".to_string(), expr_to_json(index, options));
        }
        ExprKind::Field { base, name } => {
            obj = node("field", &expr.span, options);
            obj.insert("base".to_string(), expr_to_json(base, options));
            obj.insert("name".to_string(), Value::String(name.clone()));
        }
        ExprKind::Lambda { params, body } => {
            obj = node("lambda", &expr.span, options);
            push_list(
                &mut obj,
                "params",
                params.iter().map(|p| param_to_json(p, options)).collect(),
            );
            obj.insert("body".to_string(), expr_to_json(body, options));
        }
        ExprKind::If { cond, then_branch, else_branch } => {
            obj = node("if", &expr.span, options);
            obj.insert("cond".to_string(), expr_to_json(cond, options));
            obj.insert("then".to_string(), expr_to_json(then_branch, options));
            if let Some(els) = else_branch {
                obj.insert("else".to_string(), expr_to_json(els, options));
            }
        }
        ExprKind::Match { scrutinee, arms } => {
            obj = node("match", &expr.span, options);
            obj.insert("scrutinee".to_string(), expr_to_json(scrutinee, options));
            push_list(
                &mut obj,
                "arms",
                arms.iter().map(|a| arm_to_json(a, options)).collect(),
            );
        }
        ExprKind::Block(block) => {
            obj = node("block", &expr.span, options);
            block_into(&mut obj, block, options);
        }
        ExprKind::Array(elems) => {
            obj = node("array", &expr.span, options);
            push_list(
                &mut obj,
                "elems",
                elems.iter().map(|e| expr_to_json(e, options)).collect(),
            );
        }
        ExprKind::Tuple(elems) => {
            obj = node("tuple", &expr.span, options);
            push_list(
                &mut obj,
                "elems",
                elems.iter().map(|e| expr_to_json(e, options)).collect(),
            );
        }
        ExprKind::Record { fields } => {
            obj = node("record", &expr.span, options);
            push_list(
                &mut obj,
                "fields",
                fields
                    .iter()
                    .map(|f| json!({"name": f.name, "value": expr_to_json(&f.value, options)}))
                    .collect(),
            );
        }
        ExprKind::Range { start, end, inclusive } => {
            obj = node("range", &expr.span, options);
            obj.insert("start".to_string(), expr_to_json(start, options));
            obj.insert("end".to_string(), expr_to_json(end, options));
            if *inclusive {
                obj.insert("inclusive".to_string(), Value::Bool(true));
            }
        }
        ExprKind::Propagate(inner) => {
            obj = node("propagate", &expr.span, options);
            obj.insert("value".to_string(), expr_to_json(inner, options));
        }
    }
    Value::Object(obj)
}

fn literal_to_json(lit: &Literal, span: &Span, options: &SerializeOptions) -> Map<String, Value> {
    match lit {
        Literal::Int { digits, width } => {
            let mut obj = node("int", span, options);
            // Decimal string, preserving arbitrary precision.
            obj.insert("value".to_string(), Value::String(digits.clone()));
            if let Some(width) = width {
                let w = match width {
                    rill_common::token::IntWidth::I32 => "i32",
                    rill_common::token::IntWidth::I64 => "i64",
                };
                obj.insert("width".to_string(), Value::String(w.to_string()));
            }
            obj
        }
        Literal::Float(v) => {
            let mut obj = node("float", span, options);
            obj.insert("value".to_string(), json!(v));
            obj
        }
        Literal::Str(s) => {
            let mut obj = node("str", span, options);
            obj.insert("value".to_string(), Value::String(s.clone()));
            obj
        }
        Literal::TemplateStr(s) => {
            let mut obj = node("template_str", span, options);
            obj.insert("value".to_string(), Value::String(s.clone()));
            obj
        }
        Literal::Bool(v) => {
            let mut obj = node("bool", span, options);
            obj.insert("value".to_string(), Value::Bool(*v));
            obj
        }
        Literal::Unit => node("unit", span, options),
    }
}

fn arm_to_json(arm: &MatchArm, options: &SerializeOptions) -> Value {
    let mut obj = Map::new();
    obj.insert("pattern".to_string(), pattern_to_json(&arm.pattern, options));
    if let Some(guard) = &arm.guard {
        obj.insert("guard".to_string(), expr_to_json(guard, options));
    }
    obj.insert("body".to_string(), expr_to_json(&arm.body, options));
    Value::Object(obj)
}

fn block_into(obj: &mut Map<String, Value>, block: &Block, options: &SerializeOptions) {
    push_list(
        obj,
        "stmts",
        block.stmts.iter().map(|s| stmt_to_json(s, options)).collect(),
    );
    if let Some(value) = &block.value {
        obj.insert("value".to_string(), expr_to_json(value, options));
    }
}

// ── Statements ─────────────────────────────────────────────────────────

pub(crate) fn stmt_to_json(stmt: &Stmt, options: &SerializeOptions) -> Value {
    let mut obj;
    match &stmt.kind {
        StmtKind::Let { pattern, ty, mutable, init } => {
            obj = node("let", &stmt.span, options);
            obj.insert("pattern".to_string(), pattern_to_json(pattern, options));
            if let Some(ty) = ty {
                obj.insert("ty".to_string(), type_to_json(ty, options));
            }
            if *mutable {
                obj.insert("mutable".to_string(), Value::Bool(true));
            }
            obj.insert("init".to_string(), expr_to_json(init, options));
        }
        StmtKind::Assign { target, value } => {
            obj = node("assign", &stmt.span, options);
            obj.insert("target".to_string(), expr_to_json(target, options));
            obj.insert("value".to_string(), expr_to_json(value, options));
        }
        StmtKind::Expr(expr) => {
            obj = node("expr", &stmt.span, options);
            obj.insert("expr".to_string(), expr_to_json(expr, options));
        }
        StmtKind::For { binding, iter, body } => {
            obj = node("for", &stmt.span, options);
            obj.insert("binding".to_string(), pattern_to_json(binding, options));
            obj.insert("iter".to_string(), expr_to_json(iter, options));
            obj.insert("body".to_string(), expr_to_json(body, options));
        }
        StmtKind::While { cond, body } => {
            obj = node("while", &stmt.span, options);
            obj.insert("cond".to_string(), expr_to_json(cond, options));
            obj.insert("body".to_string(), expr_to_json(body, options));
        }
        StmtKind::Loop { body } => {
            obj = node("loop", &stmt.span, options);
            obj.insert("body".to_string(), expr_to_json(body, options));
        }
        StmtKind::Return(value) => {
            obj = node("return", &stmt.span, options);
            if let Some(v) = value {
                obj.insert("value".to_string(), expr_to_json(v, options));
            }
        }
        StmtKind::Break => {
            obj = node("break", &stmt.span, options);
        }
        StmtKind::Continue => {
            obj = node("continue", &stmt.span, options);
        }
        StmtKind::Assert { cond, message } => {
            obj = node("assert", &stmt.span, options);
            obj.insert("cond".to_string(), expr_to_json(cond, options));
            if let Some(m) = message {
                obj.insert("message".to_string(), expr_to_json(m, options));
            }
        }
    }
    Value::Object(obj)
}

// ── Patterns ───────────────────────────────────────────────────────────

pub(crate) fn pattern_to_json(pattern: &Pattern, options: &SerializeOptions) -> Value {
    let mut obj;
    match &pattern.kind {
        PatternKind::Wildcard => {
            obj = node("wildcard", &pattern.span, options);
        }
        PatternKind::Ident(name) => {
            obj = node("binding", &pattern.span, options);
            obj.insert("name".to_string(), Value::String(name.clone()));
        }
        PatternKind::Literal(lit) => {
            obj = literal_to_json(lit, &pattern.span, options);
        }
        PatternKind::Tuple(elems) => {
            obj = node("tuple", &pattern.span, options);
            push_list(
                &mut obj,
                "elems",
                elems.iter().map(|e| pattern_to_json(e, options)).collect(),
            );
        }
        PatternKind::Record { fields } => {
            obj = node("record", &pattern.span, options);
            push_list(
                &mut obj,
                "fields",
                fields
                    .iter()
                    .map(|f| {
                        let mut field = Map::new();
                        field.insert("name".to_string(), Value::String(f.name.clone()));
                        if let Some(sub) = &f.pattern {
                            field.insert(
                                "pattern".to_string(),
                                pattern_to_json(sub, options),
                            );
                        }
                        Value::Object(field)
                    })
                    .collect(),
            );
        }
        PatternKind::Variant { name, args } => {
            obj = node("variant", &pattern.span, options);
            obj.insert("name".to_string(), Value::String(name.clone()));
            push_list(
                &mut obj,
                "args",
                args.iter().map(|a| pattern_to_json(a, options)).collect(),
            );
        }
    }
    Value::Object(obj)
}
