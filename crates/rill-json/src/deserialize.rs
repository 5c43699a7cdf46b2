//! JSON -> AST deserialization with hybrid source fragments.
//!
//! Accepts the schema produced by [`crate::serialize`]. At every
//! recursive position a `{source: "...", file?: "..."}` object may stand
//! in for a structural node; the deserializer runs the lexer and parser
//! on the fragment with the standalone entry point matching the position
//! (declaration, expression, type, pattern, statement). Fragment nodes
//! are renumbered into the deserializer's own id space, so the resulting
//! tree has unique, monotonically assigned ids.
//!
//! Errors never abort: they are aggregated with JSON-path locations and
//! the result reports `ok` only when none occurred.

use serde_json::{Map, Value};

use rill_common::span::{Position, Span};
use rill_common::token::IntWidth;
use rill_parser::ast::{
    fresh, Block, BinaryOp, Decl, DeclKind, Expr, ExprKind, ExternalFnDecl, FnDecl, IdGen,
    Literal, MatchArm, Param, Pattern, PatternKind, Program, RecordExprField, RecordField,
    RecordPatternField, RecordTypeField, Stmt, StmtKind, TypeExpr, TypeExprKind, UnaryOp,
    Variant, VariantFields,
};

/// One deserialization failure, located by JSON path.
#[derive(Debug, Clone, PartialEq)]
pub struct DeserializeError {
    pub path: String,
    pub message: String,
}

/// Result of deserializing a program. `ok` is true iff `errors` is
/// empty (and the program is then present).
#[derive(Debug)]
pub struct DeserializeResult {
    pub ok: bool,
    pub program: Option<Program>,
    pub errors: Vec<DeserializeError>,
}

/// Deserialize from a JSON string.
pub fn deserialize_program_str(json: &str) -> DeserializeResult {
    match serde_json::from_str::<Value>(json) {
        Ok(value) => deserialize_program(&value),
        Err(err) => DeserializeResult {
            ok: false,
            program: None,
            errors: vec![DeserializeError {
                path: "$".to_string(),
                message: format!("invalid JSON: {err}"),
            }],
        },
    }
}

/// Deserialize from a parsed JSON value.
pub fn deserialize_program(json: &Value) -> DeserializeResult {
    let mut de = De { ids: IdGen::new(), errors: Vec::new() };
    let program = de.program(json, "$");
    let ok = de.errors.is_empty() && program.is_some();
    DeserializeResult {
        ok,
        program: if ok { program } else { None },
        errors: de.errors,
    }
}

struct De {
    ids: IdGen,
    errors: Vec<DeserializeError>,
}

impl De {
    fn err<T>(&mut self, path: &str, message: impl Into<String>) -> Option<T> {
        self.errors.push(DeserializeError {
            path: path.to_string(),
            message: message.into(),
        });
        None
    }

    /// Collect errors from a fragment parse under the fragment's path.
    fn fragment_errors(&mut self, path: &str, diags: Vec<rill_common::diagnostics::Diagnostic>) {
        for diag in diags.iter().filter(|d| d.is_error()) {
            self.errors.push(DeserializeError {
                path: path.to_string(),
                message: format!("in source fragment: {}", diag.message),
            });
        }
    }

    // ── Generic helpers ────────────────────────────────────────────────

    fn obj<'v>(&mut self, v: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        match v.as_object() {
            Some(obj) => Some(obj),
            None => self.err(path, "expected a JSON object"),
        }
    }

    fn kind<'v>(&mut self, obj: &'v Map<String, Value>, path: &str) -> Option<&'v str> {
        match obj.get("kind").and_then(Value::as_str) {
            Some(kind) => Some(kind),
            None => self.err(path, "missing `kind` tag"),
        }
    }

    fn str_field(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<String> {
        match obj.get(key).and_then(Value::as_str) {
            Some(s) => Some(s.to_string()),
            None => self.err(path, format!("missing string field `{key}`")),
        }
    }

    fn opt_str(&self, obj: &Map<String, Value>, key: &str) -> Option<String> {
        obj.get(key).and_then(Value::as_str).map(str::to_string)
    }

    fn string_list(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Vec<String> {
        let Some(value) = obj.get(key) else {
            return Vec::new();
        };
        let Some(items) = value.as_array() else {
            let _: Option<()> = self.err(path, format!("`{key}` must be an array of strings"));
            return Vec::new();
        };
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }

    fn span(&mut self, obj: &Map<String, Value>) -> Span {
        let Some(span) = obj.get("span").and_then(Value::as_object) else {
            return Span::synthetic();
        };
        let file = span
            .get("file")
            .and_then(Value::as_str)
            .unwrap_or("<json>");
        let position = |v: Option<&Value>| -> Position {
            let Some(p) = v.and_then(Value::as_object) else {
                return Position::origin();
            };
            let get = |key: &str| p.get(key).and_then(Value::as_u64).unwrap_or(0) as u32;
            Position::new(get("line").max(1), get("column").max(1), get("offset"))
        };
        let start = position(span.get("start"));
        let end = position(span.get("end"));
        if end.offset < start.offset {
            return Span::synthetic();
        }
        Span::new(file.into(), start, end)
    }

    /// A required field; its absence is recorded as an error.
    fn field<'v>(
        &mut self,
        obj: &'v Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<&'v Value> {
        match obj.get(key) {
            Some(v) => Some(v),
            None => self.err(path, format!("missing field `{key}`")),
        }
    }

    /// Required child expression under `obj[key]`.
    fn req_expr(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<Expr> {
        let value = self.field(obj, key, path)?;
        self.expr(value, &format!("{path}.{key}"))
    }

    /// Required child type expression under `obj[key]`.
    fn req_type(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<TypeExpr> {
        let value = self.field(obj, key, path)?;
        self.type_expr(value, &format!("{path}.{key}"))
    }

    /// Required child pattern under `obj[key]`.
    fn req_pattern(&mut self, obj: &Map<String, Value>, key: &str, path: &str) -> Option<Pattern> {
        let value = self.field(obj, key, path)?;
        self.pattern(value, &format!("{path}.{key}"))
    }

    /// A `{source, file?}` object at any recursive position.
    fn fragment<'v>(&self, v: &'v Value) -> Option<(&'v str, String)> {
        let obj = v.as_object()?;
        let source = obj.get("source")?.as_str()?;
        let file = obj
            .get("file")
            .and_then(Value::as_str)
            .unwrap_or("<fragment>")
            .to_string();
        Some((source, file))
    }

    // ── Program ────────────────────────────────────────────────────────

    fn program(&mut self, v: &Value, path: &str) -> Option<Program> {
        let obj = self.obj(v, path)?;
        let kind = self.kind(obj, path)?;
        if kind != "program" {
            return self.err(path, format!("expected kind `program`, found `{kind}`"));
        }
        let id = self.ids.fresh();
        let span = self.span(obj);
        let mut decls = Vec::new();
        if let Some(items) = obj.get("decls") {
            let Some(items) = items.as_array() else {
                return self.err(path, "`decls` must be an array");
            };
            for (i, item) in items.iter().enumerate() {
                let child_path = format!("{path}.decls[{i}]");
                if let Some(decl) = self.decl(item, &child_path) {
                    decls.push(decl);
                }
            }
        }
        Some(Program { id, span, decls })
    }

    // ── Declarations ───────────────────────────────────────────────────

    fn decl(&mut self, v: &Value, path: &str) -> Option<Decl> {
        if let Some((source, file)) = self.fragment(v) {
            let (decl, diags) = rill_parser::parse_declaration_source(&file, source);
            self.fragment_errors(path, diags);
            return decl.map(|d| fresh::clone_decl(&d, &mut self.ids));
        }

        let obj = self.obj(v, path)?.clone();
        let kind = self.kind(&obj, path)?.to_string();
        let id = self.ids.fresh();
        let span = self.span(&obj);

        let kind = match kind.as_str() {
            "module" => DeclKind::Module { path: self.string_list(&obj, "path", path) },
            "use" => DeclKind::Use {
                path: self.string_list(&obj, "path", path),
                items: obj.get("items").map(|_| self.string_list(&obj, "items", path)),
                alias: self.opt_str(&obj, "alias"),
                external: obj.get("external").and_then(Value::as_bool).unwrap_or(false),
            },
            "type_alias" => DeclKind::TypeAlias {
                name: self.str_field(&obj, "name", path)?,
                params: self.string_list(&obj, "params", path),
                ty: self.req_type(&obj, "ty", path)?,
            },
            "record" => DeclKind::Record {
                name: self.str_field(&obj, "name", path)?,
                params: self.string_list(&obj, "params", path),
                fields: self.record_fields(&obj, "fields", path)?,
            },
            "sum" => DeclKind::Sum {
                name: self.str_field(&obj, "name", path)?,
                params: self.string_list(&obj, "params", path),
                variants: self.variants(&obj, path)?,
            },
            "function" => {
                let body_value = match obj.get("body") {
                    Some(b) => b,
                    None => return self.err(path, "function is missing `body`"),
                };
                let body = self.function_body(body_value, &format!("{path}.body"))?;
                DeclKind::Function(FnDecl {
                    name: self.str_field(&obj, "name", path)?,
                    type_params: self.string_list(&obj, "type_params", path),
                    params: self.params(&obj, path)?,
                    ret: self.opt_type(&obj, "ret", path)?,
                    body,
                })
            }
            "external_fn" => DeclKind::ExternalFn(ExternalFnDecl {
                name: self.str_field(&obj, "name", path)?,
                type_params: self.string_list(&obj, "type_params", path),
                params: self.params(&obj, path)?,
                ret: self.opt_type(&obj, "ret", path)?,
                host_name: self.str_field(&obj, "host_name", path)?,
            }),
            "external_mod" => {
                let mut fns = Vec::new();
                if let Some(items) = obj.get("fns").and_then(Value::as_array) {
                    for (i, item) in items.iter().enumerate() {
                        if let Some(decl) = self.decl(item, &format!("{path}.fns[{i}]")) {
                            fns.push(decl);
                        }
                    }
                }
                DeclKind::ExternalMod {
                    name: self.str_field(&obj, "name", path)?,
                    module: self.str_field(&obj, "module", path)?,
                    fns,
                }
            }
            other => return self.err(path, format!("unknown declaration kind `{other}`")),
        };
        Some(Decl { id, span, kind })
    }

    /// A function body position accepts a structural block, any
    /// expression node, or a block source fragment (`{source: "{ ... }"}`).
    fn function_body(&mut self, v: &Value, path: &str) -> Option<Expr> {
        if let Some((source, file)) = self.fragment(v) {
            let (block, diags) = rill_parser::parse_block_source(&file, source);
            self.fragment_errors(path, diags);
            return block.map(|b| fresh::clone_expr(&b, &mut self.ids));
        }
        self.expr(v, path)
    }

    fn params(&mut self, obj: &Map<String, Value>, path: &str) -> Option<Vec<Param>> {
        let Some(items) = obj.get("params") else {
            return Some(Vec::new());
        };
        let Some(items) = items.as_array() else {
            return self.err(path, "`params` must be an array");
        };
        let mut params = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let child_path = format!("{path}.params[{i}]");
            let Some(obj) = self.obj(item, &child_path) else {
                continue;
            };
            let obj = obj.clone();
            let Some(name) = self.str_field(&obj, "name", &child_path) else {
                continue;
            };
            let ty = match obj.get("ty") {
                Some(ty) => Some(self.type_expr(ty, &format!("{child_path}.ty"))?),
                None => None,
            };
            params.push(Param { name, ty, span: Span::synthetic() });
        }
        Some(params)
    }

    fn record_fields(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<Vec<RecordField>> {
        let Some(items) = obj.get(key) else {
            return Some(Vec::new());
        };
        let Some(items) = items.as_array() else {
            return self.err(path, format!("`{key}` must be an array"));
        };
        let mut fields = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let child_path = format!("{path}.{key}[{i}]");
            let Some(field_obj) = self.obj(item, &child_path) else {
                continue;
            };
            let field_obj = field_obj.clone();
            let Some(name) = self.str_field(&field_obj, "name", &child_path) else {
                continue;
            };
            let Some(ty_value) = field_obj.get("ty") else {
                let _: Option<()> = self.err(&child_path, "missing `ty`");
                continue;
            };
            let Some(ty) = self.type_expr(ty_value, &format!("{child_path}.ty")) else {
                continue;
            };
            fields.push(RecordField { name, ty, span: Span::synthetic() });
        }
        Some(fields)
    }

    fn variants(&mut self, obj: &Map<String, Value>, path: &str) -> Option<Vec<Variant>> {
        let Some(items) = obj.get("variants") else {
            return Some(Vec::new());
        };
        let Some(items) = items.as_array() else {
            return self.err(path, "`variants` must be an array");
        };
        let mut variants = Vec::new();
        for (i, item) in items.iter().enumerate() {
            let child_path = format!("{path}.variants[{i}]");
            let Some(variant_obj) = self.obj(item, &child_path) else {
                continue;
            };
            let variant_obj = variant_obj.clone();
            let Some(name) = self.str_field(&variant_obj, "name", &child_path) else {
                continue;
            };
            let fields = if let Some(named) = variant_obj.get("named_fields") {
                let mut wrapper = Map::new();
                wrapper.insert("named_fields".to_string(), named.clone());
                VariantFields::Named(self.record_fields(&wrapper, "named_fields", &child_path)?)
            } else if let Some(positional) = variant_obj.get("fields") {
                let Some(tys) = positional.as_array() else {
                    let _: Option<()> = self.err(&child_path, "`fields` must be an array");
                    continue;
                };
                let mut converted = Vec::new();
                for (j, ty) in tys.iter().enumerate() {
                    if let Some(ty) = self.type_expr(ty, &format!("{child_path}.fields[{j}]")) {
                        converted.push(ty);
                    }
                }
                VariantFields::Positional(converted)
            } else {
                VariantFields::Unit
            };
            variants.push(Variant { name, fields, span: Span::synthetic() });
        }
        Some(variants)
    }

    fn opt_type(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<Option<TypeExpr>> {
        match obj.get(key) {
            Some(v) => Some(Some(self.type_expr(v, &format!("{path}.{key}"))?)),
            None => Some(None),
        }
    }

    // ── Type expressions ───────────────────────────────────────────────

    fn type_expr(&mut self, v: &Value, path: &str) -> Option<TypeExpr> {
        if let Some((source, file)) = self.fragment(v) {
            let (ty, diags) = rill_parser::parse_type_expr_source(&file, source);
            self.fragment_errors(path, diags);
            return ty.map(|t| fresh::clone_type(&t, &mut self.ids));
        }

        let obj = self.obj(v, path)?.clone();
        let kind = self.kind(&obj, path)?.to_string();
        let id = self.ids.fresh();
        let span = self.span(&obj);

        let kind = match kind.as_str() {
            "named" => TypeExprKind::Named {
                name: self.str_field(&obj, "name", path)?,
                args: self.type_list(&obj, "args", path)?,
            },
            "array" => TypeExprKind::Array(Box::new(
                self.req_type(&obj, "elem", path)?,
            )),
            "tuple" => TypeExprKind::Tuple(self.type_list(&obj, "elems", path)?),
            "function" => TypeExprKind::Function {
                params: self.type_list(&obj, "params", path)?,
                ret: Box::new(self.req_type(&obj, "ret", path)?),
            },
            "refined" => TypeExprKind::Refined {
                base: Box::new(self.req_type(&obj, "base", path)?),
                var: self.opt_str(&obj, "var"),
                pred: Box::new(self.req_expr(&obj, "pred", path)?),
            },
            "effect" => TypeExprKind::Effect {
                effects: self.type_list(&obj, "effects", path)?,
                result: Box::new(self.req_type(&obj, "result", path)?),
            },
            "record" => {
                let mut fields = Vec::new();
                if let Some(items) = obj.get("fields").and_then(Value::as_array) {
                    for (i, item) in items.iter().enumerate() {
                        let child_path = format!("{path}.fields[{i}]");
                        let Some(field_obj) = self.obj(item, &child_path) else {
                            continue;
                        };
                        let field_obj = field_obj.clone();
                        let Some(name) = self.str_field(&field_obj, "name", &child_path)
                        else {
                            continue;
                        };
                        let Some(ty_value) = field_obj.get("ty") else {
                            let _: Option<()> = self.err(&child_path, "missing `ty`");
                            continue;
                        };
                        if let Some(ty) =
                            self.type_expr(ty_value, &format!("{child_path}.ty"))
                        {
                            fields.push(RecordTypeField { name, ty, span: Span::synthetic() });
                        }
                    }
                }
                TypeExprKind::RecordType {
                    fields,
                    open: obj.get("open").and_then(Value::as_bool).unwrap_or(false),
                }
            }
            other => return self.err(path, format!("unknown type kind `{other}`")),
        };
        Some(TypeExpr { id, span, kind })
    }

    fn type_list(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<Vec<TypeExpr>> {
        let Some(items) = obj.get(key) else {
            return Some(Vec::new());
        };
        let Some(items) = items.as_array() else {
            return self.err(path, format!("`{key}` must be an array"));
        };
        let mut tys = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if let Some(ty) = self.type_expr(item, &format!("{path}.{key}[{i}]")) {
                tys.push(ty);
            }
        }
        Some(tys)
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn expr(&mut self, v: &Value, path: &str) -> Option<Expr> {
        if let Some((source, file)) = self.fragment(v) {
            let (expr, diags) = rill_parser::parse_expression_source(&file, source);
            self.fragment_errors(path, diags);
            return expr.map(|e| fresh::clone_expr(&e, &mut self.ids));
        }

        let obj = self.obj(v, path)?.clone();
        let kind = self.kind(&obj, path)?.to_string();
        let id = self.ids.fresh();
        let span = self.span(&obj);

        let kind = match kind.as_str() {
            "int" | "float" | "str" | "template_str" | "bool" | "unit" => {
                ExprKind::Literal(self.literal(&kind, &obj, path)?)
            }
            "ident" => ExprKind::Ident(self.str_field(&obj, "name", path)?),
            "unary" => {
                let op = match self.str_field(&obj, "op", path)?.as_str() {
                    "-" => UnaryOp::Neg,
                    "!" => UnaryOp::Not,
                    other => {
                        return self.err(path, format!("unknown unary operator `{other}`"))
                    }
                };
                ExprKind::Unary {
                    op,
                    operand: Box::new(
                        self.req_expr(&obj, "operand", path)?,
                    ),
                }
            }
            "binary" => {
                let op_str = self.str_field(&obj, "op", path)?;
                let Some(op) = binary_op_from_symbol(&op_str) else {
                    return self.err(path, format!("unknown binary operator `{op_str}`"));
                };
                ExprKind::Binary {
                    op,
                    lhs: Box::new(self.req_expr(&obj, "lhs", path)?),
                    rhs: Box::new(self.req_expr(&obj, "rhs", path)?),
                }
            }
            "call" => ExprKind::Call {
                callee: Box::new(self.req_expr(&obj, "callee", path)?),
                args: self.expr_list(&obj, "args", path)?,
            },
            "index" => ExprKind::Index {
                base: Box::new(self.req_expr(&obj, "base", path)?),
                index: Box::new(self.req_expr(&obj, "index", path)?),
            },
            "field" => ExprKind::Field {
                base: Box::new(self.req_expr(&obj, "base", path)?),
                name: self.str_field(&obj, "name", path)?,
            },
            "lambda" => ExprKind::Lambda {
                params: self.params(&obj, path)?,
                body: Box::new(self.req_expr(&obj, "body", path)?),
            },
            "if" => ExprKind::If {
                cond: Box::new(self.req_expr(&obj, "cond", path)?),
                then_branch: Box::new(self.req_expr(&obj, "then", path)?),
                else_branch: match obj.get("else") {
                    Some(els) => Some(Box::new(self.expr(els, &format!("{path}.else"))?)),
                    None => None,
                },
            },
            "match" => {
                let scrutinee =
                    Box::new(self.req_expr(&obj, "scrutinee", path)?);
                let mut arms = Vec::new();
                if let Some(items) = obj.get("arms").and_then(Value::as_array) {
                    for (i, item) in items.iter().enumerate() {
                        let child_path = format!("{path}.arms[{i}]");
                        if let Some(arm) = self.arm(item, &child_path) {
                            arms.push(arm);
                        }
                    }
                }
                ExprKind::Match { scrutinee, arms }
            }
            "block" => ExprKind::Block(self.block(&obj, path)?),
            "array" => ExprKind::Array(self.expr_list(&obj, "elems", path)?),
            "tuple" => ExprKind::Tuple(self.expr_list(&obj, "elems", path)?),
            "record" => {
                let mut fields = Vec::new();
                if let Some(items) = obj.get("fields").and_then(Value::as_array) {
                    for (i, item) in items.iter().enumerate() {
                        let child_path = format!("{path}.fields[{i}]");
                        let Some(field_obj) = self.obj(item, &child_path) else {
                            continue;
                        };
                        let field_obj = field_obj.clone();
                        let Some(name) = self.str_field(&field_obj, "name", &child_path)
                        else {
                            continue;
                        };
                        let Some(value_json) = field_obj.get("value") else {
                            let _: Option<()> = self.err(&child_path, "missing `value`");
                            continue;
                        };
                        if let Some(value) =
                            self.expr(value_json, &format!("{child_path}.value"))
                        {
                            fields.push(RecordExprField {
                                name,
                                value,
                                span: Span::synthetic(),
                            });
                        }
                    }
                }
                ExprKind::Record { fields }
            }
            "range" => ExprKind::Range {
                start: Box::new(self.req_expr(&obj, "start", path)?),
                end: Box::new(self.req_expr(&obj, "end", path)?),
                inclusive: obj.get("inclusive").and_then(Value::as_bool).unwrap_or(false),
            },
            "propagate" => ExprKind::Propagate(Box::new(
                self.req_expr(&obj, "value", path)?,
            )),
            other => return self.err(path, format!("unknown expression kind `{other}`")),
        };
        Some(Expr { id, span, kind })
    }

    fn literal(&mut self, kind: &str, obj: &Map<String, Value>, path: &str) -> Option<Literal> {
        match kind {
            "int" => {
                let digits = self.str_field(obj, "value", path)?;
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return self.err(path, format!("invalid integer value `{digits}`"));
                }
                let width = match obj.get("width").and_then(Value::as_str) {
                    Some("i32") => Some(IntWidth::I32),
                    Some("i64") => Some(IntWidth::I64),
                    Some(other) => {
                        return self.err(path, format!("unknown integer width `{other}`"))
                    }
                    None => None,
                };
                Some(Literal::Int { digits, width })
            }
            "float" => match obj.get("value").and_then(Value::as_f64) {
                Some(v) => Some(Literal::Float(v)),
                None => self.err(path, "float literal needs a numeric `value`"),
            },
            "str" => Some(Literal::Str(self.str_field(obj, "value", path)?)),
            "template_str" => Some(Literal::TemplateStr(self.str_field(obj, "value", path)?)),
            "bool" => match obj.get("value").and_then(Value::as_bool) {
                Some(v) => Some(Literal::Bool(v)),
                None => self.err(path, "bool literal needs a boolean `value`"),
            },
            "unit" => Some(Literal::Unit),
            _ => unreachable!("caller dispatched on literal kinds"),
        }
    }

    fn expr_list(
        &mut self,
        obj: &Map<String, Value>,
        key: &str,
        path: &str,
    ) -> Option<Vec<Expr>> {
        let Some(items) = obj.get(key) else {
            return Some(Vec::new());
        };
        let Some(items) = items.as_array() else {
            return self.err(path, format!("`{key}` must be an array"));
        };
        let mut exprs = Vec::new();
        for (i, item) in items.iter().enumerate() {
            if let Some(expr) = self.expr(item, &format!("{path}.{key}[{i}]")) {
                exprs.push(expr);
            }
        }
        Some(exprs)
    }

    fn arm(&mut self, v: &Value, path: &str) -> Option<MatchArm> {
        let obj = self.obj(v, path)?.clone();
        let pattern = self.req_pattern(&obj, "pattern", path)?;
        let guard = match obj.get("guard") {
            Some(g) => Some(self.expr(g, &format!("{path}.guard"))?),
            None => None,
        };
        let body = self.req_expr(&obj, "body", path)?;
        Some(MatchArm { pattern, guard, body, span: Span::synthetic() })
    }

    fn block(&mut self, obj: &Map<String, Value>, path: &str) -> Option<Block> {
        let mut stmts = Vec::new();
        if let Some(items) = obj.get("stmts").and_then(Value::as_array) {
            for (i, item) in items.iter().enumerate() {
                if let Some(stmt) = self.stmt(item, &format!("{path}.stmts[{i}]")) {
                    stmts.push(stmt);
                }
            }
        }
        let value = match obj.get("value") {
            Some(v) => Some(Box::new(self.expr(v, &format!("{path}.value"))?)),
            None => None,
        };
        Some(Block { stmts, value })
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn stmt(&mut self, v: &Value, path: &str) -> Option<Stmt> {
        if let Some((source, file)) = self.fragment(v) {
            let (stmt, diags) = rill_parser::parse_statement_source(&file, source);
            self.fragment_errors(path, diags);
            return stmt.map(|s| fresh::clone_stmt(&s, &mut self.ids));
        }

        let obj = self.obj(v, path)?.clone();
        let kind = self.kind(&obj, path)?.to_string();
        let id = self.ids.fresh();
        let span = self.span(&obj);

        let kind = match kind.as_str() {
            "let" => StmtKind::Let {
                pattern: self.req_pattern(&obj, "pattern", path)?,
                ty: self.opt_type(&obj, "ty", path)?,
                mutable: obj.get("mutable").and_then(Value::as_bool).unwrap_or(false),
                init: self.req_expr(&obj, "init", path)?,
            },
            "assign" => StmtKind::Assign {
                target: self.req_expr(&obj, "target", path)?,
                value: self.req_expr(&obj, "value", path)?,
            },
            "expr" => StmtKind::Expr(self.req_expr(&obj, "expr", path)?),
            "for" => StmtKind::For {
                binding: self.req_pattern(&obj, "binding", path)?,
                iter: self.req_expr(&obj, "iter", path)?,
                body: self.req_expr(&obj, "body", path)?,
            },
            "while" => StmtKind::While {
                cond: self.req_expr(&obj, "cond", path)?,
                body: self.req_expr(&obj, "body", path)?,
            },
            "loop" => StmtKind::Loop {
                body: self.req_expr(&obj, "body", path)?,
            },
            "return" => StmtKind::Return(match obj.get("value") {
                Some(v) => Some(self.expr(v, &format!("{path}.value"))?),
                None => None,
            }),
            "break" => StmtKind::Break,
            "continue" => StmtKind::Continue,
            "assert" => StmtKind::Assert {
                cond: self.req_expr(&obj, "cond", path)?,
                message: match obj.get("message") {
                    Some(m) => Some(self.expr(m, &format!("{path}.message"))?),
                    None => None,
                },
            },
            other => return self.err(path, format!("unknown statement kind `{other}`")),
        };
        Some(Stmt { id, span, kind })
    }

    // ── Patterns ───────────────────────────────────────────────────────

    fn pattern(&mut self, v: &Value, path: &str) -> Option<Pattern> {
        if let Some((source, file)) = self.fragment(v) {
            let (pattern, diags) = rill_parser::parse_pattern_source(&file, source);
            self.fragment_errors(path, diags);
            return pattern.map(|p| fresh::clone_pattern(&p, &mut self.ids));
        }

        let obj = self.obj(v, path)?.clone();
        let kind = self.kind(&obj, path)?.to_string();
        let id = self.ids.fresh();
        let span = self.span(&obj);

        let kind = match kind.as_str() {
            "wildcard" => PatternKind::Wildcard,
            "binding" => PatternKind::Ident(self.str_field(&obj, "name", path)?),
            "int" | "float" | "str" | "template_str" | "bool" | "unit" => {
                PatternKind::Literal(self.literal(&kind, &obj, path)?)
            }
            "tuple" => {
                let mut elems = Vec::new();
                if let Some(items) = obj.get("elems").and_then(Value::as_array) {
                    for (i, item) in items.iter().enumerate() {
                        if let Some(p) = self.pattern(item, &format!("{path}.elems[{i}]")) {
                            elems.push(p);
                        }
                    }
                }
                PatternKind::Tuple(elems)
            }
            "record" => {
                let mut fields = Vec::new();
                if let Some(items) = obj.get("fields").and_then(Value::as_array) {
                    for (i, item) in items.iter().enumerate() {
                        let child_path = format!("{path}.fields[{i}]");
                        let Some(field_obj) = self.obj(item, &child_path) else {
                            continue;
                        };
                        let field_obj = field_obj.clone();
                        let Some(name) = self.str_field(&field_obj, "name", &child_path)
                        else {
                            continue;
                        };
                        let sub = match field_obj.get("pattern") {
                            Some(p) => {
                                Some(self.pattern(p, &format!("{child_path}.pattern"))?)
                            }
                            None => None,
                        };
                        fields.push(RecordPatternField {
                            name,
                            pattern: sub,
                            span: Span::synthetic(),
                        });
                    }
                }
                PatternKind::Record { fields }
            }
            "variant" => {
                let mut args = Vec::new();
                if let Some(items) = obj.get("args").and_then(Value::as_array) {
                    for (i, item) in items.iter().enumerate() {
                        if let Some(p) = self.pattern(item, &format!("{path}.args[{i}]")) {
                            args.push(p);
                        }
                    }
                }
                PatternKind::Variant { name: self.str_field(&obj, "name", path)?, args }
            }
            other => return self.err(path, format!("unknown pattern kind `{other}`")),
        };
        Some(Pattern { id, span, kind })
    }
}

fn binary_op_from_symbol(symbol: &str) -> Option<BinaryOp> {
    Some(match symbol {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "%" => BinaryOp::Rem,
        "**" => BinaryOp::Pow,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::NotEq,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::LtEq,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::GtEq,
        "&&" => BinaryOp::And,
        "||" => BinaryOp::Or,
        "++" => BinaryOp::Concat,
        "|>" => BinaryOp::Pipe,
        _ => return None,
    })
}
