//! Declaration parsers: module headers, imports, type definitions,
//! functions, and the external (foreign) interface.

use rill_common::token::{TokenKind, TokenValue};

use crate::ast::{
    Decl, DeclKind, ExternalFnDecl, FnDecl, Param, RecordField, TypeExpr, Variant, VariantFields,
};

use super::{describe, statements, types, Parser};

/// Parse one top-level declaration. Returns `None` on a fatal error; the
/// caller synchronizes and continues.
pub(crate) fn parse_decl(p: &mut Parser) -> Option<Decl> {
    match p.kind() {
        TokenKind::Mod => parse_module(p),
        TokenKind::Use => parse_use(p),
        TokenKind::Type => parse_type_alias(p),
        TokenKind::Rec => parse_record(p),
        TokenKind::Sum => parse_sum(p),
        TokenKind::Fn => parse_function(p),
        TokenKind::External => parse_external(p),
        _ => {
            p.error(format!(
                "expected a declaration, found {}",
                describe(p.kind())
            ));
            None
        }
    }
}

// ── Module header and imports ────────────────────────────────────────────

/// `mod a.b.c`
fn parse_module(p: &mut Parser) -> Option<Decl> {
    let id = p.fresh();
    let start = p.current_span();
    p.bump(); // mod
    let path = parse_dotted_path(p)?;
    Some(Decl {
        id,
        span: p.span_from(&start),
        kind: DeclKind::Module { path },
    })
}

/// `use [external] a.b.{x, y} [as z]`
fn parse_use(p: &mut Parser) -> Option<Decl> {
    let id = p.fresh();
    let start = p.current_span();
    p.bump(); // use
    let external = p.eat(TokenKind::External);

    let mut path = vec![parse_path_segment(p)?];
    let mut items = None;
    while p.eat(TokenKind::Dot) {
        if p.at(TokenKind::LBrace) {
            items = Some(parse_use_items(p)?);
            break;
        }
        path.push(parse_path_segment(p)?);
    }

    let alias = if p.eat(TokenKind::As) {
        Some(parse_path_segment(p)?)
    } else {
        None
    };

    Some(Decl {
        id,
        span: p.span_from(&start),
        kind: DeclKind::Use { path, items, alias, external },
    })
}

fn parse_use_items(p: &mut Parser) -> Option<Vec<String>> {
    p.bump(); // {
    let mut items = Vec::new();
    while !p.at(TokenKind::RBrace) && !p.at_eof() {
        items.push(parse_path_segment(p)?);
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(TokenKind::RBrace, "`}`");
    Some(items)
}

fn parse_path_segment(p: &mut Parser) -> Option<String> {
    if p.at(TokenKind::Ident) || p.at(TokenKind::TypeIdent) {
        Some(p.bump().ident_text().to_string())
    } else {
        p.error(format!("expected a name, found {}", describe(p.kind())));
        None
    }
}

fn parse_dotted_path(p: &mut Parser) -> Option<Vec<String>> {
    let mut path = vec![parse_path_segment(p)?];
    while p.eat(TokenKind::Dot) {
        path.push(parse_path_segment(p)?);
    }
    Some(path)
}

// ── Type definitions ─────────────────────────────────────────────────────

/// `type Name<T> = ty`
fn parse_type_alias(p: &mut Parser) -> Option<Decl> {
    let id = p.fresh();
    let start = p.current_span();
    p.bump(); // type
    let name = parse_type_name(p)?;
    let params = parse_type_params(p)?;
    p.expect(TokenKind::Eq, "`=`");
    let ty = types::parse_type(p, true)?;
    Some(Decl {
        id,
        span: p.span_from(&start),
        kind: DeclKind::TypeAlias { name, params, ty },
    })
}

/// `rec Name<T> { field: ty, ... }`
fn parse_record(p: &mut Parser) -> Option<Decl> {
    let id = p.fresh();
    let start = p.current_span();
    p.bump(); // rec
    let name = parse_type_name(p)?;
    let params = parse_type_params(p)?;
    p.expect(TokenKind::LBrace, "`{`");
    let fields = parse_record_fields(p, TokenKind::RBrace)?;
    p.expect(TokenKind::RBrace, "`}`");
    Some(Decl {
        id,
        span: p.span_from(&start),
        kind: DeclKind::Record { name, params, fields },
    })
}

/// `sum Name<T> { A, B(T), C(x: T) }`
fn parse_sum(p: &mut Parser) -> Option<Decl> {
    let id = p.fresh();
    let start = p.current_span();
    p.bump(); // sum
    let name = parse_type_name(p)?;
    let params = parse_type_params(p)?;
    p.expect(TokenKind::LBrace, "`{`");
    let mut variants = Vec::new();
    while !p.at(TokenKind::RBrace) && !p.at_eof() {
        variants.push(parse_variant(p)?);
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(TokenKind::RBrace, "`}`");
    Some(Decl {
        id,
        span: p.span_from(&start),
        kind: DeclKind::Sum { name, params, variants },
    })
}

/// One sum variant. Built-in type keywords are admitted as variant names,
/// so `sum X { Bool, String(Str) }` is well-formed.
fn parse_variant(p: &mut Parser) -> Option<Variant> {
    let start = p.current_span();
    let name = parse_variant_name(p)?;

    let fields = if p.eat(TokenKind::LParen) {
        // Named payload if the first entry looks like `name: ty`.
        if p.at(TokenKind::Ident) && p.nth_kind(1) == TokenKind::Colon {
            let fields = parse_record_fields(p, TokenKind::RParen)?;
            p.expect(TokenKind::RParen, "`)`");
            VariantFields::Named(fields)
        } else {
            let mut tys = Vec::new();
            while !p.at(TokenKind::RParen) && !p.at_eof() {
                tys.push(types::parse_type(p, true)?);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            p.expect(TokenKind::RParen, "`)`");
            VariantFields::Positional(tys)
        }
    } else {
        VariantFields::Unit
    };

    Some(Variant {
        name,
        fields,
        span: p.span_from(&start),
    })
}

pub(crate) fn parse_variant_name(p: &mut Parser) -> Option<String> {
    if p.at(TokenKind::TypeIdent) {
        return Some(p.bump().ident_text().to_string());
    }
    if let Some(name) = p.kind().builtin_type_name() {
        p.bump();
        return Some(name.to_string());
    }
    p.error(format!(
        "expected a variant name, found {}",
        describe(p.kind())
    ));
    None
}

fn parse_record_fields(p: &mut Parser, terminator: TokenKind) -> Option<Vec<RecordField>> {
    let mut fields = Vec::new();
    while !p.at(terminator) && !p.at_eof() {
        let start = p.current_span();
        let name = if p.at(TokenKind::Ident) {
            p.bump().ident_text().to_string()
        } else {
            p.error(format!("expected a field name, found {}", describe(p.kind())));
            return None;
        };
        p.expect(TokenKind::Colon, "`:`");
        let ty = types::parse_type(p, true)?;
        fields.push(RecordField {
            name,
            ty,
            span: p.span_from(&start),
        });
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    Some(fields)
}

fn parse_type_name(p: &mut Parser) -> Option<String> {
    if p.at(TokenKind::TypeIdent) {
        Some(p.bump().ident_text().to_string())
    } else {
        p.error(format!(
            "expected a type name, found {}",
            describe(p.kind())
        ));
        None
    }
}

/// Optional `<T, U>` generic parameter list.
fn parse_type_params(p: &mut Parser) -> Option<Vec<String>> {
    let mut params = Vec::new();
    if p.eat(TokenKind::Lt) {
        while !p.at(TokenKind::Gt) && !p.at_eof() {
            params.push(parse_type_name(p)?);
            if !p.eat(TokenKind::Comma) {
                break;
            }
        }
        p.expect(TokenKind::Gt, "`>`");
    }
    Some(params)
}

// ── Functions ────────────────────────────────────────────────────────────

/// `fn name<T>(params) -> Ret { body }`
fn parse_function(p: &mut Parser) -> Option<Decl> {
    let id = p.fresh();
    let start = p.current_span();
    p.bump(); // fn
    let (name, type_params, params, ret) = parse_fn_signature(p)?;
    let body = statements::parse_block_expr(p)?;
    Some(Decl {
        id,
        span: p.span_from(&start),
        kind: DeclKind::Function(FnDecl { name, type_params, params, ret, body }),
    })
}

/// Shared signature parsing: name, generics, parameters, return type.
///
/// In return position refinement braces are NOT parsed -- `-> Int {` is a
/// function body, and a refined return type must be written `-> (Int{...})`.
fn parse_fn_signature(
    p: &mut Parser,
) -> Option<(String, Vec<String>, Vec<Param>, Option<TypeExpr>)> {
    let name = if p.at(TokenKind::Ident) {
        p.bump().ident_text().to_string()
    } else {
        p.error(format!(
            "expected a function name, found {}",
            describe(p.kind())
        ));
        return None;
    };
    let type_params = parse_type_params(p)?;
    p.expect(TokenKind::LParen, "`(`");
    let params = parse_params(p)?;
    p.expect(TokenKind::RParen, "`)`");
    let ret = if p.eat(TokenKind::Arrow) {
        Some(types::parse_type(p, false)?)
    } else {
        None
    };
    Some((name, type_params, params, ret))
}

/// Parameter list body: `name: ty, name: ty`. Annotations are required on
/// function declarations (lambdas relax this in `expressions.rs`).
fn parse_params(p: &mut Parser) -> Option<Vec<Param>> {
    let mut params = Vec::new();
    while !p.at(TokenKind::RParen) && !p.at_eof() {
        let start = p.current_span();
        let name = if p.at(TokenKind::Ident) {
            p.bump().ident_text().to_string()
        } else {
            p.error(format!(
                "expected a parameter name, found {}",
                describe(p.kind())
            ));
            return None;
        };
        p.expect(TokenKind::Colon, "`:`");
        let ty = types::parse_type(p, true)?;
        params.push(Param {
            name,
            ty: Some(ty),
            span: p.span_from(&start),
        });
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    Some(params)
}

// ── External declarations ────────────────────────────────────────────────

/// `external fn ... = "host"` or `external mod name = "module" { ... }`
fn parse_external(p: &mut Parser) -> Option<Decl> {
    let start = p.current_span();
    p.bump(); // external
    match p.kind() {
        TokenKind::Fn => {
            let id = p.fresh();
            p.bump();
            let decl = parse_external_fn_body(p, None)?;
            Some(Decl {
                id,
                span: p.span_from(&start),
                kind: DeclKind::ExternalFn(decl),
            })
        }
        TokenKind::Mod => parse_external_mod(p, start),
        _ => {
            p.error(format!(
                "expected `fn` or `mod` after `external`, found {}",
                describe(p.kind())
            ));
            None
        }
    }
}

/// Signature plus host binding. Inside an `external mod`, the binding is
/// optional and defaults to `module.name`.
fn parse_external_fn_body(p: &mut Parser, default_module: Option<&str>) -> Option<ExternalFnDecl> {
    let (name, type_params, params, ret) = parse_fn_signature(p)?;
    let host_name = if p.eat(TokenKind::Eq) {
        if p.at(TokenKind::Str) {
            match p.bump().value {
                Some(TokenValue::Str(s)) => s,
                _ => String::new(),
            }
        } else {
            p.error(format!(
                "expected a host name string, found {}",
                describe(p.kind())
            ));
            return None;
        }
    } else if let Some(module) = default_module {
        format!("{module}.{name}")
    } else {
        p.error("external functions require a host name: `= \"hostName\"`");
        return None;
    };
    Some(ExternalFnDecl { name, type_params, params, ret, host_name })
}

/// `external mod name = "module" { fn sig [= "host"] ... }`
fn parse_external_mod(p: &mut Parser, start: rill_common::span::Span) -> Option<Decl> {
    let id = p.fresh();
    p.bump(); // mod
    let name = if p.at(TokenKind::Ident) {
        p.bump().ident_text().to_string()
    } else {
        p.error(format!(
            "expected a module name, found {}",
            describe(p.kind())
        ));
        return None;
    };
    p.expect(TokenKind::Eq, "`=`");
    let module = if p.at(TokenKind::Str) {
        match p.bump().value {
            Some(TokenValue::Str(s)) => s,
            _ => String::new(),
        }
    } else {
        p.error(format!(
            "expected a host module string, found {}",
            describe(p.kind())
        ));
        return None;
    };
    p.expect(TokenKind::LBrace, "`{`");
    let mut fns = Vec::new();
    while !p.at(TokenKind::RBrace) && !p.at_eof() {
        if !p.at(TokenKind::Fn) {
            p.error(format!(
                "expected `fn` inside external module, found {}",
                describe(p.kind())
            ));
            return None;
        }
        let fn_id = p.fresh();
        let fn_start = p.current_span();
        p.bump(); // fn
        let decl = parse_external_fn_body(p, Some(&module))?;
        fns.push(Decl {
            id: fn_id,
            span: p.span_from(&fn_start),
            kind: DeclKind::ExternalFn(decl),
        });
        p.eat(TokenKind::Comma);
    }
    p.expect(TokenKind::RBrace, "`}`");
    Some(Decl {
        id,
        span: p.span_from(&start),
        kind: DeclKind::ExternalMod { name, module, fns },
    })
}
