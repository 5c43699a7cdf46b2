//! Declaration nodes: module headers, imports, type definitions, functions,
//! and the external (foreign) interface.

use rill_common::span::Span;

use super::{Expr, NodeId, TypeExpr};

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub id: NodeId,
    pub span: Span,
    pub kind: DeclKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// `mod a.b.c` -- module header.
    Module { path: Vec<String> },
    /// `use [external] a.b.{x, y} [as z]` -- import. Only the path is
    /// recorded; resolution is a driver concern.
    Use {
        path: Vec<String>,
        items: Option<Vec<String>>,
        alias: Option<String>,
        external: bool,
    },
    /// `type Name<T> = T'` -- type alias.
    TypeAlias {
        name: String,
        params: Vec<String>,
        ty: TypeExpr,
    },
    /// `rec Name<T> { field: T, ... }` -- record type with named fields.
    Record {
        name: String,
        params: Vec<String>,
        fields: Vec<RecordField>,
    },
    /// `sum Name<T> { A, B(T), C(x: T) }` -- sum type.
    Sum {
        name: String,
        params: Vec<String>,
        variants: Vec<Variant>,
    },
    /// `fn name<T>(params) -> Ret { body }`.
    Function(FnDecl),
    /// `external fn name(params) -> T = "hostName"`.
    ExternalFn(ExternalFnDecl),
    /// `external mod name = "module" { fn ... }` -- grouped external
    /// functions sharing a host module prefix.
    ExternalMod {
        name: String,
        module: String,
        fns: Vec<Decl>,
    },
}

/// A function declaration. The body is always a block expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: String,
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    /// Declared return type; `None` means `Unit`.
    pub ret: Option<TypeExpr>,
    pub body: Expr,
}

/// An external function signature bound to a host-runtime name.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalFnDecl {
    pub name: String,
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    /// The foreign name, e.g. `"Date.now"` or `"console.log"`.
    pub host_name: String,
}

/// A function parameter. Lambda parameters may omit the annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

/// A named field of a record declaration or a named variant payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

/// One variant of a `sum` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    pub fields: VariantFields,
    pub span: Span,
}

/// Payload shape of a sum variant.
#[derive(Debug, Clone, PartialEq)]
pub enum VariantFields {
    /// No payload: `North`.
    Unit,
    /// Positional payload: `Circle(Float)`.
    Positional(Vec<TypeExpr>),
    /// Named payload: `Rect(w: Float, h: Float)`.
    Named(Vec<RecordField>),
}

impl VariantFields {
    /// Number of payload positions.
    pub fn arity(&self) -> usize {
        match self {
            VariantFields::Unit => 0,
            VariantFields::Positional(tys) => tys.len(),
            VariantFields::Named(fields) => fields.len(),
        }
    }
}
