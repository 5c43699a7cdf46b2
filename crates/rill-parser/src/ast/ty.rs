//! Type-expression nodes -- the syntax of types, distinct from the
//! semantic types the checker works with.

use rill_common::span::Span;

use super::{Expr, NodeId};

/// A type expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub kind: TypeExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// `Int`, `Direction`, `Option<Int>`.
    Named { name: String, args: Vec<TypeExpr> },
    /// `[T]`.
    Array(Box<TypeExpr>),
    /// `(T, U)`.
    Tuple(Vec<TypeExpr>),
    /// `(T, U) -> R`.
    Function {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
    /// `T{v | pred}` or `T{pred}` (variable inferred by the solver).
    Refined {
        base: Box<TypeExpr>,
        var: Option<String>,
        pred: Box<Expr>,
    },
    /// `IO + Err + T` -- effect row applied to a result type.
    Effect {
        effects: Vec<TypeExpr>,
        result: Box<TypeExpr>,
    },
    /// `{x: Int, y: Str}` closed, `{x: Int, ..}` open.
    RecordType {
        fields: Vec<RecordTypeField>,
        open: bool,
    },
}

/// One field of a record type expression.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTypeField {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}
