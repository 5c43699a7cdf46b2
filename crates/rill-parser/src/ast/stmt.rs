//! Statement nodes.

use rill_common::span::Span;

use super::{Expr, NodeId, Pattern, TypeExpr};

/// A statement inside a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `let [mut] pattern [: ty] = init`.
    Let {
        pattern: Pattern,
        ty: Option<TypeExpr>,
        mutable: bool,
        init: Expr,
    },
    /// `target = value`. The target is a place expression (identifier,
    /// field, or index); the effect checker enforces `Mut`.
    Assign { target: Expr, value: Expr },
    /// A bare expression evaluated for its effects.
    Expr(Expr),
    /// `for pattern in iter { body }`.
    For {
        binding: Pattern,
        iter: Expr,
        body: Expr,
    },
    /// `while cond { body }`.
    While { cond: Expr, body: Expr },
    /// `loop { body }`.
    Loop { body: Expr },
    /// `return [value]`. A bare `return` returns unit (made explicit by
    /// the canonicalizer).
    Return(Option<Expr>),
    Break,
    Continue,
    /// `assert cond [, message]`.
    Assert {
        cond: Expr,
        message: Option<Expr>,
    },
}
