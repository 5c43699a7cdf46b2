//! The Rill abstract syntax tree.
//!
//! Every node carries a stable [`NodeId`] and a [`Span`]. The tree is pure:
//! no back-edges, no sharing; a node appears exactly once. Ids are handed
//! out by an [`IdGen`] that each top-level entry point (parser,
//! deserializer, canonicalizer) creates fresh, so a fixed input always
//! yields the same ids.

pub mod decl;
pub mod expr;
pub mod fresh;
pub mod pat;
pub mod stmt;
pub mod ty;

use std::fmt;

use rill_common::span::Span;
use rill_common::token::IntWidth;

pub use decl::{Decl, DeclKind, ExternalFnDecl, FnDecl, Param, RecordField, Variant, VariantFields};
pub use expr::{Block, Expr, ExprKind, MatchArm, RecordExprField};
pub use pat::{Pattern, PatternKind, RecordPatternField};
pub use stmt::{Stmt, StmtKind};
pub use ty::{RecordTypeField, TypeExpr, TypeExprKind};

/// Opaque identifier of an AST node, unique within one compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic node-id allocator.
///
/// There is no process-wide counter; whoever builds a tree owns an `IdGen`
/// and determinism is a property of that allocator alone. Independent
/// compile requests can run in parallel, each with its own generator.
#[derive(Debug, Default)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    pub fn fresh(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// A parsed program: an ordered sequence of declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub id: NodeId,
    pub span: Span,
    pub decls: Vec<Decl>,
}

/// A literal value, shared between expressions and patterns.
///
/// Integer literals keep their value as a canonical decimal digit string,
/// preserving arbitrary precision end to end.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int { digits: String, width: Option<IntWidth> },
    Float(f64),
    Str(String),
    TemplateStr(String),
    Bool(bool),
    Unit,
}

/// A unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-`
    Neg,
    /// `!` / `¬`
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// A binary operator. Unicode spellings lex to the same operator, so the
/// AST only ever holds the ASCII form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `**` (right-associative)
    Pow,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `++`
    Concat,
    /// `|>` (desugared away by canonicalization)
    Pipe,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Concat => "++",
            BinaryOp::Pipe => "|>",
        }
    }

    /// Whether this operator compares its operands (result is `Bool`).
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_gen_is_monotonic_from_zero() {
        let mut ids = IdGen::new();
        assert_eq!(ids.fresh(), NodeId(0));
        assert_eq!(ids.fresh(), NodeId(1));
        assert_eq!(ids.fresh(), NodeId(2));
    }

    #[test]
    fn independent_generators_do_not_interfere() {
        let mut a = IdGen::new();
        let mut b = IdGen::new();
        a.fresh();
        a.fresh();
        assert_eq!(b.fresh(), NodeId(0));
    }
}
