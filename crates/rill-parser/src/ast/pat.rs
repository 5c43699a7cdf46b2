//! Pattern nodes.

use rill_common::span::Span;

use super::{Literal, NodeId};

/// A pattern in a `match` arm, `let` binding, or `for` loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub id: NodeId,
    pub span: Span,
    pub kind: PatternKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// `_` -- matches anything, binds nothing.
    Wildcard,
    /// `x` -- binds the whole scrutinee.
    Ident(String),
    /// A literal value: `0`, `"s"`, `true`.
    Literal(Literal),
    /// `(a, b, c)`.
    Tuple(Vec<Pattern>),
    /// `{x, y: pat}` -- omitted fields are simply not bound.
    Record { fields: Vec<RecordPatternField> },
    /// `Variant` or `Variant(p1, p2)`. Built-in type keywords (`Bool`,
    /// `Int`, ...) are admitted as variant names.
    Variant { name: String, args: Vec<Pattern> },
}

/// One field of a record pattern. `x` alone binds `x`; `x: pat` matches
/// the field against a sub-pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPatternField {
    pub name: String,
    pub pattern: Option<Pattern>,
    pub span: Span,
}

impl Pattern {
    /// Whether this pattern matches every value of its type (an unguarded
    /// wildcard or identifier binding).
    pub fn is_irrefutable_binding(&self) -> bool {
        matches!(self.kind, PatternKind::Wildcard | PatternKind::Ident(_))
    }
}
