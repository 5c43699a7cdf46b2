//! First-class diagnostic records.
//!
//! Every pass of the compiler reports through `Diagnostic`: a severity, a
//! stable `E####` code, a human message, a primary span, a machine-readable
//! structured payload, optional hints, and optional related locations.
//! The compiler never prints; callers render with [`crate::render`] or
//! consume the structured payload directly.

use serde::Serialize;

use crate::span::Span;

/// Diagnostic severity. A compile succeeds iff no `Error` was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One constructor the scrutinee admits but no arm covers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingPattern {
    /// Display form, e.g. `South` or `Some(_)`.
    pub description: String,
}

/// Machine-readable payload, stable across releases.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Structured {
    /// Lexical or syntax error (`E0001`).
    Syntax,
    /// A type name did not resolve (`E1001`).
    UnresolvedType { name: String },
    /// A generic type applied to the wrong number of arguments (`E1002`).
    TypeParamMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    /// A function called with the wrong number of arguments (`E1003`).
    WrongArity { expected: usize, actual: usize },
    /// An identifier not bound in any enclosing scope (`E1004`).
    UnboundName { name: String },
    /// A variant or field that does not exist on its type (`E1005`).
    UnknownMember { type_name: String, member: String },
    /// Unification failure, including occurs-check failures (`E2001`).
    TypeMismatch { expected: String, actual: String },
    /// A `match` that misses at least one constructor class (`E3001`).
    NonExhaustiveMatch { missing_patterns: Vec<MissingPattern> },
    /// A `match` arm no value can reach (`E3002`, warning).
    UnreachableArm { arm_index: usize },
    /// The same variant name declared twice in one `sum` (`E3003`).
    DuplicateVariant { type_name: String, variant: String },
    /// A callee's (or assignment's) effects exceed the caller's row (`E4001`).
    EffectNotPermitted { effect: String, function: String },
    /// `?` used in a function without `Err` in its row (`E4002`).
    PropagateWithoutErr { function: String },
    /// The refinement solver proved an obligation false (`E5001`).
    RefinementRefuted { predicate: String },
}

impl Structured {
    /// The diagnostic code this payload kind belongs to.
    pub fn code(&self) -> &'static str {
        match self {
            Structured::Syntax => "E0001",
            Structured::UnresolvedType { .. } => "E1001",
            Structured::TypeParamMismatch { .. } => "E1002",
            Structured::WrongArity { .. } => "E1003",
            Structured::UnboundName { .. } => "E1004",
            Structured::UnknownMember { .. } => "E1005",
            Structured::TypeMismatch { .. } => "E2001",
            Structured::NonExhaustiveMatch { .. } => "E3001",
            Structured::UnreachableArm { .. } => "E3002",
            Structured::DuplicateVariant { .. } => "E3003",
            Structured::EffectNotPermitted { .. } => "E4001",
            Structured::PropagateWithoutErr { .. } => "E4002",
            Structured::RefinementRefuted { .. } => "E5001",
        }
    }

    /// Default severity for this payload kind.
    pub fn severity(&self) -> Severity {
        match self {
            Structured::UnreachableArm { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A secondary location that gives the primary message context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Related {
    pub span: Span,
    pub message: String,
}

/// A structured diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub span: Span,
    pub structured: Structured,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Related>,
}

impl Diagnostic {
    /// Build a diagnostic from a structured payload; code and severity come
    /// from the payload kind.
    pub fn new(structured: Structured, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: structured.severity(),
            code: structured.code().to_string(),
            message: message.into(),
            span,
            structured,
            hints: Vec::new(),
            related: Vec::new(),
        }
    }

    /// Shorthand for a lexical/syntax error.
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::new(Structured::Syntax, message, span)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn with_related(mut self, span: Span, message: impl Into<String>) -> Self {
        self.related.push(Related { span, message: message.into() });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Sort diagnostics by span start offset, preserving emission order for ties.
///
/// Each pass emits in walk order; this restores source order within the pass
/// before the passes' vectors are concatenated.
pub fn sort_by_span(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| d.span.start.offset);
}

/// Whether a diagnostic list permits an overall `success` result.
pub fn is_success(diagnostics: &[Diagnostic]) -> bool {
    !diagnostics.iter().any(Diagnostic::is_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    #[test]
    fn codes_match_payload_kinds() {
        let d = Diagnostic::new(
            Structured::NonExhaustiveMatch {
                missing_patterns: vec![MissingPattern { description: "South".into() }],
            },
            "non-exhaustive match",
            Span::synthetic(),
        );
        assert_eq!(d.code, "E3001");
        assert_eq!(d.severity, Severity::Error);
    }

    #[test]
    fn unreachable_arm_is_a_warning() {
        let d = Diagnostic::new(
            Structured::UnreachableArm { arm_index: 2 },
            "unreachable arm",
            Span::synthetic(),
        );
        assert_eq!(d.code, "E3002");
        assert_eq!(d.severity, Severity::Warning);
    }

    #[test]
    fn success_ignores_warnings() {
        let warn = Diagnostic::new(
            Structured::UnreachableArm { arm_index: 0 },
            "w",
            Span::synthetic(),
        );
        let err = Diagnostic::syntax("e", Span::synthetic());
        assert!(is_success(&[warn.clone()]));
        assert!(!is_success(&[warn, err]));
    }

    #[test]
    fn structured_payload_serializes_with_kind_tag() {
        let d = Diagnostic::new(
            Structured::TypeParamMismatch { name: "Option".into(), expected: 1, actual: 2 },
            "wrong number of type arguments",
            Span::synthetic(),
        );
        let json = serde_json::to_value(&d.structured).unwrap();
        assert_eq!(json["kind"], "type_param_mismatch");
        assert_eq!(json["name"], "Option");
        assert_eq!(json["expected"], 1);
    }
}
