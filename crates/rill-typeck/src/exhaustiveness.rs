//! Exhaustiveness and reachability analysis for `match`.
//!
//! Works over top-level patterns only. The scrutinee's type determines a
//! set of "constructor classes" that must be covered: the declared
//! variants for sum types, `{true, false}` for `Bool`, and a single
//! wildcard class for everything else. Arms are walked in order:
//!
//! - an unguarded wildcard or identifier arm discharges every remaining
//!   class,
//! - an unguarded variant or literal arm discharges exactly its class,
//! - guarded arms discharge nothing (the guard may be false at runtime).
//!
//! Arms that can no longer match anything are reported as unreachable.

use rill_parser::ast::{Literal, MatchArm, PatternKind};

/// Constructor classes required by a scrutinee type.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrutineeClasses {
    /// A sum type: variant names with payload arities, in declaration
    /// order.
    Variants(Vec<(String, usize)>),
    /// `Bool`: the classes `true` and `false`.
    Bool,
    /// Open or primitive types: an unguarded wildcard/identifier arm is
    /// required.
    Open,
}

/// Result of the analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    /// Descriptions of uncovered patterns, e.g. `South`, `Some(_)`.
    pub missing: Vec<String>,
    /// Indices of arms no value can reach.
    pub unreachable: Vec<usize>,
}

impl MatchReport {
    pub fn is_exhaustive(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Wildcard placeholder description for a variant with the given arity:
/// `North`, `Some(_)`, `Pair(_, _)`.
pub fn variant_placeholder(name: &str, arity: usize) -> String {
    if arity == 0 {
        name.to_string()
    } else {
        let holes = vec!["_"; arity].join(", ");
        format!("{name}({holes})")
    }
}

/// Analyze the arms of a `match` against the scrutinee's classes.
///
/// An empty arm list is tolerated: every class is reported missing.
pub fn check_match(classes: &ScrutineeClasses, arms: &[MatchArm]) -> MatchReport {
    match classes {
        ScrutineeClasses::Variants(variants) => check_variants(variants, arms),
        ScrutineeClasses::Bool => check_bool(arms),
        ScrutineeClasses::Open => check_open(arms),
    }
}

fn check_variants(variants: &[(String, usize)], arms: &[MatchArm]) -> MatchReport {
    let mut remaining: Vec<&(String, usize)> = variants.iter().collect();
    let mut report = MatchReport::default();
    let mut covered = false;

    for (index, arm) in arms.iter().enumerate() {
        if covered || (remaining.is_empty() && !variants.is_empty()) {
            report.unreachable.push(index);
            continue;
        }
        if arm.guard.is_some() {
            continue;
        }
        match &arm.pattern.kind {
            PatternKind::Wildcard | PatternKind::Ident(_) => {
                remaining.clear();
                covered = true;
            }
            PatternKind::Variant { name, .. } => {
                let before = remaining.len();
                remaining.retain(|(n, _)| n != name);
                let was_class = variants.iter().any(|(n, _)| n == name);
                if before == remaining.len() && was_class {
                    // The class was already discharged by an earlier arm.
                    report.unreachable.push(index);
                }
            }
            _ => {}
        }
    }

    report.missing = remaining
        .iter()
        .map(|(name, arity)| variant_placeholder(name, *arity))
        .collect();
    report
}

fn check_bool(arms: &[MatchArm]) -> MatchReport {
    let mut need_true = true;
    let mut need_false = true;
    let mut report = MatchReport::default();

    for (index, arm) in arms.iter().enumerate() {
        if !need_true && !need_false {
            report.unreachable.push(index);
            continue;
        }
        if arm.guard.is_some() {
            continue;
        }
        match &arm.pattern.kind {
            PatternKind::Wildcard | PatternKind::Ident(_) => {
                need_true = false;
                need_false = false;
            }
            PatternKind::Literal(Literal::Bool(value)) => {
                let need = if *value { &mut need_true } else { &mut need_false };
                if *need {
                    *need = false;
                } else {
                    report.unreachable.push(index);
                }
            }
            // `sum X { Bool }`-style variant names over a Bool scrutinee
            // do not discharge literal classes.
            _ => {}
        }
    }

    if need_true {
        report.missing.push("true".to_string());
    }
    if need_false {
        report.missing.push("false".to_string());
    }
    report
}

fn check_open(arms: &[MatchArm]) -> MatchReport {
    let mut covered = false;
    let mut report = MatchReport::default();

    for (index, arm) in arms.iter().enumerate() {
        if covered {
            report.unreachable.push(index);
            continue;
        }
        if arm.guard.is_some() {
            continue;
        }
        if arm.pattern.is_irrefutable_binding() {
            covered = true;
        }
    }

    if !covered {
        report.missing.push("_".to_string());
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_parser::parse_expression_source;
    use rill_parser::ast::ExprKind;

    fn arms_of(source: &str) -> Vec<MatchArm> {
        let (expr, diags) = parse_expression_source("t.rill", source);
        assert!(diags.is_empty(), "parse errors: {diags:?}");
        match expr.unwrap().kind {
            ExprKind::Match { arms, .. } => arms,
            other => panic!("expected match, got {other:?}"),
        }
    }

    fn direction() -> ScrutineeClasses {
        ScrutineeClasses::Variants(vec![
            ("North".into(), 0),
            ("South".into(), 0),
            ("East".into(), 0),
            ("West".into(), 0),
        ])
    }

    fn option() -> ScrutineeClasses {
        ScrutineeClasses::Variants(vec![("Some".into(), 1), ("None".into(), 0)])
    }

    #[test]
    fn missing_variants_in_declaration_order() {
        let arms = arms_of("match d { North -> true }");
        let report = check_match(&direction(), &arms);
        assert_eq!(report.missing, vec!["South", "East", "West"]);
    }

    #[test]
    fn wildcard_discharges_everything() {
        let arms = arms_of("match d { North -> 1, _ -> 0 }");
        let report = check_match(&direction(), &arms);
        assert!(report.is_exhaustive());
        assert!(report.unreachable.is_empty());
    }

    #[test]
    fn identifier_binding_discharges_everything() {
        let arms = arms_of("match d { other -> 0 }");
        let report = check_match(&direction(), &arms);
        assert!(report.is_exhaustive());
    }

    #[test]
    fn guarded_arms_discharge_nothing() {
        let arms = arms_of("match d { North if flag -> 1, North -> 2, South -> 3, East -> 4, West -> 5 }");
        let report = check_match(&direction(), &arms);
        assert!(report.is_exhaustive());
        assert!(report.unreachable.is_empty());

        let arms = arms_of("match d { _ if flag -> 1 }");
        let report = check_match(&direction(), &arms);
        assert_eq!(report.missing.len(), 4, "a guarded wildcard covers nothing");
    }

    #[test]
    fn payload_variants_use_placeholders() {
        let arms = arms_of("match o { None -> 0 }");
        let report = check_match(&option(), &arms);
        assert_eq!(report.missing, vec!["Some(_)"]);
    }

    #[test]
    fn multi_payload_placeholder() {
        assert_eq!(variant_placeholder("Pair", 2), "Pair(_, _)");
    }

    #[test]
    fn duplicate_arm_is_unreachable() {
        let arms = arms_of("match o { None -> 0, None -> 1, Some(x) -> x }");
        let report = check_match(&option(), &arms);
        assert!(report.is_exhaustive());
        assert_eq!(report.unreachable, vec![1]);
    }

    #[test]
    fn arms_after_wildcard_are_unreachable() {
        let arms = arms_of("match o { _ -> 0, None -> 1 }");
        let report = check_match(&option(), &arms);
        assert_eq!(report.unreachable, vec![1]);
    }

    #[test]
    fn bool_classes() {
        let arms = arms_of("match b { true -> 1 }");
        let report = check_match(&ScrutineeClasses::Bool, &arms);
        assert_eq!(report.missing, vec!["false"]);

        let arms = arms_of("match b { true -> 1, false -> 0 }");
        let report = check_match(&ScrutineeClasses::Bool, &arms);
        assert!(report.is_exhaustive());

        let arms = arms_of("match b { true -> 1, false -> 0, true -> 2 }");
        let report = check_match(&ScrutineeClasses::Bool, &arms);
        assert_eq!(report.unreachable, vec![2]);
    }

    #[test]
    fn open_types_require_a_wildcard() {
        let arms = arms_of("match n { 1 -> 1, 2 -> 2 }");
        let report = check_match(&ScrutineeClasses::Open, &arms);
        assert_eq!(report.missing, vec!["_"]);

        let arms = arms_of("match n { 1 -> 1, _ -> 0 }");
        let report = check_match(&ScrutineeClasses::Open, &arms);
        assert!(report.is_exhaustive());
    }

    #[test]
    fn empty_arm_list_reports_all_classes() {
        let report = check_match(&direction(), &[]);
        assert_eq!(report.missing.len(), 4);
    }
}
