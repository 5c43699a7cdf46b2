//! The refinement solver: discharges proof obligations of the form
//! "predicate P holds under fact set F".
//!
//! Incomplete but sound. Facts and goals are lowered to rational linear
//! constraints; entailment is decided by checking that the facts plus the
//! negated goal are infeasible, via Fourier-Motzkin elimination one atom
//! at a time. Anything outside the linear fragment (disjunctive facts,
//! nonlinear terms, overflow) leaves the obligation `Open` -- never a
//! wrong `Discharged` or `Refuted`.
//!
//! The solver is a pure function of the obligation and fact sets: facts
//! are sorted canonically before combination, atoms live in `BTreeMap`s,
//! and no iteration order depends on a hash map.

use rill_common::span::Span;
use serde::Serialize;

use super::linear::{Constraint, LinExpr, Rational, normalize_cmp};
use super::predicate::Predicate;

/// Outcome of attempting to discharge one obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverResult {
    /// The facts entail the predicate.
    Discharged,
    /// The facts entail the predicate's negation; an error diagnostic is
    /// produced at the obligation's site.
    Refuted,
    /// Neither could be established; surfaced to the caller.
    Open,
}

/// Where an obligation came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ObligationOrigin {
    /// An argument passed to a parameter of refined type.
    CallArgument { callee: String, param: String },
    /// A returning expression checked against a refined return type.
    ReturnRefinement { function: String },
    /// `arr[i]` emits `i >= 0 && i < len(arr)`.
    IndexBounds,
}

/// One proof obligation, with the fact set that was in scope at its site.
#[derive(Debug, Clone)]
pub struct Obligation {
    pub predicate: Predicate,
    pub facts: Vec<Predicate>,
    pub span: Span,
    pub origin: ObligationOrigin,
    pub result: SolverResult,
}

/// Decide a goal under a fact set.
pub fn solve(goal: &Predicate, facts: &[Predicate]) -> SolverResult {
    let system = FactSystem::build(facts);
    if prove(&system, goal) {
        SolverResult::Discharged
    } else if prove(&system, &goal.negate()) {
        SolverResult::Refuted
    } else {
        SolverResult::Open
    }
}

// ── Fact system ────────────────────────────────────────────────────────

/// Linear inequalities (`e >= 0`) harvested from the facts.
struct FactSystem {
    ges: Vec<LinExpr>,
}

impl FactSystem {
    fn build(facts: &[Predicate]) -> FactSystem {
        // Split conjunctions into atomic predicates.
        let mut atoms = Vec::new();
        for fact in facts {
            collect_atoms(fact, &mut atoms);
        }
        // Canonical order: the solver must be order-independent.
        atoms.sort_by_key(|p| p.to_string());
        atoms.dedup();

        let mut ges = Vec::new();
        for atom in &atoms {
            let Predicate::Cmp { op, lhs, rhs } = atom else {
                continue;
            };
            let Some(constraints) = normalize_cmp(*op, lhs, rhs) else {
                continue; // outside the linear fragment
            };
            for c in constraints {
                match c {
                    Constraint::Ge(e) => ges.push(e),
                    // An equality is the pair of opposite inequalities;
                    // elimination then chains substitutions for free.
                    Constraint::Eq(e) => {
                        if let Some(neg) = e.checked_scale(Rational::from_int(-1)) {
                            ges.push(e);
                            ges.push(neg);
                        }
                    }
                    // Disequalities are not consumed (documented
                    // limitation, matching disjunction handling).
                    Constraint::Ne(_) => {}
                }
            }
        }
        FactSystem { ges }
    }
}

/// Flatten conjunctions. `Or` facts are not consumed by the linear
/// engine; `Not` is pushed through comparisons by `negate`.
fn collect_atoms(pred: &Predicate, out: &mut Vec<Predicate>) {
    match pred {
        Predicate::And(a, b) => {
            collect_atoms(a, out);
            collect_atoms(b, out);
        }
        Predicate::Not(inner) => {
            let pushed = inner.negate();
            if matches!(pushed, Predicate::Not(_)) {
                return; // irreducible negation
            }
            collect_atoms(&pushed, out);
        }
        Predicate::Cmp { .. } => out.push(pred.clone()),
        Predicate::True | Predicate::False | Predicate::Unknown | Predicate::Or(..) => {}
    }
}

// ── Proving ────────────────────────────────────────────────────────────

fn prove(system: &FactSystem, goal: &Predicate) -> bool {
    match goal {
        Predicate::True => true,
        // `False` holds only under inconsistent facts (an unreachable
        // site).
        Predicate::False => entails_ge(system, &LinExpr::constant(Rational::from_int(-1))),
        Predicate::Unknown => false,
        Predicate::And(a, b) => prove(system, a) && prove(system, b),
        Predicate::Or(a, b) => prove(system, a) || prove(system, b),
        Predicate::Not(inner) => {
            let pushed = inner.negate();
            if matches!(pushed, Predicate::Not(_)) {
                return false;
            }
            prove(system, &pushed)
        }
        Predicate::Cmp { op, lhs, rhs } => {
            let Some(constraints) = normalize_cmp(*op, lhs, rhs) else {
                return false;
            };
            constraints.iter().all(|c| match c {
                Constraint::Ge(e) => entails_ge(system, e),
                Constraint::Eq(e) => {
                    entails_ge(system, e)
                        && e.checked_scale(Rational::from_int(-1))
                            .is_some_and(|neg| entails_ge(system, &neg))
                }
                // e != 0 holds when e >= 1 or e <= -1 is entailed.
                Constraint::Ne(e) => {
                    let one = LinExpr::constant(Rational::ONE);
                    let pos = e.to_integer().and_then(|i| i.checked_sub(&one));
                    let neg = e
                        .checked_scale(Rational::from_int(-1))
                        .and_then(|n| n.to_integer())
                        .and_then(|i| i.checked_sub(&one));
                    pos.is_some_and(|p| entails_ge(system, &p))
                        || neg.is_some_and(|n| entails_ge(system, &n))
                }
            })
        }
    }
}

/// Facts entail `goal >= 0` iff facts plus `-goal - 1 >= 0` (i.e.
/// `goal < 0` over integers) are infeasible.
fn entails_ge(system: &FactSystem, goal: &LinExpr) -> bool {
    let Some(goal_int) = goal.to_integer() else {
        return false;
    };
    let negated = match goal_int
        .checked_scale(Rational::from_int(-1))
        .and_then(|n| n.checked_sub(&LinExpr::constant(Rational::ONE)))
    {
        Some(n) => n,
        None => return false,
    };

    let mut constraints = system.ges.clone();
    constraints.push(negated);
    add_length_bounds(&mut constraints);
    is_infeasible(constraints)
}

/// `len(...) >= 0` is always assumed for arrays: add the bound for every
/// length atom that appears in the system.
fn add_length_bounds(constraints: &mut Vec<LinExpr>) {
    let mut length_atoms = Vec::new();
    for c in constraints.iter() {
        for key in c.terms.keys() {
            if key.starts_with("len(") && !length_atoms.contains(key) {
                length_atoms.push(key.clone());
            }
        }
    }
    for key in length_atoms {
        constraints.push(LinExpr::atom(key));
    }
}

/// Fourier-Motzkin feasibility check over `e >= 0` constraints.
///
/// Eliminates one atom at a time; returns `true` only when a plain
/// negative constant falls out (definitely infeasible). Bails out
/// (returning `false`, "cannot prove") if the system grows past fixed
/// limits or an operation overflows.
fn is_infeasible(mut constraints: Vec<LinExpr>) -> bool {
    const MAX_ATOMS: usize = 8;
    const MAX_CONSTRAINTS: usize = 128;

    loop {
        // Constant constraints either witness infeasibility or vanish.
        let mut next = Vec::new();
        for c in constraints {
            if c.is_constant() {
                if c.constant.is_negative() {
                    return true;
                }
            } else {
                next.push(c);
            }
        }
        constraints = next;

        if constraints.is_empty() {
            return false;
        }
        if constraints.len() > MAX_CONSTRAINTS {
            return false;
        }

        // Deterministic atom choice: smallest key across all constraints.
        let atom = constraints
            .iter()
            .flat_map(|c| c.terms.keys())
            .min()
            .expect("non-constant constraints have atoms")
            .clone();

        let atom_count = {
            let mut keys: Vec<&String> =
                constraints.iter().flat_map(|c| c.terms.keys()).collect();
            keys.sort();
            keys.dedup();
            keys.len()
        };
        if atom_count > MAX_ATOMS {
            return false;
        }

        let mut lowers = Vec::new(); // positive coefficient on `atom`
        let mut uppers = Vec::new(); // negative coefficient
        let mut rest = Vec::new();
        for c in constraints {
            let coeff = c.coefficient(&atom);
            if coeff.is_positive() {
                lowers.push(c);
            } else if coeff.is_negative() {
                uppers.push(c);
            } else {
                rest.push(c);
            }
        }

        // Unbounded on one side: every constraint mentioning the atom is
        // satisfiable by pushing the atom far enough; drop them.
        if lowers.is_empty() || uppers.is_empty() {
            constraints = rest;
            continue;
        }

        // Combine each lower/upper pair with positive multipliers chosen
        // to cancel the atom.
        for low in &lowers {
            for up in &uppers {
                let cl = low.coefficient(&atom);
                let cu = up.coefficient(&atom);
                let combined = (|| {
                    let neg_cu = cu.checked_neg()?;
                    low.checked_scale(neg_cu)?.checked_add(&up.checked_scale(cl)?)
                })();
                match combined {
                    Some(c) => rest.push(c),
                    None => return false, // overflow: bail, cannot prove
                }
            }
        }
        constraints = rest;
    }
}
