//! Unification engine for Rill type inference.
//!
//! The ordinary occurs-checked syntactic unifier over `ena`'s union-find
//! table, with the Rill-specific rules:
//! - refined types unify through their base types; predicates never
//!   participate in unification (obligations handle them),
//! - effect rows are not unified here; the effect checker enforces them
//!   against declared rows,
//! - `Never` unifies with anything.

use ena::unify::InPlaceUnificationTable;

use rill_common::diagnostics::{Diagnostic, Structured};
use rill_common::span::Span;

use crate::ty::{Ty, TyVar};

/// The inference context: owns the unification table and collects
/// unification diagnostics.
pub struct InferCtx {
    table: InPlaceUnificationTable<TyVar>,
    pub diagnostics: Vec<Diagnostic>,
}

impl InferCtx {
    pub fn new() -> Self {
        InferCtx {
            table: InPlaceUnificationTable::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Create a fresh type variable.
    pub fn fresh_var(&mut self) -> Ty {
        Ty::Var(self.table.new_key(None))
    }

    /// Resolve a type by following union-find indirection recursively.
    pub fn resolve(&mut self, ty: Ty) -> Ty {
        match ty {
            Ty::Var(v) => match self.table.probe_value(v) {
                Some(inner) => self.resolve(inner),
                None => Ty::Var(self.table.find(v)),
            },
            Ty::App(con, args) => {
                let con = Box::new(self.resolve(*con));
                let args = args.into_iter().map(|a| self.resolve(a)).collect();
                Ty::App(con, args)
            }
            Ty::Fun { params, ret, effects } => Ty::Fun {
                params: params.into_iter().map(|p| self.resolve(p)).collect(),
                ret: Box::new(self.resolve(*ret)),
                effects,
            },
            Ty::Tuple(elems) => {
                Ty::Tuple(elems.into_iter().map(|e| self.resolve(e)).collect())
            }
            Ty::Array(elem) => Ty::Array(Box::new(self.resolve(*elem))),
            Ty::Record { fields, open } => Ty::Record {
                fields: fields
                    .into_iter()
                    .map(|(name, ty)| (name, self.resolve(ty)))
                    .collect(),
                open,
            },
            Ty::Refined { base, var, pred } => Ty::Refined {
                base: Box::new(self.resolve(*base)),
                var,
                pred,
            },
            other => other,
        }
    }

    /// Occurs check: does `var` appear anywhere within `ty`?
    pub fn occurs_in(&mut self, var: TyVar, ty: &Ty) -> bool {
        match ty {
            Ty::Var(v) => {
                if *v == var {
                    return true;
                }
                match self.table.probe_value(*v) {
                    Some(inner) => self.occurs_in(var, &inner),
                    None => false,
                }
            }
            Ty::Con(_) | Ty::Never => false,
            Ty::App(con, args) => {
                self.occurs_in(var, con) || args.iter().any(|a| self.occurs_in(var, a))
            }
            Ty::Fun { params, ret, .. } => {
                params.iter().any(|p| self.occurs_in(var, p)) || self.occurs_in(var, ret)
            }
            Ty::Tuple(elems) => elems.iter().any(|e| self.occurs_in(var, e)),
            Ty::Array(elem) => self.occurs_in(var, elem),
            Ty::Record { fields, .. } => fields.values().any(|t| self.occurs_in(var, t)),
            Ty::Refined { base, .. } => self.occurs_in(var, base),
        }
    }

    /// Unify two types, recording an `E2001` diagnostic at `span` on
    /// failure. The error is non-fatal; inference continues with whatever
    /// was bound before the failure.
    pub fn unify(&mut self, a: Ty, b: Ty, span: &Span) -> Result<(), ()> {
        let a = self.resolve(a);
        let b = self.resolve(b);

        match (a, b) {
            // Refined types unify through their bases.
            (Ty::Refined { base, .. }, other) | (other, Ty::Refined { base, .. }) => {
                self.unify(*base, other, span)
            }

            (Ty::Var(v1), Ty::Var(v2)) if v1 == v2 => Ok(()),

            (Ty::Var(v1), Ty::Var(v2)) => {
                self.table
                    .unify_var_var(v1, v2)
                    .expect("unifying two unbound vars cannot fail");
                Ok(())
            }

            (Ty::Var(v), ty) | (ty, Ty::Var(v)) => {
                if self.occurs_in(v, &ty) {
                    self.mismatch(&Ty::Var(v), &ty, span);
                    Err(())
                } else {
                    self.table
                        .unify_var_value(v, Some(ty))
                        .expect("binding after occurs check cannot fail");
                    Ok(())
                }
            }

            (Ty::Con(c1), Ty::Con(c2)) => {
                if c1 == c2 {
                    Ok(())
                } else {
                    self.mismatch(&Ty::Con(c1), &Ty::Con(c2), span);
                    Err(())
                }
            }

            (Ty::App(c1, a1), Ty::App(c2, a2)) => {
                if a1.len() != a2.len() {
                    self.mismatch(
                        &Ty::App(c1.clone(), a1.clone()),
                        &Ty::App(c2.clone(), a2.clone()),
                        span,
                    );
                    return Err(());
                }
                self.unify(*c1, *c2, span)?;
                for (x, y) in a1.into_iter().zip(a2) {
                    self.unify(x, y, span)?;
                }
                Ok(())
            }

            // Function types: parameter count, each parameter, the return
            // type. Effect-row mismatches are the effect checker's job.
            (
                Ty::Fun { params: p1, ret: r1, effects: e1 },
                Ty::Fun { params: p2, ret: r2, effects: e2 },
            ) => {
                if p1.len() != p2.len() {
                    self.mismatch(
                        &Ty::Fun { params: p1.clone(), ret: r1.clone(), effects: e1 },
                        &Ty::Fun { params: p2.clone(), ret: r2.clone(), effects: e2 },
                        span,
                    );
                    return Err(());
                }
                for (x, y) in p1.into_iter().zip(p2) {
                    self.unify(x, y, span)?;
                }
                self.unify(*r1, *r2, span)
            }

            (Ty::Tuple(e1), Ty::Tuple(e2)) => {
                if e1.len() != e2.len() {
                    self.mismatch(&Ty::Tuple(e1.clone()), &Ty::Tuple(e2.clone()), span);
                    return Err(());
                }
                for (x, y) in e1.into_iter().zip(e2) {
                    self.unify(x, y, span)?;
                }
                Ok(())
            }

            (Ty::Array(e1), Ty::Array(e2)) => self.unify(*e1, *e2, span),

            (
                Ty::Record { fields: f1, open: o1 },
                Ty::Record { fields: f2, open: o2 },
            ) => {
                // Closed records need identical field sets; an open record
                // needs its fields present on the other side.
                let keys_match = match (o1, o2) {
                    (false, false) => f1.len() == f2.len() && f1.keys().eq(f2.keys()),
                    (true, false) => f1.keys().all(|k| f2.contains_key(k)),
                    (false, true) => f2.keys().all(|k| f1.contains_key(k)),
                    (true, true) => true,
                };
                if !keys_match {
                    self.mismatch(
                        &Ty::Record { fields: f1.clone(), open: o1 },
                        &Ty::Record { fields: f2.clone(), open: o2 },
                        span,
                    );
                    return Err(());
                }
                for (name, t1) in &f1 {
                    if let Some(t2) = f2.get(name) {
                        self.unify(t1.clone(), t2.clone(), span)?;
                    }
                }
                Ok(())
            }

            (Ty::Never, _) | (_, Ty::Never) => Ok(()),

            (a, b) => {
                self.mismatch(&a, &b, span);
                Err(())
            }
        }
    }

    fn mismatch(&mut self, expected: &Ty, actual: &Ty, span: &Span) {
        self.diagnostics.push(Diagnostic::new(
            Structured::TypeMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
            },
            format!("type mismatch: expected `{expected}`, found `{actual}`"),
            span.clone(),
        ));
    }
}

impl Default for InferCtx {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectSet;
    use crate::refine::{CmpOp, Predicate, Term};

    fn span() -> Span {
        Span::synthetic()
    }

    #[test]
    fn unify_var_with_concrete() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        assert!(ctx.unify(a.clone(), Ty::int(), &span()).is_ok());
        assert_eq!(ctx.resolve(a), Ty::int());
    }

    #[test]
    fn unify_two_vars_then_bind() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        let b = ctx.fresh_var();
        assert!(ctx.unify(a.clone(), b.clone(), &span()).is_ok());
        assert!(ctx.unify(a, Ty::str(), &span()).is_ok());
        assert_eq!(ctx.resolve(b), Ty::str());
    }

    #[test]
    fn unify_mismatch_records_e2001() {
        let mut ctx = InferCtx::new();
        assert!(ctx.unify(Ty::int(), Ty::str(), &span()).is_err());
        assert_eq!(ctx.diagnostics.len(), 1);
        assert_eq!(ctx.diagnostics[0].code, "E2001");
    }

    #[test]
    fn occurs_check_rejects_infinite_type() {
        let mut ctx = InferCtx::new();
        let a = ctx.fresh_var();
        let fun = Ty::fun(vec![a.clone()], Ty::int(), EffectSet::empty());
        assert!(ctx.unify(a, fun, &span()).is_err());
    }

    #[test]
    fn refined_unifies_with_base() {
        let mut ctx = InferCtx::new();
        let refined = Ty::Refined {
            base: Box::new(Ty::int()),
            var: "n".into(),
            pred: Predicate::Cmp {
                op: CmpOp::Ge,
                lhs: Term::Var("n".into()),
                rhs: Term::Int(0),
            },
        };
        assert!(ctx.unify(refined.clone(), Ty::int(), &span()).is_ok());
        // And with a variable: the variable binds to the refinement's base
        // type through the refined layer.
        let v = ctx.fresh_var();
        assert!(ctx.unify(v.clone(), refined, &span()).is_ok());
        assert_eq!(ctx.resolve(v), Ty::int());
    }

    #[test]
    fn effect_rows_do_not_block_unification() {
        let mut ctx = InferCtx::new();
        let pure = Ty::fun(vec![Ty::int()], Ty::unit(), EffectSet::empty());
        let io = Ty::fun(vec![Ty::int()], Ty::unit(), EffectSet::IO);
        assert!(ctx.unify(pure, io, &span()).is_ok());
    }

    #[test]
    fn array_and_tuple_unification() {
        let mut ctx = InferCtx::new();
        let elem = ctx.fresh_var();
        assert!(ctx
            .unify(Ty::array(elem.clone()), Ty::array(Ty::bool()), &span())
            .is_ok());
        assert_eq!(ctx.resolve(elem), Ty::bool());

        assert!(ctx
            .unify(
                Ty::Tuple(vec![Ty::int()]),
                Ty::Tuple(vec![Ty::int(), Ty::int()]),
                &span()
            )
            .is_err());
    }

    #[test]
    fn open_record_unifies_with_wider_closed_record() {
        let mut ctx = InferCtx::new();
        let open = Ty::Record {
            fields: [("x".to_string(), Ty::int())].into_iter().collect(),
            open: true,
        };
        let closed = Ty::Record {
            fields: [
                ("x".to_string(), Ty::int()),
                ("y".to_string(), Ty::str()),
            ]
            .into_iter()
            .collect(),
            open: false,
        };
        assert!(ctx.unify(open, closed.clone(), &span()).is_ok());

        let narrow_closed = Ty::Record {
            fields: [("x".to_string(), Ty::int())].into_iter().collect(),
            open: false,
        };
        assert!(ctx.unify(narrow_closed, closed, &span()).is_err());
    }

    #[test]
    fn never_unifies_with_anything() {
        let mut ctx = InferCtx::new();
        assert!(ctx.unify(Ty::Never, Ty::int(), &span()).is_ok());
        assert!(ctx.unify(Ty::str(), Ty::Never, &span()).is_ok());
    }
}
