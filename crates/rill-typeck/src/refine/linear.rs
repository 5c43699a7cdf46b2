//! Rational linear forms for the refinement solver.
//!
//! Every arithmetic term is normalized into `Σ cᵢ·atomᵢ + k` with exact
//! rational coefficients over `i128`. Atoms are canonical string renderings
//! of variables and uninterpreted applications (`x`, `p.x`, `len(arr)`),
//! kept in a `BTreeMap` so iteration order -- and therefore the whole
//! solver -- is deterministic. Any overflow makes the operation return
//! `None`; the caller leaves the obligation open rather than guess.

use std::collections::BTreeMap;

use super::predicate::{ArithOp, CmpOp, Term};

/// An exact rational with positive denominator, always reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    num: i128,
    den: i128,
}

fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

impl Default for Rational {
    fn default() -> Self {
        Rational::ZERO
    }
}

impl Rational {
    pub const ZERO: Rational = Rational { num: 0, den: 1 };
    pub const ONE: Rational = Rational { num: 1, den: 1 };

    pub fn from_int(v: i128) -> Rational {
        Rational { num: v, den: 1 }
    }

    pub fn new(num: i128, den: i128) -> Option<Rational> {
        if den == 0 {
            return None;
        }
        let sign = if den < 0 { -1 } else { 1 };
        let num = num.checked_mul(sign)?;
        let den = den.checked_mul(sign)?;
        let g = gcd(num, den);
        Some(Rational { num: num / g, den: den / g })
    }

    pub fn numerator(self) -> i128 {
        self.num
    }

    pub fn denominator(self) -> i128 {
        self.den
    }

    pub fn is_zero(self) -> bool {
        self.num == 0
    }

    pub fn is_negative(self) -> bool {
        self.num < 0
    }

    pub fn is_positive(self) -> bool {
        self.num > 0
    }

    pub fn checked_add(self, other: Rational) -> Option<Rational> {
        let num = self
            .num
            .checked_mul(other.den)?
            .checked_add(other.num.checked_mul(self.den)?)?;
        Rational::new(num, self.den.checked_mul(other.den)?)
    }

    pub fn checked_sub(self, other: Rational) -> Option<Rational> {
        self.checked_add(other.checked_neg()?)
    }

    pub fn checked_mul(self, other: Rational) -> Option<Rational> {
        Rational::new(self.num.checked_mul(other.num)?, self.den.checked_mul(other.den)?)
    }

    pub fn checked_div(self, other: Rational) -> Option<Rational> {
        if other.is_zero() {
            return None;
        }
        Rational::new(self.num.checked_mul(other.den)?, self.den.checked_mul(other.num)?)
    }

    pub fn checked_neg(self) -> Option<Rational> {
        Some(Rational { num: self.num.checked_neg()?, den: self.den })
    }
}

/// A linear expression `Σ cᵢ·atomᵢ + k`. Zero-coefficient atoms are never
/// stored.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinExpr {
    pub terms: BTreeMap<String, Rational>,
    pub constant: Rational,
}

impl LinExpr {
    pub fn constant(value: Rational) -> LinExpr {
        LinExpr { terms: BTreeMap::new(), constant: value }
    }

    pub fn atom(key: String) -> LinExpr {
        let mut terms = BTreeMap::new();
        terms.insert(key, Rational::ONE);
        LinExpr { terms, constant: Rational::ZERO }
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn coefficient(&self, key: &str) -> Rational {
        self.terms.get(key).copied().unwrap_or(Rational::ZERO)
    }

    pub fn checked_add(&self, other: &LinExpr) -> Option<LinExpr> {
        let mut terms = self.terms.clone();
        for (key, coeff) in &other.terms {
            let sum = terms
                .get(key)
                .copied()
                .unwrap_or(Rational::ZERO)
                .checked_add(*coeff)?;
            if sum.is_zero() {
                terms.remove(key);
            } else {
                terms.insert(key.clone(), sum);
            }
        }
        Some(LinExpr {
            terms,
            constant: self.constant.checked_add(other.constant)?,
        })
    }

    pub fn checked_sub(&self, other: &LinExpr) -> Option<LinExpr> {
        self.checked_add(&other.checked_scale(Rational::from_int(-1))?)
    }

    pub fn checked_scale(&self, factor: Rational) -> Option<LinExpr> {
        if factor.is_zero() {
            return Some(LinExpr::constant(Rational::ZERO));
        }
        let mut terms = BTreeMap::new();
        for (key, coeff) in &self.terms {
            terms.insert(key.clone(), coeff.checked_mul(factor)?);
        }
        Some(LinExpr {
            terms,
            constant: self.constant.checked_mul(factor)?,
        })
    }

    /// Scale so every coefficient and the constant are integers (multiply
    /// by the lcm of denominators). The scaling factor is positive, so
    /// comparison direction is preserved.
    pub fn to_integer(&self) -> Option<LinExpr> {
        let mut lcm: i128 = self.constant.den;
        for coeff in self.terms.values() {
            let g = gcd(lcm, coeff.den);
            lcm = (lcm / g).checked_mul(coeff.den)?;
        }
        self.checked_scale(Rational::from_int(lcm))
    }

    /// Replace atom `key` with `replacement` throughout.
    pub fn substitute(&self, key: &str, replacement: &LinExpr) -> Option<LinExpr> {
        let Some(coeff) = self.terms.get(key).copied() else {
            return Some(self.clone());
        };
        let mut without = self.clone();
        without.terms.remove(key);
        without.checked_add(&replacement.checked_scale(coeff)?)
    }
}

/// A normalized comparison: `expr >= 0`, `expr == 0`, or `expr != 0`.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Ge(LinExpr),
    Eq(LinExpr),
    Ne(LinExpr),
}

/// Linearize a symbolic term. `None` when the term leaves the linear
/// fragment (products of atoms, division by a non-constant, strings,
/// booleans) or overflows.
pub fn linearize(term: &Term) -> Option<LinExpr> {
    match term {
        Term::Int(v) => Some(LinExpr::constant(Rational::from_int(*v))),
        Term::Bool(_) | Term::Str(_) => None,
        Term::Var(_) | Term::Field(..) | Term::Call { .. } => {
            Some(LinExpr::atom(term.to_string()))
        }
        Term::Bin { op, lhs, rhs } => {
            let l = linearize(lhs)?;
            let r = linearize(rhs)?;
            match op {
                ArithOp::Add => l.checked_add(&r),
                ArithOp::Sub => l.checked_sub(&r),
                ArithOp::Mul => {
                    if l.is_constant() {
                        r.checked_scale(l.constant)
                    } else if r.is_constant() {
                        l.checked_scale(r.constant)
                    } else {
                        None
                    }
                }
                ArithOp::Div => {
                    if r.is_constant() && !r.constant.is_zero() {
                        l.checked_scale(Rational::ONE.checked_div(r.constant)?)
                    } else {
                        None
                    }
                }
            }
        }
    }
}

/// Normalize a comparison into constraints of the form `e >= 0` /
/// `e == 0` / `e != 0`. Strict inequalities are tightened by one, which
/// is sound because every atom is integer-valued.
pub fn normalize_cmp(op: CmpOp, lhs: &Term, rhs: &Term) -> Option<Vec<Constraint>> {
    let l = linearize(lhs)?;
    let r = linearize(rhs)?;
    let diff = l.checked_sub(&r)?; // lhs - rhs

    let tighten = |e: LinExpr| -> Option<LinExpr> {
        // e > 0 over integers is e >= 1, i.e. e - 1 >= 0.
        let int = e.to_integer()?;
        int.checked_sub(&LinExpr::constant(Rational::ONE))
    };

    Some(match op {
        CmpOp::Ge => vec![Constraint::Ge(diff)],
        CmpOp::Le => vec![Constraint::Ge(diff.checked_scale(Rational::from_int(-1))?)],
        CmpOp::Gt => vec![Constraint::Ge(tighten(diff)?)],
        CmpOp::Lt => {
            vec![Constraint::Ge(tighten(diff.checked_scale(Rational::from_int(-1))?)?)]
        }
        CmpOp::Eq => vec![Constraint::Eq(diff)],
        CmpOp::Ne => vec![Constraint::Ne(diff)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Term {
        Term::Var(name.to_string())
    }

    #[test]
    fn rational_arithmetic_reduces() {
        let half = Rational::new(2, 4).unwrap();
        assert_eq!(half, Rational::new(1, 2).unwrap());
        let sum = half.checked_add(half).unwrap();
        assert_eq!(sum, Rational::ONE);
    }

    #[test]
    fn rational_sign_normalization() {
        let r = Rational::new(3, -6).unwrap();
        assert_eq!(r, Rational::new(-1, 2).unwrap());
        assert!(r.is_negative());
    }

    #[test]
    fn linearize_combines_like_atoms() {
        // x + x + 1 => 2x + 1
        let term = Term::Bin {
            op: ArithOp::Add,
            lhs: Box::new(Term::Bin {
                op: ArithOp::Add,
                lhs: Box::new(var("x")),
                rhs: Box::new(var("x")),
            }),
            rhs: Box::new(Term::Int(1)),
        };
        let lin = linearize(&term).unwrap();
        assert_eq!(lin.coefficient("x"), Rational::from_int(2));
        assert_eq!(lin.constant, Rational::ONE);
    }

    #[test]
    fn linearize_rejects_nonlinear_products() {
        let term = Term::Bin {
            op: ArithOp::Mul,
            lhs: Box::new(var("x")),
            rhs: Box::new(var("y")),
        };
        assert!(linearize(&term).is_none());
    }

    #[test]
    fn len_is_an_opaque_atom() {
        let term = Term::Call { name: "len".into(), args: vec![var("arr")] };
        let lin = linearize(&term).unwrap();
        assert_eq!(lin.coefficient("len(arr)"), Rational::ONE);
    }

    #[test]
    fn strict_inequalities_are_tightened() {
        // x > 0 becomes x - 1 >= 0
        let cs = normalize_cmp(CmpOp::Gt, &var("x"), &Term::Int(0)).unwrap();
        match &cs[0] {
            Constraint::Ge(e) => {
                assert_eq!(e.coefficient("x"), Rational::ONE);
                assert_eq!(e.constant, Rational::from_int(-1));
            }
            other => panic!("expected Ge, got {other:?}"),
        }
    }

    #[test]
    fn substitution_into_linear_form() {
        // (2m + 3)[m := n + 1] = 2n + 5
        let two_m_plus_3 = LinExpr {
            terms: [("m".to_string(), Rational::from_int(2))].into_iter().collect(),
            constant: Rational::from_int(3),
        };
        let n_plus_1 = LinExpr {
            terms: [("n".to_string(), Rational::ONE)].into_iter().collect(),
            constant: Rational::ONE,
        };
        let result = two_m_plus_3.substitute("m", &n_plus_1).unwrap();
        assert_eq!(result.coefficient("n"), Rational::from_int(2));
        assert_eq!(result.constant, Rational::from_int(5));
    }
}
