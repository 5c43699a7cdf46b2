//! Semantic type representation for the Rill type system.
//!
//! Distinct from type-expressions: these are the types inference works
//! with. Refined types carry their predicate but unify through their base
//! type; effects live directly on function types as a set over
//! `{IO, Err, Async, Mut}`.

use std::collections::BTreeMap;
use std::fmt;

use crate::effects::EffectSet;
use crate::refine::Predicate;

/// A type variable, identified by a `u32` index into the unification table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyVar(pub u32);

/// A type constructor -- a named type like `Int`, `Str`, `Option`, or a
/// rigid type parameter in scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TyCon {
    pub name: String,
}

impl TyCon {
    pub fn new(name: impl Into<String>) -> Self {
        TyCon { name: name.into() }
    }
}

impl fmt::Display for TyCon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A Rill type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// An inference variable, resolved by unification.
    Var(TyVar),
    /// A nullary constructor: `Int`, `Str`, `Direction`, a type parameter.
    Con(TyCon),
    /// A constructor applied to arguments: `Option<Int>`, `Result<T, E>`.
    App(Box<Ty>, Vec<Ty>),
    /// A function type with its effect row.
    Fun {
        params: Vec<Ty>,
        ret: Box<Ty>,
        effects: EffectSet,
    },
    /// `(Int, Str)`.
    Tuple(Vec<Ty>),
    /// `[Int]`.
    Array(Box<Ty>),
    /// A record type; `open` records admit extra fields.
    Record {
        fields: BTreeMap<String, Ty>,
        open: bool,
    },
    /// A base type narrowed by a predicate. Unifies through `base`;
    /// obligation generation handles the predicate.
    Refined {
        base: Box<Ty>,
        var: String,
        pred: Predicate,
    },
    /// The bottom type.
    Never,
}

impl Ty {
    pub fn int() -> Ty {
        Ty::Con(TyCon::new("Int"))
    }

    pub fn float() -> Ty {
        Ty::Con(TyCon::new("Float"))
    }

    pub fn str() -> Ty {
        Ty::Con(TyCon::new("Str"))
    }

    pub fn bool() -> Ty {
        Ty::Con(TyCon::new("Bool"))
    }

    pub fn unit() -> Ty {
        Ty::Con(TyCon::new("Unit"))
    }

    pub fn array(elem: Ty) -> Ty {
        Ty::Array(Box::new(elem))
    }

    pub fn option(inner: Ty) -> Ty {
        Ty::App(Box::new(Ty::Con(TyCon::new("Option"))), vec![inner])
    }

    pub fn result(ok: Ty, err: Ty) -> Ty {
        Ty::App(Box::new(Ty::Con(TyCon::new("Result"))), vec![ok, err])
    }

    pub fn fun(params: Vec<Ty>, ret: Ty, effects: EffectSet) -> Ty {
        Ty::Fun { params, ret: Box::new(ret), effects }
    }

    /// Strip refinement layers, yielding the underlying base type.
    pub fn strip_refinement(&self) -> &Ty {
        match self {
            Ty::Refined { base, .. } => base.strip_refinement(),
            other => other,
        }
    }

    /// The refinement on this type, if any: `(var, predicate)`.
    pub fn refinement(&self) -> Option<(&str, &Predicate)> {
        match self {
            Ty::Refined { var, pred, .. } => Some((var, pred)),
            _ => None,
        }
    }

    /// Whether the resolved type is a concrete constructor of this name.
    pub fn is_con(&self, name: &str) -> bool {
        matches!(self, Ty::Con(c) if c.name == name)
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Var(v) => write!(f, "?{}", v.0),
            Ty::Con(c) => write!(f, "{c}"),
            Ty::App(con, args) => {
                write!(f, "{con}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Ty::Fun { params, ret, effects } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> ")?;
                if !effects.is_empty() {
                    write!(f, "{effects} + ")?;
                }
                write!(f, "{ret}")
            }
            Ty::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            Ty::Array(elem) => write!(f, "[{elem}]"),
            Ty::Record { fields, open } => {
                write!(f, "{{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                if *open {
                    if !fields.is_empty() {
                        write!(f, ", ")?;
                    }
                    write!(f, "..")?;
                }
                write!(f, "}}")
            }
            Ty::Refined { base, var, pred } => write!(f, "{base}{{{var} | {pred}}}"),
            Ty::Never => write!(f, "Never"),
        }
    }
}

// ── ena trait implementations ──────────────────────────────────────────

impl ena::unify::UnifyKey for TyVar {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyVar(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

impl ena::unify::EqUnifyValue for Ty {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::{CmpOp, Predicate, Term};

    #[test]
    fn display_forms() {
        assert_eq!(Ty::int().to_string(), "Int");
        assert_eq!(Ty::array(Ty::int()).to_string(), "[Int]");
        assert_eq!(Ty::option(Ty::str()).to_string(), "Option<Str>");
        assert_eq!(
            Ty::fun(vec![Ty::int()], Ty::unit(), EffectSet::IO).to_string(),
            "(Int) -> IO + Unit"
        );
        assert_eq!(
            Ty::Tuple(vec![Ty::int(), Ty::bool()]).to_string(),
            "(Int, Bool)"
        );
    }

    #[test]
    fn refined_display_and_strip() {
        let refined = Ty::Refined {
            base: Box::new(Ty::int()),
            var: "n".into(),
            pred: Predicate::Cmp {
                op: CmpOp::Gt,
                lhs: Term::Var("n".into()),
                rhs: Term::Int(0),
            },
        };
        assert_eq!(refined.to_string(), "Int{n | n > 0}");
        assert_eq!(refined.strip_refinement(), &Ty::int());
        assert!(refined.refinement().is_some());
    }
}
