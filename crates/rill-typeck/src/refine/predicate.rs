//! Refinement predicates: symbolic first-order formulas over integer,
//! boolean, and string terms.
//!
//! Predicates are extracted from ordinary expression syntax (the parser
//! has no separate predicate grammar). Anything the extractor cannot
//! classify becomes [`Predicate::Unknown`], which the solver never
//! discharges or refutes.

use std::collections::BTreeSet;
use std::fmt;

use rill_parser::ast::{BinaryOp, Expr, ExprKind, Literal, UnaryOp};

/// A comparison operator in a predicate atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn negate(self) -> CmpOp {
        match self {
            CmpOp::Eq => CmpOp::Ne,
            CmpOp::Ne => CmpOp::Eq,
            CmpOp::Lt => CmpOp::Ge,
            CmpOp::Le => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Le,
            CmpOp::Ge => CmpOp::Lt,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// An arithmetic operator inside a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

/// A symbolic term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Int(i128),
    Bool(bool),
    Str(String),
    Var(String),
    Field(Box<Term>, String),
    /// Uninterpreted function application, e.g. `len(arr)`.
    Call { name: String, args: Vec<Term> },
    Bin { op: ArithOp, lhs: Box<Term>, rhs: Box<Term> },
}

impl Term {
    /// Replace every occurrence of variable `var` with `replacement`.
    pub fn substitute(&self, var: &str, replacement: &Term) -> Term {
        match self {
            Term::Var(name) if name == var => replacement.clone(),
            Term::Int(_) | Term::Bool(_) | Term::Str(_) | Term::Var(_) => self.clone(),
            Term::Field(base, field) => {
                Term::Field(Box::new(base.substitute(var, replacement)), field.clone())
            }
            Term::Call { name, args } => Term::Call {
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(var, replacement)).collect(),
            },
            Term::Bin { op, lhs, rhs } => Term::Bin {
                op: *op,
                lhs: Box::new(lhs.substitute(var, replacement)),
                rhs: Box::new(rhs.substitute(var, replacement)),
            },
        }
    }

    fn collect_free_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::Var(name) => {
                out.insert(name.clone());
            }
            Term::Int(_) | Term::Bool(_) | Term::Str(_) => {}
            Term::Field(base, _) => base.collect_free_vars(out),
            Term::Call { args, .. } => {
                for a in args {
                    a.collect_free_vars(out);
                }
            }
            Term::Bin { lhs, rhs, .. } => {
                lhs.collect_free_vars(out);
                rhs.collect_free_vars(out);
            }
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Int(v) => write!(f, "{v}"),
            Term::Bool(v) => write!(f, "{v}"),
            Term::Str(s) => write!(f, "{s:?}"),
            Term::Var(name) => write!(f, "{name}"),
            Term::Field(base, field) => write!(f, "{base}.{field}"),
            Term::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Term::Bin { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
        }
    }
}

/// A refinement predicate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Predicate {
    True,
    False,
    /// A formula the extractor could not classify. Never discharged.
    Unknown,
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
    Cmp { op: CmpOp, lhs: Term, rhs: Term },
}

impl Predicate {
    pub fn and(lhs: Predicate, rhs: Predicate) -> Predicate {
        Predicate::And(Box::new(lhs), Box::new(rhs))
    }

    pub fn cmp(op: CmpOp, lhs: Term, rhs: Term) -> Predicate {
        Predicate::Cmp { op, lhs, rhs }
    }

    /// Logical negation, pushed through comparisons immediately.
    pub fn negate(&self) -> Predicate {
        match self {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Unknown => Predicate::Unknown,
            Predicate::Not(inner) => (**inner).clone(),
            Predicate::Cmp { op, lhs, rhs } => Predicate::Cmp {
                op: op.negate(),
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            },
            other => Predicate::Not(Box::new(other.clone())),
        }
    }

    /// Replace every occurrence of variable `var` with `replacement`.
    pub fn substitute(&self, var: &str, replacement: &Term) -> Predicate {
        match self {
            Predicate::True | Predicate::False | Predicate::Unknown => self.clone(),
            Predicate::And(a, b) => Predicate::And(
                Box::new(a.substitute(var, replacement)),
                Box::new(b.substitute(var, replacement)),
            ),
            Predicate::Or(a, b) => Predicate::Or(
                Box::new(a.substitute(var, replacement)),
                Box::new(b.substitute(var, replacement)),
            ),
            Predicate::Not(inner) => Predicate::Not(Box::new(inner.substitute(var, replacement))),
            Predicate::Cmp { op, lhs, rhs } => Predicate::Cmp {
                op: *op,
                lhs: lhs.substitute(var, replacement),
                rhs: rhs.substitute(var, replacement),
            },
        }
    }

    /// Free variables, in sorted order.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_free_vars(&mut out);
        out
    }

    fn collect_free_vars(&self, out: &mut BTreeSet<String>) {
        match self {
            Predicate::True | Predicate::False | Predicate::Unknown => {}
            Predicate::And(a, b) | Predicate::Or(a, b) => {
                a.collect_free_vars(out);
                b.collect_free_vars(out);
            }
            Predicate::Not(inner) => inner.collect_free_vars(out),
            Predicate::Cmp { lhs, rhs, .. } => {
                lhs.collect_free_vars(out);
                rhs.collect_free_vars(out);
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => write!(f, "true"),
            Predicate::False => write!(f, "false"),
            Predicate::Unknown => write!(f, "<unknown>"),
            Predicate::And(a, b) => write!(f, "({a} && {b})"),
            Predicate::Or(a, b) => write!(f, "({a} || {b})"),
            Predicate::Not(inner) => write!(f, "!{inner}"),
            Predicate::Cmp { op, lhs, rhs } => write!(f, "{lhs} {} {rhs}", op.symbol()),
        }
    }
}

// ── Extraction from expressions ────────────────────────────────────────

/// Extract a predicate from an expression (a refinement body, an `if`
/// condition). Unclassifiable sub-formulas become `Unknown`.
pub fn extract_predicate(expr: &Expr) -> Predicate {
    match &expr.kind {
        ExprKind::Literal(Literal::Bool(true)) => Predicate::True,
        ExprKind::Literal(Literal::Bool(false)) => Predicate::False,
        ExprKind::Unary { op: UnaryOp::Not, operand } => extract_predicate(operand).negate(),
        ExprKind::Binary { op, lhs, rhs } => match op {
            BinaryOp::And => {
                Predicate::and(extract_predicate(lhs), extract_predicate(rhs))
            }
            BinaryOp::Or => Predicate::Or(
                Box::new(extract_predicate(lhs)),
                Box::new(extract_predicate(rhs)),
            ),
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt
            | BinaryOp::GtEq => {
                match (extract_term(lhs), extract_term(rhs)) {
                    (Some(l), Some(r)) => Predicate::Cmp {
                        op: match op {
                            BinaryOp::Eq => CmpOp::Eq,
                            BinaryOp::NotEq => CmpOp::Ne,
                            BinaryOp::Lt => CmpOp::Lt,
                            BinaryOp::LtEq => CmpOp::Le,
                            BinaryOp::Gt => CmpOp::Gt,
                            _ => CmpOp::Ge,
                        },
                        lhs: l,
                        rhs: r,
                    },
                    _ => Predicate::Unknown,
                }
            }
            _ => Predicate::Unknown,
        },
        _ => Predicate::Unknown,
    }
}

/// Extract a symbolic term from an expression. Returns `None` when the
/// expression is not in the term fragment (calls with non-name callees,
/// blocks, out-of-range integers, ...).
pub fn extract_term(expr: &Expr) -> Option<Term> {
    match &expr.kind {
        ExprKind::Literal(Literal::Int { digits, .. }) => {
            digits.parse::<i128>().ok().map(Term::Int)
        }
        ExprKind::Literal(Literal::Bool(v)) => Some(Term::Bool(*v)),
        ExprKind::Literal(Literal::Str(s)) => Some(Term::Str(s.clone())),
        ExprKind::Ident(name) => Some(Term::Var(name.clone())),
        ExprKind::Field { base, name } => {
            Some(Term::Field(Box::new(extract_term(base)?), name.clone()))
        }
        ExprKind::Unary { op: UnaryOp::Neg, operand } => Some(Term::Bin {
            op: ArithOp::Sub,
            lhs: Box::new(Term::Int(0)),
            rhs: Box::new(extract_term(operand)?),
        }),
        ExprKind::Binary { op, lhs, rhs } => {
            let op = match op {
                BinaryOp::Add => ArithOp::Add,
                BinaryOp::Sub => ArithOp::Sub,
                BinaryOp::Mul => ArithOp::Mul,
                BinaryOp::Div => ArithOp::Div,
                _ => return None,
            };
            Some(Term::Bin {
                op,
                lhs: Box::new(extract_term(lhs)?),
                rhs: Box::new(extract_term(rhs)?),
            })
        }
        ExprKind::Call { callee, args } => {
            let ExprKind::Ident(name) = &callee.kind else {
                return None;
            };
            let args = args.iter().map(extract_term).collect::<Option<Vec<_>>>()?;
            Some(Term::Call { name: name.clone(), args })
        }
        _ => None,
    }
}
