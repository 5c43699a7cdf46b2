//! Effect rows and the effect checker.
//!
//! Every function declares an effect row (`IO + Err + Result`); the set of
//! allowed effect names is closed: `IO`, `Err`, `Async`, `Mut`. Declared
//! rows are authoritative: a call is legal iff the callee's declared
//! effects are a subset of the caller's, `?` requires `Err`, and
//! assignment requires `Mut` unless the target binding is locally `mut`.
//!
//! Lambda bodies are deliberately not visited: a lambda's effects are
//! latent and surface at its call sites.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};

use rill_common::diagnostics::{Diagnostic, Structured};
use rill_parser::ast::{
    BinaryOp, Block, DeclKind, Expr, ExprKind, Pattern, PatternKind, Program, Stmt, StmtKind,
};

/// A set of effect labels, stored as a bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EffectSet(u8);

impl EffectSet {
    pub const IO: EffectSet = EffectSet(1 << 0);
    pub const ERR: EffectSet = EffectSet(1 << 1);
    pub const ASYNC: EffectSet = EffectSet(1 << 2);
    pub const MUT: EffectSet = EffectSet(1 << 3);

    pub fn empty() -> EffectSet {
        EffectSet(0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: EffectSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(self, other: EffectSet) -> EffectSet {
        EffectSet(self.0 | other.0)
    }

    pub fn insert(&mut self, other: EffectSet) {
        self.0 |= other.0;
    }

    pub fn is_subset_of(self, other: EffectSet) -> bool {
        other.contains(self)
    }

    /// Effects in `self` that are missing from `other`.
    pub fn difference(self, other: EffectSet) -> EffectSet {
        EffectSet(self.0 & !other.0)
    }

    /// Parse one effect label. Returns `None` for anything outside the
    /// closed set.
    pub fn from_name(name: &str) -> Option<EffectSet> {
        match name {
            "IO" => Some(EffectSet::IO),
            "Err" => Some(EffectSet::ERR),
            "Async" => Some(EffectSet::ASYNC),
            "Mut" => Some(EffectSet::MUT),
            _ => None,
        }
    }

    /// Member names in canonical order.
    pub fn names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(EffectSet::IO) {
            names.push("IO");
        }
        if self.contains(EffectSet::ERR) {
            names.push("Err");
        }
        if self.contains(EffectSet::ASYNC) {
            names.push("Async");
        }
        if self.contains(EffectSet::MUT) {
            names.push("Mut");
        }
        names
    }
}

impl fmt::Display for EffectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "pure");
        }
        write!(f, "{}", self.names().join(" + "))
    }
}

impl Serialize for EffectSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.names().serialize(serializer)
    }
}

// ── Effect checking pass ───────────────────────────────────────────────

struct EffectChecker<'a> {
    /// Declared effect rows by function name (user functions, externals,
    /// and built-ins).
    effect_table: &'a FxHashMap<String, EffectSet>,
    diagnostics: Vec<Diagnostic>,
    /// Names of locally `mut`-declared bindings, one frame per scope.
    mut_scopes: Vec<Vec<String>>,
    current_fn: String,
    declared: EffectSet,
}

/// Check every function body against its declared effect row.
pub fn check_effects(
    program: &Program,
    effect_table: &FxHashMap<String, EffectSet>,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for decl in &program.decls {
        if let DeclKind::Function(f) = &decl.kind {
            let declared = effect_table.get(&f.name).copied().unwrap_or_default();
            let mut checker = EffectChecker {
                effect_table,
                diagnostics: Vec::new(),
                mut_scopes: vec![Vec::new()],
                current_fn: f.name.clone(),
                declared,
            };
            checker.check_expr(&f.body);
            diagnostics.extend(checker.diagnostics);
        }
    }
    diagnostics
}

impl EffectChecker<'_> {
    fn check_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Call { callee, args } => {
                self.check_callee(callee);
                for arg in args {
                    self.check_expr(arg);
                }
            }
            ExprKind::Binary { op: BinaryOp::Pipe, lhs, rhs } => {
                // `x |> f` is a call to `f`.
                self.check_expr(lhs);
                self.check_callee(rhs);
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.check_expr(lhs);
                self.check_expr(rhs);
            }
            ExprKind::Unary { operand, .. } => self.check_expr(operand),
            ExprKind::Propagate(inner) => {
                if !self.declared.contains(EffectSet::ERR) {
                    self.diagnostics.push(Diagnostic::new(
                        Structured::PropagateWithoutErr { function: self.current_fn.clone() },
                        format!(
                            "`?` requires `Err` in the effect row of `{}`",
                            self.current_fn
                        ),
                        expr.span.clone(),
                    ));
                }
                self.check_expr(inner);
            }
            ExprKind::Index { base, index } => {
                self.check_expr(base);
                self.check_expr(index);
            }
            ExprKind::Field { base, .. } => self.check_expr(base),
            // Lambda bodies are latent; their effects are charged where
            // the lambda is invoked.
            ExprKind::Lambda { .. } => {}
            ExprKind::If { cond, then_branch, else_branch } => {
                self.check_expr(cond);
                self.check_expr(then_branch);
                if let Some(els) = else_branch {
                    self.check_expr(els);
                }
            }
            ExprKind::Match { scrutinee, arms } => {
                self.check_expr(scrutinee);
                for arm in arms {
                    if let Some(guard) = &arm.guard {
                        self.check_expr(guard);
                    }
                    self.check_expr(&arm.body);
                }
            }
            ExprKind::Block(block) => self.check_block(block),
            ExprKind::Array(elems) | ExprKind::Tuple(elems) => {
                for e in elems {
                    self.check_expr(e);
                }
            }
            ExprKind::Record { fields } => {
                for field in fields {
                    self.check_expr(&field.value);
                }
            }
            ExprKind::Range { start, end, .. } => {
                self.check_expr(start);
                self.check_expr(end);
            }
            ExprKind::Literal(_) | ExprKind::Ident(_) => {}
        }
    }

    /// Check a call's callee: named callees are looked up in the effect
    /// table and must fit the caller's declared row. Calls through
    /// arbitrary expressions (lambda values) carry latent effects and are
    /// not charged here.
    fn check_callee(&mut self, callee: &Expr) {
        if let ExprKind::Ident(name) = &callee.kind {
            if let Some(&callee_effects) = self.effect_table.get(name) {
                if !callee_effects.is_subset_of(self.declared) {
                    let missing = callee_effects.difference(self.declared);
                    self.diagnostics.push(Diagnostic::new(
                        Structured::EffectNotPermitted {
                            effect: missing.names().join(" + "),
                            function: self.current_fn.clone(),
                        },
                        format!(
                            "calling `{name}` requires effect `{missing}` not declared by `{}`",
                            self.current_fn
                        ),
                        callee.span.clone(),
                    ));
                }
            }
            return;
        }
        self.check_expr(callee);
    }

    fn check_block(&mut self, block: &Block) {
        self.mut_scopes.push(Vec::new());
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
        if let Some(value) = &block.value {
            self.check_expr(value);
        }
        self.mut_scopes.pop();
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Let { pattern, mutable, init, .. } => {
                self.check_expr(init);
                if *mutable {
                    if let Some(name) = binding_name(pattern) {
                        self.mut_scopes
                            .last_mut()
                            .expect("scope stack is never empty")
                            .push(name.to_string());
                    }
                }
            }
            StmtKind::Assign { target, value } => {
                self.check_expr(value);
                self.check_expr(target);
                if !self.assignment_is_local_mut(target) && !self.declared.contains(EffectSet::MUT)
                {
                    self.diagnostics.push(Diagnostic::new(
                        Structured::EffectNotPermitted {
                            effect: "Mut".to_string(),
                            function: self.current_fn.clone(),
                        },
                        format!(
                            "assignment requires effect `Mut` not declared by `{}`",
                            self.current_fn
                        ),
                        stmt.span.clone(),
                    ));
                }
            }
            StmtKind::Expr(expr) => self.check_expr(expr),
            StmtKind::For { iter, body, .. } => {
                self.check_expr(iter);
                self.check_expr(body);
            }
            StmtKind::While { cond, body } => {
                self.check_expr(cond);
                self.check_expr(body);
            }
            StmtKind::Loop { body } => self.check_expr(body),
            StmtKind::Return(value) => {
                if let Some(v) = value {
                    self.check_expr(v);
                }
            }
            StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Assert { cond, message } => {
                self.check_expr(cond);
                if let Some(m) = message {
                    self.check_expr(m);
                }
            }
        }
    }

    /// Whether an assignment target resolves to a binding declared `mut`
    /// in an enclosing local scope. Field/index targets resolve through
    /// their base identifier.
    fn assignment_is_local_mut(&self, target: &Expr) -> bool {
        match &target.kind {
            ExprKind::Ident(name) => self
                .mut_scopes
                .iter()
                .rev()
                .any(|scope| scope.iter().any(|n| n == name)),
            ExprKind::Field { base, .. } | ExprKind::Index { base, .. } => {
                self.assignment_is_local_mut(base)
            }
            _ => false,
        }
    }
}

fn binding_name(pattern: &Pattern) -> Option<&str> {
    match &pattern.kind {
        PatternKind::Ident(name) => Some(name),
        _ => None,
    }
}

/// Extract declared effects and the result type-expression from a
/// function's return annotation. `fn f() -> IO + Err + Int` declares
/// `{IO, Err}` with result `Int`; unknown effect names are reported by
/// the type checker during conversion.
pub fn split_effect_row(
    ret: Option<&rill_parser::ast::TypeExpr>,
) -> (EffectSet, Option<rill_parser::ast::TypeExpr>) {
    use rill_parser::ast::TypeExprKind;
    let Some(ret) = ret else {
        return (EffectSet::empty(), None);
    };
    match &ret.kind {
        TypeExprKind::Effect { effects, result } => {
            let mut set = EffectSet::empty();
            for e in effects {
                if let TypeExprKind::Named { name, args } = &e.kind {
                    if args.is_empty() {
                        if let Some(known) = EffectSet::from_name(name) {
                            set.insert(known);
                        }
                    }
                }
            }
            (set, Some((**result).clone()))
        }
        _ => (EffectSet::empty(), Some(ret.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_set_operations() {
        let io_err = EffectSet::IO.union(EffectSet::ERR);
        assert!(io_err.contains(EffectSet::IO));
        assert!(!io_err.contains(EffectSet::MUT));
        assert!(EffectSet::IO.is_subset_of(io_err));
        assert!(!io_err.is_subset_of(EffectSet::IO));
        assert_eq!(io_err.difference(EffectSet::IO), EffectSet::ERR);
    }

    #[test]
    fn effect_names_are_canonical() {
        let all = EffectSet::MUT
            .union(EffectSet::IO)
            .union(EffectSet::ASYNC)
            .union(EffectSet::ERR);
        assert_eq!(all.names(), vec!["IO", "Err", "Async", "Mut"]);
        assert_eq!(all.to_string(), "IO + Err + Async + Mut");
        assert_eq!(EffectSet::empty().to_string(), "pure");
    }

    #[test]
    fn from_name_is_closed() {
        assert_eq!(EffectSet::from_name("IO"), Some(EffectSet::IO));
        assert_eq!(EffectSet::from_name("Log"), None);
    }
}
