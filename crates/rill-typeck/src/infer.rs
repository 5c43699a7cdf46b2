//! The Rill type checker.
//!
//! Two passes over the program: the first binds type definitions and
//! function signatures into the global context, the second checks each
//! function body against its declared signature. Checking is
//! bidirectional-lite: types are inferred bottom-up and unified against
//! the expectation where one exists.
//!
//! Alongside types, the checker maintains the refinement fact stack
//! (parameter refinements, branch conditions, `let` equalities) and emits
//! proof obligations at call sites with refined parameters, at returning
//! expressions with refined return types, and at array index sites. Each
//! obligation is solved immediately against the facts in scope at its
//! site; refuted obligations become `E5001` diagnostics.

use rustc_hash::FxHashMap;

use rill_common::diagnostics::{Diagnostic, MissingPattern, Structured};
use rill_common::span::Span;
use rill_parser::ast::{
    BinaryOp, Block, DeclKind, Expr, ExprKind, FnDecl, Literal, MatchArm, NodeId, Pattern,
    PatternKind, Program, Stmt, StmtKind, TypeExpr, TypeExprKind, UnaryOp, VariantFields,
};

use crate::builtins;
use crate::effects::{split_effect_row, EffectSet};
use crate::env::{AliasInfo, RecordDefInfo, SumDefInfo, TypeEnv, TypeRegistry, VariantInfo};
use crate::exhaustiveness::{self, ScrutineeClasses};
use crate::refine::{
    extract_predicate, extract_term, solve, CmpOp, Obligation, ObligationOrigin, Predicate,
    SolverResult, Term,
};
use crate::ty::{Ty, TyCon};
use crate::unify::InferCtx;
use crate::FnSig;

/// Maximum alias expansion depth before a cycle is assumed.
const MAX_ALIAS_DEPTH: u32 = 32;

struct CurrentFn {
    name: String,
    ret: Ty,
}

pub(crate) struct Checker {
    ctx: InferCtx,
    env: TypeEnv,
    pub(crate) registry: TypeRegistry,
    /// Type parameters of the declaration currently being converted or
    /// checked; resolved as rigid constructors of their own name.
    type_params: Vec<String>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) obligations: Vec<Obligation>,
    pub(crate) functions: FxHashMap<String, FnSig>,
    pub(crate) effect_table: FxHashMap<String, EffectSet>,
    pub(crate) type_table: FxHashMap<NodeId, Ty>,
    /// Refinement facts in scope: parameter refinements, branch
    /// conditions (and negations), `let` equalities.
    facts: Vec<Predicate>,
    current_fn: Option<CurrentFn>,
    alias_depth: u32,
}

impl Checker {
    pub(crate) fn new() -> Self {
        let mut checker = Checker {
            ctx: InferCtx::new(),
            env: TypeEnv::new(),
            registry: TypeRegistry::new(),
            type_params: Vec::new(),
            diagnostics: Vec::new(),
            obligations: Vec::new(),
            functions: FxHashMap::default(),
            effect_table: FxHashMap::default(),
            type_table: FxHashMap::default(),
            facts: Vec::new(),
            current_fn: None,
            alias_depth: 0,
        };
        builtins::register(
            &mut checker.registry,
            &mut checker.functions,
            &mut checker.effect_table,
        );
        checker
    }

    pub(crate) fn run(&mut self, program: &Program) {
        self.collect_type_definitions(program);
        self.collect_signatures(program);
        for decl in &program.decls {
            if let DeclKind::Function(f) = &decl.kind {
                self.check_function(f);
            }
        }
        self.resolve_type_table();
    }

    /// Unify and keep the diagnostic stream in emission order.
    fn unify(&mut self, a: Ty, b: Ty, span: &Span) {
        let _ = self.ctx.unify(a, b, span);
        self.diagnostics.append(&mut self.ctx.diagnostics);
    }

    fn resolve_type_table(&mut self) {
        let ids: Vec<NodeId> = self.type_table.keys().copied().collect();
        for id in ids {
            let ty = self.type_table[&id].clone();
            let resolved = self.ctx.resolve(ty);
            self.type_table.insert(id, resolved);
        }
    }

    // ── Pass 1: type definitions ───────────────────────────────────────

    fn collect_type_definitions(&mut self, program: &Program) {
        // Names and arities first, so definitions may reference each
        // other (and themselves) in any order.
        for decl in &program.decls {
            match &decl.kind {
                DeclKind::Record { name, params, .. } => {
                    self.registry.records.insert(
                        name.clone(),
                        RecordDefInfo {
                            name: name.clone(),
                            params: params.clone(),
                            fields: Vec::new(),
                        },
                    );
                }
                DeclKind::Sum { name, params, .. } => {
                    self.registry.sums.insert(
                        name.clone(),
                        SumDefInfo {
                            name: name.clone(),
                            params: params.clone(),
                            variants: Vec::new(),
                        },
                    );
                }
                DeclKind::TypeAlias { name, params, .. } => {
                    self.registry.aliases.insert(
                        name.clone(),
                        AliasInfo {
                            name: name.clone(),
                            params: params.clone(),
                            ty: Ty::unit(),
                        },
                    );
                }
                _ => {}
            }
        }

        // Now convert the bodies.
        for decl in &program.decls {
            match &decl.kind {
                DeclKind::Record { name, params, fields } => {
                    self.type_params = params.clone();
                    let converted: Vec<(String, Ty)> = fields
                        .iter()
                        .map(|f| (f.name.clone(), self.convert_type(&f.ty)))
                        .collect();
                    self.type_params.clear();
                    if let Some(def) = self.registry.records.get_mut(name) {
                        def.fields = converted;
                    }
                }
                DeclKind::Sum { name, params, variants } => {
                    self.type_params = params.clone();
                    let mut seen: Vec<&str> = Vec::new();
                    let mut infos = Vec::new();
                    for variant in variants {
                        if seen.contains(&variant.name.as_str()) {
                            self.diagnostics.push(Diagnostic::new(
                                Structured::DuplicateVariant {
                                    type_name: name.clone(),
                                    variant: variant.name.clone(),
                                },
                                format!(
                                    "variant `{}` declared twice in sum `{name}`",
                                    variant.name
                                ),
                                variant.span.clone(),
                            ));
                            continue;
                        }
                        seen.push(&variant.name);
                        let (fields, field_names) = match &variant.fields {
                            VariantFields::Unit => (Vec::new(), None),
                            VariantFields::Positional(tys) => {
                                (tys.iter().map(|t| self.convert_type(t)).collect(), None)
                            }
                            VariantFields::Named(named) => (
                                named.iter().map(|f| self.convert_type(&f.ty)).collect(),
                                Some(named.iter().map(|f| f.name.clone()).collect()),
                            ),
                        };
                        infos.push(VariantInfo {
                            name: variant.name.clone(),
                            fields,
                            field_names,
                        });
                    }
                    self.type_params.clear();
                    if let Some(def) = self.registry.sums.get_mut(name) {
                        def.variants = infos;
                    }
                }
                DeclKind::TypeAlias { name, params, ty } => {
                    self.type_params = params.clone();
                    let converted = self.convert_type(ty);
                    self.type_params.clear();
                    if let Some(def) = self.registry.aliases.get_mut(name) {
                        def.ty = converted;
                    }
                }
                _ => {}
            }
        }
    }

    // ── Pass 1: function signatures ────────────────────────────────────

    fn collect_signatures(&mut self, program: &Program) {
        for decl in &program.decls {
            match &decl.kind {
                DeclKind::Function(f) => {
                    let sig = self.convert_signature(
                        &f.type_params,
                        &f.params,
                        f.ret.as_ref(),
                        false,
                    );
                    self.effect_table.insert(f.name.clone(), sig.effects);
                    self.functions.insert(f.name.clone(), sig);
                }
                DeclKind::ExternalFn(ext) => self.collect_external(ext),
                DeclKind::ExternalMod { fns, .. } => {
                    for inner in fns {
                        if let DeclKind::ExternalFn(ext) = &inner.kind {
                            self.collect_external(ext);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn collect_external(&mut self, ext: &rill_parser::ast::ExternalFnDecl) {
        let sig = self.convert_signature(&ext.type_params, &ext.params, ext.ret.as_ref(), true);
        self.effect_table.insert(ext.name.clone(), sig.effects);
        self.functions.insert(ext.name.clone(), sig);
    }

    fn convert_signature(
        &mut self,
        type_params: &[String],
        params: &[rill_parser::ast::Param],
        ret: Option<&TypeExpr>,
        external: bool,
    ) -> FnSig {
        self.type_params = type_params.to_vec();
        let (effects, result) = split_effect_row(ret);
        if let Some(TypeExprKind::Effect { effects: row, .. }) = ret.map(|r| &r.kind) {
            for e in row {
                let TypeExprKind::Named { name, args } = &e.kind else {
                    let diagnostic = self.unresolved_effect(&e.span);
                    self.diagnostics.push(diagnostic);
                    continue;
                };
                if !args.is_empty() || EffectSet::from_name(name).is_none() {
                    self.diagnostics.push(Diagnostic::new(
                        Structured::UnresolvedType { name: name.clone() },
                        format!("`{name}` is not an effect (expected IO, Err, Async, or Mut)"),
                        e.span.clone(),
                    ));
                }
            }
        }
        let param_names: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
        let param_tys: Vec<Ty> = params
            .iter()
            .map(|p| match &p.ty {
                Some(ty) => self.convert_type(ty),
                None => self.ctx.fresh_var(),
            })
            .collect();
        let ret_ty = match &result {
            Some(r) => self.convert_type(r),
            None => Ty::unit(),
        };
        self.type_params.clear();
        FnSig {
            type_params: type_params.to_vec(),
            param_names,
            params: param_tys,
            ret: ret_ty,
            effects,
            external,
        }
    }

    fn unresolved_effect(&self, span: &Span) -> Diagnostic {
        Diagnostic::new(
            Structured::UnresolvedType { name: "<effect>".to_string() },
            "expected an effect name (IO, Err, Async, or Mut)",
            span.clone(),
        )
    }

    // ── Type-expression conversion ─────────────────────────────────────

    pub(crate) fn convert_type(&mut self, te: &TypeExpr) -> Ty {
        let ty = self.convert_type_inner(te);
        self.type_table.insert(te.id, ty.clone());
        ty
    }

    fn convert_type_inner(&mut self, te: &TypeExpr) -> Ty {
        match &te.kind {
            TypeExprKind::Named { name, args } => self.convert_named(name, args, &te.span),
            TypeExprKind::Array(elem) => Ty::array(self.convert_type(elem)),
            TypeExprKind::Tuple(elems) => {
                Ty::Tuple(elems.iter().map(|e| self.convert_type(e)).collect())
            }
            TypeExprKind::Function { params, ret } => {
                let param_tys: Vec<Ty> = params.iter().map(|p| self.convert_type(p)).collect();
                // An effect row on the return position becomes the
                // function type's effect set.
                let (effects, result) = split_effect_row(Some(ret));
                let ret_ty = match &result {
                    Some(r) => self.convert_type(r),
                    None => Ty::unit(),
                };
                Ty::Fun { params: param_tys, ret: Box::new(ret_ty), effects }
            }
            TypeExprKind::Refined { base, var, pred } => {
                let base_ty = self.convert_type(base);
                let predicate = extract_predicate(pred);
                let var = var.clone().unwrap_or_else(|| {
                    infer_refinement_var(&predicate, &base_ty)
                });
                Ty::Refined { base: Box::new(base_ty), var, pred: predicate }
            }
            TypeExprKind::Effect { result, .. } => {
                // Effect rows are only meaningful in return position; the
                // signature path splits them off before conversion.
                // Elsewhere the row is dropped and the result stands.
                self.convert_type(result)
            }
            TypeExprKind::RecordType { fields, open } => Ty::Record {
                fields: fields
                    .iter()
                    .map(|f| (f.name.clone(), self.convert_type(&f.ty)))
                    .collect(),
                open: *open,
            },
        }
    }

    fn convert_named(&mut self, name: &str, args: &[TypeExpr], span: &Span) -> Ty {
        let arg_tys: Vec<Ty> = args.iter().map(|a| self.convert_type(a)).collect();

        let scalar = match name {
            "Int" | "Int32" | "Int64" => Some(Ty::int()),
            "Nat" => Some(nat_type()),
            "Float" => Some(Ty::float()),
            "Bool" => Some(Ty::bool()),
            "Str" => Some(Ty::str()),
            "Unit" => Some(Ty::unit()),
            "Never" => Some(Ty::Never),
            _ => None,
        };
        if let Some(ty) = scalar {
            if !arg_tys.is_empty() {
                self.type_param_mismatch(name, 0, arg_tys.len(), span);
            }
            return ty;
        }

        if self.type_params.iter().any(|p| p == name) {
            if !arg_tys.is_empty() {
                self.type_param_mismatch(name, 0, arg_tys.len(), span);
            }
            return Ty::Con(TyCon::new(name));
        }

        if let Some(arity) = builtins::well_known_arity(name) {
            if arg_tys.len() != arity {
                self.type_param_mismatch(name, arity, arg_tys.len(), span);
                return self.ctx.fresh_var();
            }
            return Ty::App(Box::new(Ty::Con(TyCon::new(name))), arg_tys);
        }

        if let Some(alias) = self.registry.aliases.get(name).cloned() {
            if arg_tys.len() != alias.params.len() {
                self.type_param_mismatch(name, alias.params.len(), arg_tys.len(), span);
                return self.ctx.fresh_var();
            }
            if self.alias_depth >= MAX_ALIAS_DEPTH {
                self.diagnostics.push(Diagnostic::new(
                    Structured::UnresolvedType { name: name.to_string() },
                    format!("type alias `{name}` expands cyclically"),
                    span.clone(),
                ));
                return self.ctx.fresh_var();
            }
            self.alias_depth += 1;
            let map: FxHashMap<String, Ty> =
                alias.params.iter().cloned().zip(arg_tys).collect();
            let expanded = substitute_named(&alias.ty, &map);
            self.alias_depth -= 1;
            return expanded;
        }

        if let Some(arity) = self.registry.arity(name) {
            if arg_tys.len() != arity {
                self.type_param_mismatch(name, arity, arg_tys.len(), span);
                return self.ctx.fresh_var();
            }
            return if arg_tys.is_empty() {
                Ty::Con(TyCon::new(name))
            } else {
                Ty::App(Box::new(Ty::Con(TyCon::new(name))), arg_tys)
            };
        }

        self.diagnostics.push(Diagnostic::new(
            Structured::UnresolvedType { name: name.to_string() },
            format!("unresolved type `{name}`"),
            span.clone(),
        ));
        self.ctx.fresh_var()
    }

    fn type_param_mismatch(&mut self, name: &str, expected: usize, actual: usize, span: &Span) {
        self.diagnostics.push(Diagnostic::new(
            Structured::TypeParamMismatch { name: name.to_string(), expected, actual },
            format!("`{name}` expects {expected} type argument(s), found {actual}"),
            span.clone(),
        ));
    }

    // ── Pass 2: function bodies ────────────────────────────────────────

    fn check_function(&mut self, f: &FnDecl) {
        let sig = self.functions.get(&f.name).cloned().unwrap_or_else(|| FnSig {
            type_params: Vec::new(),
            param_names: Vec::new(),
            params: Vec::new(),
            ret: Ty::unit(),
            effects: EffectSet::empty(),
            external: false,
        });

        self.type_params = f.type_params.clone();
        self.current_fn = Some(CurrentFn { name: f.name.clone(), ret: sig.ret.clone() });
        self.env.push_scope();
        let facts_depth = self.facts.len();

        for (param, ty) in f.params.iter().zip(&sig.params) {
            self.env.insert(param.name.clone(), ty.clone(), false);
            if let Ty::Refined { var, pred, .. } = ty {
                self.facts
                    .push(pred.substitute(var, &Term::Var(param.name.clone())));
            }
        }

        let body_ty = self.check_expr(&f.body, Some(&sig.ret.clone()));
        self.unify(body_ty, sig.ret.clone(), &f.body.span);

        // Return-type refinement obligation for the block's trailing
        // value (explicit `return`s are handled at their statements).
        if let ExprKind::Block(block) = &f.body.kind {
            if let Some(value) = &block.value {
                self.emit_return_obligation(&sig.ret, value);
            } else if block.stmts.is_empty() || !ends_in_return(block) {
                // A body with no trailing value returns unit; a refined
                // return type then has a unit witness, which only makes
                // sense when the refinement is trivially true.
                if let Ty::Refined { pred, .. } = &sig.ret {
                    if pred != &Predicate::True {
                        self.push_obligation(
                            pred.clone(),
                            f.body.span.clone(),
                            ObligationOrigin::ReturnRefinement { function: f.name.clone() },
                        );
                    }
                }
            }
        }

        self.facts.truncate(facts_depth);
        self.env.pop_scope();
        self.current_fn = None;
        self.type_params.clear();
    }

    fn emit_return_obligation(&mut self, ret: &Ty, value: &Expr) {
        let Ty::Refined { var, pred, .. } = ret else {
            return;
        };
        let term = extract_term(value)
            .unwrap_or_else(|| Term::Var(format!("%ret{}", value.id.0)));
        let goal = pred.substitute(var, &term);
        let function = self
            .current_fn
            .as_ref()
            .map(|f| f.name.clone())
            .unwrap_or_default();
        self.push_obligation(
            goal,
            value.span.clone(),
            ObligationOrigin::ReturnRefinement { function },
        );
    }

    /// Record an obligation, solve it against the facts in scope, and
    /// turn a refutation into an `E5001` diagnostic.
    fn push_obligation(&mut self, goal: Predicate, span: Span, origin: ObligationOrigin) {
        let result = solve(&goal, &self.facts);
        if result == SolverResult::Refuted {
            self.diagnostics.push(Diagnostic::new(
                Structured::RefinementRefuted { predicate: goal.to_string() },
                format!("refinement refuted: `{goal}` does not hold here"),
                span.clone(),
            ));
        }
        self.obligations.push(Obligation {
            predicate: goal,
            facts: self.facts.clone(),
            span,
            origin,
            result,
        });
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn check_expr(&mut self, expr: &Expr, expected: Option<&Ty>) -> Ty {
        let ty = self.check_expr_inner(expr, expected);
        self.type_table.insert(expr.id, ty.clone());
        ty
    }

    fn check_expr_inner(&mut self, expr: &Expr, expected: Option<&Ty>) -> Ty {
        let ty = match &expr.kind {
            ExprKind::Literal(lit) => literal_type(lit),
            ExprKind::Ident(name) => self.check_ident(name, &expr.span),
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand, &expr.span),
            ExprKind::Binary { op, lhs, rhs } => {
                self.check_binary(*op, lhs, rhs, &expr.span)
            }
            ExprKind::Call { callee, args } => self.check_call(callee, args, &expr.span),
            ExprKind::Index { base, index } => self.check_index(base, index, &expr.span),
            ExprKind::Field { base, name } => self.check_field(base, name, &expr.span),
            ExprKind::Lambda { params, body } => {
                self.env.push_scope();
                let param_tys: Vec<Ty> = params
                    .iter()
                    .map(|p| {
                        let ty = match &p.ty {
                            Some(te) => self.convert_type(te),
                            None => self.ctx.fresh_var(),
                        };
                        self.env.insert(p.name.clone(), ty.clone(), false);
                        ty
                    })
                    .collect();
                let ret = self.check_expr(body, None);
                self.env.pop_scope();
                Ty::Fun { params: param_tys, ret: Box::new(ret), effects: EffectSet::empty() }
            }
            ExprKind::If { cond, then_branch, else_branch } => {
                self.check_if(cond, then_branch, else_branch.as_deref(), expected, &expr.span)
            }
            ExprKind::Match { scrutinee, arms } => {
                self.check_match(scrutinee, arms, expected, &expr.span)
            }
            ExprKind::Block(block) => self.check_block(block, expected),
            ExprKind::Array(elems) => {
                let elem_ty = self.ctx.fresh_var();
                for elem in elems {
                    let ty = self.check_expr(elem, None);
                    self.unify(ty, elem_ty.clone(), &elem.span);
                }
                Ty::array(elem_ty)
            }
            ExprKind::Tuple(elems) => {
                Ty::Tuple(elems.iter().map(|e| self.check_expr(e, None)).collect())
            }
            ExprKind::Record { fields } => Ty::Record {
                fields: fields
                    .iter()
                    .map(|f| (f.name.clone(), self.check_expr(&f.value, None)))
                    .collect(),
                open: false,
            },
            ExprKind::Range { start, end, .. } => {
                let s = self.check_expr(start, Some(&Ty::int()));
                self.unify(s, Ty::int(), &start.span);
                let e = self.check_expr(end, Some(&Ty::int()));
                self.unify(e, Ty::int(), &end.span);
                // A range is a sequence of integers.
                Ty::array(Ty::int())
            }
            ExprKind::Propagate(inner) => self.check_propagate(inner, &expr.span),
        };
        ty
    }

    fn check_ident(&mut self, name: &str, span: &Span) -> Ty {
        if let Some(binding) = self.env.lookup(name) {
            return binding.ty.clone();
        }
        if let Some(sig) = self.functions.get(name).cloned() {
            let (params, ret) = self.instantiate_sig(&sig);
            return Ty::Fun { params, ret: Box::new(ret), effects: sig.effects };
        }
        if name.chars().next().is_some_and(char::is_uppercase) {
            if let Some(ty) = self.nullary_constructor(name) {
                return ty;
            }
        }
        self.diagnostics.push(Diagnostic::new(
            Structured::UnboundName { name: name.to_string() },
            format!("unbound name `{name}`"),
            span.clone(),
        ));
        self.ctx.fresh_var()
    }

    /// Resolve an upper-initial identifier as a variant constructor
    /// reference: nullary variants yield the sum type, payload variants
    /// yield a constructor function.
    fn nullary_constructor(&mut self, name: &str) -> Option<Ty> {
        let (sum, variant) = {
            let (s, v) = self.registry.find_variant(name)?;
            (s.clone(), v.clone())
        };
        let (payload, sum_ty) = self.instantiate_variant(&sum, &variant);
        if payload.is_empty() {
            Some(sum_ty)
        } else {
            Some(Ty::Fun {
                params: payload,
                ret: Box::new(sum_ty),
                effects: EffectSet::empty(),
            })
        }
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr, span: &Span) -> Ty {
        let ty = self.check_expr(operand, None);
        match op {
            UnaryOp::Neg => {
                let resolved = self.ctx.resolve(ty.clone());
                if resolved.strip_refinement().is_con("Float") {
                    Ty::float()
                } else {
                    self.unify(ty, Ty::int(), span);
                    Ty::int()
                }
            }
            UnaryOp::Not => {
                self.unify(ty, Ty::bool(), span);
                Ty::bool()
            }
        }
    }

    fn check_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: &Span) -> Ty {
        if op == BinaryOp::Pipe {
            // `x |> f` is the call `f(x)`.
            return self.check_call(rhs, std::slice::from_ref(lhs), span);
        }

        let lt = self.check_expr(lhs, None);
        let rt = self.check_expr(rhs, None);

        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem
            | BinaryOp::Pow => {
                self.unify(lt.clone(), rt, span);
                let resolved = self.ctx.resolve(lt);
                if resolved.strip_refinement().is_con("Float") {
                    Ty::float()
                } else {
                    self.unify(resolved, Ty::int(), span);
                    Ty::int()
                }
            }
            BinaryOp::Concat => {
                self.unify(lt.clone(), rt, span);
                let resolved = self.ctx.resolve(lt);
                match resolved.strip_refinement() {
                    Ty::Array(_) => resolved,
                    _ => {
                        self.unify(resolved, Ty::str(), span);
                        Ty::str()
                    }
                }
            }
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt
            | BinaryOp::GtEq => {
                self.unify(lt, rt, span);
                Ty::bool()
            }
            BinaryOp::And | BinaryOp::Or => {
                self.unify(lt, Ty::bool(), &lhs.span);
                self.unify(rt, Ty::bool(), &rhs.span);
                Ty::bool()
            }
            BinaryOp::Pipe => unreachable!("handled above"),
        }
    }

    fn check_call(&mut self, callee: &Expr, args: &[Expr], span: &Span) -> Ty {
        // Named callees resolve to functions or variant constructors
        // unless shadowed by a local binding.
        if let ExprKind::Ident(name) = &callee.kind {
            if self.env.lookup(name).is_none() {
                if let Some(sig) = self.functions.get(name).cloned() {
                    return self.check_known_call(callee, name, &sig, args, span);
                }
                if name.chars().next().is_some_and(char::is_uppercase) {
                    if let Some(found) = self.registry.find_variant(name) {
                        let (sum, variant) = (found.0.clone(), found.1.clone());
                        return self.check_constructor_call(
                            callee, &sum, &variant, args, span,
                        );
                    }
                }
            }
        }

        let callee_ty = self.check_expr(callee, None);
        let arg_tys: Vec<Ty> = args.iter().map(|a| self.check_expr(a, None)).collect();
        let ret = self.ctx.fresh_var();
        let expected = Ty::Fun {
            params: arg_tys,
            ret: Box::new(ret.clone()),
            effects: EffectSet::empty(),
        };
        self.unify(callee_ty, expected, span);
        ret
    }

    fn check_known_call(
        &mut self,
        callee: &Expr,
        name: &str,
        sig: &FnSig,
        args: &[Expr],
        span: &Span,
    ) -> Ty {
        if args.len() != sig.params.len() {
            self.diagnostics.push(Diagnostic::new(
                Structured::WrongArity { expected: sig.params.len(), actual: args.len() },
                format!(
                    "`{name}` expects {} argument(s), found {}",
                    sig.params.len(),
                    args.len()
                ),
                span.clone(),
            ));
            return self.ctx.fresh_var();
        }

        let (params, ret) = self.instantiate_sig(sig);
        self.type_table.insert(
            callee.id,
            Ty::Fun { params: params.clone(), ret: Box::new(ret.clone()), effects: sig.effects },
        );

        for (i, (arg, param_ty)) in args.iter().zip(&params).enumerate() {
            let arg_ty = self.check_expr(arg, Some(param_ty));
            self.unify(arg_ty, param_ty.clone(), &arg.span);

            // Call-site refinement obligation.
            if let Ty::Refined { var, pred, .. } = param_ty {
                let term = extract_term(arg)
                    .unwrap_or_else(|| Term::Var(format!("%arg{}", arg.id.0)));
                let goal = pred.substitute(var, &term);
                let param = sig
                    .param_names
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("#{i}"));
                self.push_obligation(
                    goal,
                    arg.span.clone(),
                    ObligationOrigin::CallArgument { callee: name.to_string(), param },
                );
            }
        }

        ret
    }

    fn check_constructor_call(
        &mut self,
        callee: &Expr,
        sum: &SumDefInfo,
        variant: &VariantInfo,
        args: &[Expr],
        span: &Span,
    ) -> Ty {
        let (payload, sum_ty) = self.instantiate_variant(sum, variant);
        self.type_table.insert(
            callee.id,
            Ty::Fun {
                params: payload.clone(),
                ret: Box::new(sum_ty.clone()),
                effects: EffectSet::empty(),
            },
        );
        if args.len() != payload.len() {
            self.diagnostics.push(Diagnostic::new(
                Structured::WrongArity { expected: payload.len(), actual: args.len() },
                format!(
                    "variant `{}` expects {} argument(s), found {}",
                    variant.name,
                    payload.len(),
                    args.len()
                ),
                span.clone(),
            ));
            return sum_ty;
        }
        for (arg, field_ty) in args.iter().zip(&payload) {
            let arg_ty = self.check_expr(arg, Some(field_ty));
            self.unify(arg_ty, field_ty.clone(), &arg.span);
        }
        sum_ty
    }

    fn check_index(&mut self, base: &Expr, index: &Expr, span: &Span) -> Ty {
        let base_ty = self.check_expr(base, None);
        let index_ty = self.check_expr(index, Some(&Ty::int()));
        self.unify(index_ty, Ty::int(), &index.span);
        let elem = self.ctx.fresh_var();
        self.unify(base_ty, Ty::array(elem.clone()), &base.span);

        // Bounds obligation: index >= 0 && index < len(base).
        let index_term = extract_term(index)
            .unwrap_or_else(|| Term::Var(format!("%idx{}", index.id.0)));
        let base_term = extract_term(base)
            .unwrap_or_else(|| Term::Var(format!("%arr{}", base.id.0)));
        let len_term = Term::Call { name: "len".to_string(), args: vec![base_term] };
        let goal = Predicate::and(
            Predicate::cmp(CmpOp::Ge, index_term.clone(), Term::Int(0)),
            Predicate::cmp(CmpOp::Lt, index_term, len_term),
        );
        self.push_obligation(goal, span.clone(), ObligationOrigin::IndexBounds);

        elem
    }

    fn check_field(&mut self, base: &Expr, name: &str, span: &Span) -> Ty {
        let base_ty = self.check_expr(base, None);
        let resolved = self.ctx.resolve(base_ty);
        let stripped = resolved.strip_refinement().clone();
        match &stripped {
            Ty::Record { fields, open } => {
                if let Some(ty) = fields.get(name) {
                    return ty.clone();
                }
                if *open {
                    return self.ctx.fresh_var();
                }
                self.unknown_member(&stripped.to_string(), name, span)
            }
            Ty::Con(con) => self.record_field(&con.name, &[], name, span),
            Ty::App(con, args) => {
                if let Ty::Con(con) = con.as_ref() {
                    self.record_field(&con.name, args, name, span)
                } else {
                    self.unknown_member(&stripped.to_string(), name, span)
                }
            }
            _ => self.unknown_member(&stripped.to_string(), name, span),
        }
    }

    fn record_field(&mut self, type_name: &str, args: &[Ty], field: &str, span: &Span) -> Ty {
        let Some(def) = self.registry.records.get(type_name).cloned() else {
            return self.unknown_member(type_name, field, span);
        };
        let map: FxHashMap<String, Ty> =
            def.params.iter().cloned().zip(args.iter().cloned()).collect();
        match def.fields.iter().find(|(n, _)| n == field) {
            Some((_, ty)) => substitute_named(ty, &map),
            None => self.unknown_member(type_name, field, span),
        }
    }

    fn unknown_member(&mut self, type_name: &str, member: &str, span: &Span) -> Ty {
        self.diagnostics.push(Diagnostic::new(
            Structured::UnknownMember {
                type_name: type_name.to_string(),
                member: member.to_string(),
            },
            format!("`{type_name}` has no member `{member}`"),
            span.clone(),
        ));
        self.ctx.fresh_var()
    }

    fn check_propagate(&mut self, inner: &Expr, span: &Span) -> Ty {
        let inner_ty = self.check_expr(inner, None);
        let resolved = self.ctx.resolve(inner_ty.clone());
        match resolved.strip_refinement() {
            Ty::App(con, args) if con.is_con("Option") && args.len() == 1 => args[0].clone(),
            Ty::App(con, args) if con.is_con("Result") && args.len() == 2 => args[0].clone(),
            _ => {
                let ok = self.ctx.fresh_var();
                let err = self.ctx.fresh_var();
                self.unify(inner_ty, Ty::result(ok.clone(), err), span);
                ok
            }
        }
    }

    fn check_if(
        &mut self,
        cond: &Expr,
        then_branch: &Expr,
        else_branch: Option<&Expr>,
        expected: Option<&Ty>,
        span: &Span,
    ) -> Ty {
        let cond_ty = self.check_expr(cond, Some(&Ty::bool()));
        self.unify(cond_ty, Ty::bool(), &cond.span);

        let fact = extract_predicate(cond);

        self.facts.push(fact.clone());
        let then_ty = self.check_expr(then_branch, expected);
        self.facts.pop();

        match else_branch {
            Some(els) => {
                self.facts.push(fact.negate());
                let else_ty = self.check_expr(els, expected);
                self.facts.pop();
                self.unify(then_ty.clone(), else_ty, span);
                then_ty
            }
            None => {
                self.unify(then_ty, Ty::unit(), span);
                Ty::unit()
            }
        }
    }

    fn check_match(
        &mut self,
        scrutinee: &Expr,
        arms: &[MatchArm],
        expected: Option<&Ty>,
        span: &Span,
    ) -> Ty {
        let scrutinee_ty = self.check_expr(scrutinee, None);
        let resolved = self.ctx.resolve(scrutinee_ty.clone());

        // Arm bodies unify against a common result type.
        let result_ty = match expected {
            Some(e) => e.clone(),
            None => self.ctx.fresh_var(),
        };

        for arm in arms {
            self.env.push_scope();
            let facts_depth = self.facts.len();
            self.bind_pattern(&arm.pattern, &scrutinee_ty);
            if let Some(guard) = &arm.guard {
                let guard_ty = self.check_expr(guard, Some(&Ty::bool()));
                self.unify(guard_ty, Ty::bool(), &guard.span);
                self.facts.push(extract_predicate(guard));
            }
            let body_ty = self.check_expr(&arm.body, Some(&result_ty));
            self.unify(body_ty, result_ty.clone(), &arm.body.span);
            self.facts.truncate(facts_depth);
            self.env.pop_scope();
        }

        // Exhaustiveness over top-level constructor classes.
        let classes = self.scrutinee_classes(&resolved);
        let report = exhaustiveness::check_match(&classes, arms);
        if !report.is_exhaustive() {
            let missing: Vec<MissingPattern> = report
                .missing
                .iter()
                .map(|m| MissingPattern { description: m.clone() })
                .collect();
            let described = report.missing.join(", ");
            self.diagnostics.push(Diagnostic::new(
                Structured::NonExhaustiveMatch { missing_patterns: missing },
                format!("non-exhaustive match: missing {described}"),
                span.clone(),
            ));
        }
        for index in report.unreachable {
            if let Some(arm) = arms.get(index) {
                self.diagnostics.push(Diagnostic::new(
                    Structured::UnreachableArm { arm_index: index },
                    "unreachable match arm",
                    arm.span.clone(),
                ));
            }
        }

        result_ty
    }

    fn scrutinee_classes(&self, resolved: &Ty) -> ScrutineeClasses {
        let name = match resolved.strip_refinement() {
            Ty::Con(con) => Some(con.name.clone()),
            Ty::App(con, _) => match con.as_ref() {
                Ty::Con(con) => Some(con.name.clone()),
                _ => None,
            },
            _ => None,
        };
        match name.as_deref() {
            Some("Bool") => ScrutineeClasses::Bool,
            Some(name) => match self.registry.sums.get(name) {
                Some(sum) => ScrutineeClasses::Variants(
                    sum.variants
                        .iter()
                        .map(|v| (v.name.clone(), v.fields.len()))
                        .collect(),
                ),
                None => ScrutineeClasses::Open,
            },
            None => ScrutineeClasses::Open,
        }
    }

    // ── Patterns ───────────────────────────────────────────────────────

    fn bind_pattern(&mut self, pattern: &Pattern, scrutinee: &Ty) {
        self.type_table.insert(pattern.id, scrutinee.clone());
        match &pattern.kind {
            PatternKind::Wildcard => {}
            PatternKind::Ident(name) => {
                self.env.insert(name.clone(), scrutinee.clone(), false);
            }
            PatternKind::Literal(lit) => {
                let lit_ty = literal_type(lit);
                self.unify(lit_ty, scrutinee.clone(), &pattern.span);
            }
            PatternKind::Tuple(elems) => {
                let elem_tys: Vec<Ty> = elems.iter().map(|_| self.ctx.fresh_var()).collect();
                self.unify(
                    scrutinee.clone(),
                    Ty::Tuple(elem_tys.clone()),
                    &pattern.span,
                );
                for (sub, ty) in elems.iter().zip(&elem_tys) {
                    self.bind_pattern(sub, ty);
                }
            }
            PatternKind::Record { fields } => {
                let resolved = self.ctx.resolve(scrutinee.clone());
                let stripped = resolved.strip_refinement().clone();
                let field_map: Option<FxHashMap<String, Ty>> = match &stripped {
                    Ty::Record { fields, .. } => {
                        Some(fields.clone().into_iter().collect())
                    }
                    Ty::Con(con) => self.record_fields_of(&con.name, &[]),
                    Ty::App(con, args) => match con.as_ref() {
                        Ty::Con(con) => self.record_fields_of(&con.name, args),
                        _ => None,
                    },
                    _ => None,
                };
                let Some(field_map) = field_map else {
                    self.diagnostics.push(Diagnostic::new(
                        Structured::TypeMismatch {
                            expected: "a record".to_string(),
                            actual: stripped.to_string(),
                        },
                        format!("cannot match record pattern against `{stripped}`"),
                        pattern.span.clone(),
                    ));
                    return;
                };
                for field in fields {
                    let Some(ty) = field_map.get(&field.name) else {
                        self.unknown_member(&stripped.to_string(), &field.name, &field.span);
                        continue;
                    };
                    match &field.pattern {
                        Some(sub) => self.bind_pattern(sub, &ty.clone()),
                        None => self.env.insert(field.name.clone(), ty.clone(), false),
                    }
                }
            }
            PatternKind::Variant { name, args } => {
                self.bind_variant_pattern(pattern, name, args, scrutinee);
            }
        }
    }

    fn record_fields_of(&self, name: &str, args: &[Ty]) -> Option<FxHashMap<String, Ty>> {
        let def = self.registry.records.get(name)?;
        let map: FxHashMap<String, Ty> =
            def.params.iter().cloned().zip(args.iter().cloned()).collect();
        Some(
            def.fields
                .iter()
                .map(|(n, t)| (n.clone(), substitute_named(t, &map)))
                .collect(),
        )
    }

    /// Variant-pattern resolution: locate the variant in the scrutinee's
    /// sum definition, substitute the declaration's parameters with the
    /// scrutinee's type arguments, and bind payload sub-patterns against
    /// the substituted payload types. Works on both nullary constructors
    /// (`Con`) and applied generics (`App`).
    fn bind_variant_pattern(
        &mut self,
        pattern: &Pattern,
        name: &str,
        args: &[Pattern],
        scrutinee: &Ty,
    ) {
        let resolved = self.ctx.resolve(scrutinee.clone());
        let stripped = resolved.strip_refinement().clone();

        let (sum, type_args): (SumDefInfo, Vec<Ty>) = match &stripped {
            Ty::Con(con) => match self.registry.sums.get(&con.name) {
                Some(sum) => (sum.clone(), Vec::new()),
                None => {
                    self.unknown_member(&con.name, name, &pattern.span);
                    return;
                }
            },
            Ty::App(con, type_args) => match con.as_ref() {
                Ty::Con(con) => match self.registry.sums.get(&con.name) {
                    Some(sum) => (sum.clone(), type_args.clone()),
                    None => {
                        self.unknown_member(&con.name, name, &pattern.span);
                        return;
                    }
                },
                _ => {
                    self.unknown_member(&stripped.to_string(), name, &pattern.span);
                    return;
                }
            },
            // Unresolved scrutinee: find the sum by variant name and
            // unify the scrutinee with it.
            Ty::Var(_) => {
                let Some(found) = self.registry.find_variant(name) else {
                    self.unknown_member("<unknown>", name, &pattern.span);
                    return;
                };
                let (sum, _) = (found.0.clone(), found.1.clone());
                let fresh: Vec<Ty> = sum.params.iter().map(|_| self.ctx.fresh_var()).collect();
                let sum_ty = apply_sum(&sum, &fresh);
                self.unify(scrutinee.clone(), sum_ty, &pattern.span);
                (sum, fresh)
            }
            other => {
                self.unknown_member(&other.to_string(), name, &pattern.span);
                return;
            }
        };

        let Some(variant) = sum.variants.iter().find(|v| v.name == name) else {
            self.unknown_member(&sum.name, name, &pattern.span);
            return;
        };

        if args.len() != variant.fields.len() {
            self.diagnostics.push(Diagnostic::new(
                Structured::WrongArity { expected: variant.fields.len(), actual: args.len() },
                format!(
                    "variant `{name}` has {} payload field(s), pattern binds {}",
                    variant.fields.len(),
                    args.len()
                ),
                pattern.span.clone(),
            ));
            return;
        }

        let map: FxHashMap<String, Ty> = sum
            .params
            .iter()
            .cloned()
            .zip(type_args.iter().cloned())
            .collect();
        for (sub, field_ty) in args.iter().zip(&variant.fields) {
            let substituted = substitute_named(field_ty, &map);
            self.bind_pattern(sub, &substituted);
        }
    }

    // ── Blocks and statements ──────────────────────────────────────────

    fn check_block(&mut self, block: &Block, expected: Option<&Ty>) -> Ty {
        self.env.push_scope();
        let facts_depth = self.facts.len();
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
        let ty = match &block.value {
            Some(value) => self.check_expr(value, expected),
            // A block that ends in `return` diverges; anything else
            // evaluates to unit.
            None if ends_in_return(block) => Ty::Never,
            None => Ty::unit(),
        };
        self.facts.truncate(facts_depth);
        self.env.pop_scope();
        ty
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Let { pattern, ty, mutable, init } => {
                let annotated = ty.as_ref().map(|te| self.convert_type(te));
                let init_ty = self.check_expr(init, annotated.as_ref());
                let bound_ty = match annotated {
                    Some(ann) => {
                        self.unify(init_ty, ann.clone(), &init.span);
                        ann
                    }
                    None => init_ty,
                };
                // `let` with an identifier pattern records mutability and
                // a symbolic equality fact for the solver.
                if let PatternKind::Ident(name) = &pattern.kind {
                    self.type_table.insert(pattern.id, bound_ty.clone());
                    self.env.insert(name.clone(), bound_ty, *mutable);
                    if let Some(term) = extract_term(init) {
                        self.facts.push(Predicate::cmp(
                            CmpOp::Eq,
                            Term::Var(name.clone()),
                            term,
                        ));
                    }
                } else {
                    self.bind_pattern(pattern, &bound_ty);
                }
            }
            StmtKind::Assign { target, value } => {
                if !matches!(
                    target.kind,
                    ExprKind::Ident(_) | ExprKind::Field { .. } | ExprKind::Index { .. }
                ) {
                    self.diagnostics.push(Diagnostic::syntax(
                        "invalid assignment target",
                        target.span.clone(),
                    ));
                }
                let target_ty = self.check_expr(target, None);
                let value_ty = self.check_expr(value, Some(&target_ty));
                self.unify(value_ty, target_ty, &value.span);
            }
            StmtKind::Expr(expr) => {
                self.check_expr(expr, None);
            }
            StmtKind::For { binding, iter, body } => {
                let iter_ty = self.check_expr(iter, None);
                let elem = self.ctx.fresh_var();
                self.unify(iter_ty, Ty::array(elem.clone()), &iter.span);
                self.env.push_scope();
                self.bind_pattern(binding, &elem);
                self.check_expr(body, None);
                self.env.pop_scope();
            }
            StmtKind::While { cond, body } => {
                let cond_ty = self.check_expr(cond, Some(&Ty::bool()));
                self.unify(cond_ty, Ty::bool(), &cond.span);
                let fact = extract_predicate(cond);
                self.facts.push(fact);
                self.check_expr(body, None);
                self.facts.pop();
            }
            StmtKind::Loop { body } => {
                self.check_expr(body, None);
            }
            StmtKind::Return(value) => {
                let ret = self
                    .current_fn
                    .as_ref()
                    .map(|f| f.ret.clone())
                    .unwrap_or_else(Ty::unit);
                match value {
                    Some(v) => {
                        let value_ty = self.check_expr(v, Some(&ret));
                        self.unify(value_ty, ret.clone(), &v.span);
                        self.emit_return_obligation(&ret, v);
                    }
                    None => {
                        self.unify(Ty::unit(), ret, &stmt.span);
                    }
                }
            }
            StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Assert { cond, message } => {
                let cond_ty = self.check_expr(cond, Some(&Ty::bool()));
                self.unify(cond_ty, Ty::bool(), &cond.span);
                if let Some(m) = message {
                    let m_ty = self.check_expr(m, Some(&Ty::str()));
                    self.unify(m_ty, Ty::str(), &m.span);
                }
            }
        }
    }

    // ── Instantiation helpers ──────────────────────────────────────────

    /// Instantiate a signature's generic parameters with fresh inference
    /// variables.
    fn instantiate_sig(&mut self, sig: &FnSig) -> (Vec<Ty>, Ty) {
        if sig.type_params.is_empty() {
            return (sig.params.clone(), sig.ret.clone());
        }
        let map: FxHashMap<String, Ty> = sig
            .type_params
            .iter()
            .map(|p| (p.clone(), self.ctx.fresh_var()))
            .collect();
        let params = sig.params.iter().map(|p| substitute_named(p, &map)).collect();
        let ret = substitute_named(&sig.ret, &map);
        (params, ret)
    }

    /// Instantiate a variant: fresh variables for the sum's parameters,
    /// substituted into the payload types and the sum type itself.
    fn instantiate_variant(
        &mut self,
        sum: &SumDefInfo,
        variant: &VariantInfo,
    ) -> (Vec<Ty>, Ty) {
        let fresh: Vec<Ty> = sum.params.iter().map(|_| self.ctx.fresh_var()).collect();
        let map: FxHashMap<String, Ty> =
            sum.params.iter().cloned().zip(fresh.iter().cloned()).collect();
        let payload = variant
            .fields
            .iter()
            .map(|f| substitute_named(f, &map))
            .collect();
        (payload, apply_sum(sum, &fresh))
    }
}

// ── Free helpers ───────────────────────────────────────────────────────

fn literal_type(lit: &Literal) -> Ty {
    match lit {
        Literal::Int { .. } => Ty::int(),
        Literal::Float(_) => Ty::float(),
        Literal::Str(_) | Literal::TemplateStr(_) => Ty::str(),
        Literal::Bool(_) => Ty::bool(),
        Literal::Unit => Ty::unit(),
    }
}

/// `Nat` is sugar for non-negative `Int`.
fn nat_type() -> Ty {
    Ty::Refined {
        base: Box::new(Ty::int()),
        var: "n".to_string(),
        pred: Predicate::cmp(CmpOp::Ge, Term::Var("n".to_string()), Term::Int(0)),
    }
}

/// Conventional refinement variable when none was written: the single
/// free variable of the predicate, or a name suggested by the base type.
fn infer_refinement_var(pred: &Predicate, base: &Ty) -> String {
    let free = pred.free_vars();
    if free.len() == 1 {
        return free.into_iter().next().expect("checked length");
    }
    match base.strip_refinement() {
        Ty::Array(_) => "arr".to_string(),
        Ty::Con(con) if con.name == "Str" => "s".to_string(),
        Ty::Con(con) if con.name == "Int" || con.name == "Nat" => "n".to_string(),
        _ => "v".to_string(),
    }
}

/// Replace rigid named constructors (type parameters) according to `map`.
fn substitute_named(ty: &Ty, map: &FxHashMap<String, Ty>) -> Ty {
    if map.is_empty() {
        return ty.clone();
    }
    match ty {
        Ty::Con(con) => map.get(&con.name).cloned().unwrap_or_else(|| ty.clone()),
        Ty::Var(_) | Ty::Never => ty.clone(),
        Ty::App(con, args) => Ty::App(
            Box::new(substitute_named(con, map)),
            args.iter().map(|a| substitute_named(a, map)).collect(),
        ),
        Ty::Fun { params, ret, effects } => Ty::Fun {
            params: params.iter().map(|p| substitute_named(p, map)).collect(),
            ret: Box::new(substitute_named(ret, map)),
            effects: *effects,
        },
        Ty::Tuple(elems) => {
            Ty::Tuple(elems.iter().map(|e| substitute_named(e, map)).collect())
        }
        Ty::Array(elem) => Ty::Array(Box::new(substitute_named(elem, map))),
        Ty::Record { fields, open } => Ty::Record {
            fields: fields
                .iter()
                .map(|(n, t)| (n.clone(), substitute_named(t, map)))
                .collect(),
            open: *open,
        },
        Ty::Refined { base, var, pred } => Ty::Refined {
            base: Box::new(substitute_named(base, map)),
            var: var.clone(),
            pred: pred.clone(),
        },
    }
}

/// The semantic type of a sum applied to arguments.
fn apply_sum(sum: &SumDefInfo, args: &[Ty]) -> Ty {
    if args.is_empty() {
        Ty::Con(TyCon::new(sum.name.clone()))
    } else {
        Ty::App(Box::new(Ty::Con(TyCon::new(sum.name.clone()))), args.to_vec())
    }
}

/// Whether the last statement of a block is a `return`.
fn ends_in_return(block: &Block) -> bool {
    matches!(block.stmts.last(), Some(stmt) if matches!(stmt.kind, StmtKind::Return(_)))
}
