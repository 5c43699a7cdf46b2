//! Rill type checker: Hindley-Milner-style inference with sum/record/
//! tuple/array/function types, refinement obligations, exhaustiveness
//! analysis, and a declared-row effect checker.
//!
//! The single entry point is [`typecheck`]; it never panics on bad input
//! and always returns a full [`TypeckResult`] -- diagnostics, the proof
//! obligations with their solver results, the function signature table,
//! the effect table, and a per-node type table.

pub mod builtins;
pub mod effects;
pub mod env;
pub mod exhaustiveness;
mod infer;
pub mod refine;
pub mod ty;
pub mod unify;

use rustc_hash::FxHashMap;

use rill_common::diagnostics::{self, Diagnostic};
use rill_parser::ast::{NodeId, Program};

use effects::EffectSet;
use refine::Obligation;
use ty::Ty;

/// A function signature: parameter and return types (possibly refined),
/// generic parameter names (appearing as rigid constructors inside the
/// types), the declared effect row, and whether the function is external.
#[derive(Debug, Clone)]
pub struct FnSig {
    pub type_params: Vec<String>,
    pub param_names: Vec<String>,
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub effects: EffectSet,
    pub external: bool,
}

impl FnSig {
    /// The signature as a function type.
    pub fn ty(&self) -> Ty {
        Ty::Fun {
            params: self.params.clone(),
            ret: Box::new(self.ret.clone()),
            effects: self.effects,
        }
    }
}

/// Everything the checker produces for one program.
pub struct TypeckResult {
    /// Type, exhaustiveness, refinement, and effect diagnostics, in
    /// source order per pass, passes concatenated.
    pub diagnostics: Vec<Diagnostic>,
    /// Proof obligations in checker walk order, each already solved.
    pub obligations: Vec<Obligation>,
    /// Signatures of every function (user, external, built-in).
    pub function_types: FxHashMap<String, FnSig>,
    /// Declared effect row per function name.
    pub effect_table: FxHashMap<String, EffectSet>,
    /// Resolved semantic type per AST node id.
    pub type_table: FxHashMap<NodeId, Ty>,
}

impl TypeckResult {
    /// Whether checking produced no error-severity diagnostics.
    pub fn success(&self) -> bool {
        diagnostics::is_success(&self.diagnostics)
    }

    /// Obligations the solver could neither discharge nor refute.
    pub fn open_obligations(&self) -> impl Iterator<Item = &Obligation> {
        self.obligations
            .iter()
            .filter(|o| o.result == refine::SolverResult::Open)
    }
}

/// Type-check a program.
pub fn typecheck(program: &Program) -> TypeckResult {
    let mut checker = infer::Checker::new();
    checker.run(program);

    let mut type_diags = checker.diagnostics;
    diagnostics::sort_by_span(&mut type_diags);

    let mut effect_diags = effects::check_effects(program, &checker.effect_table);
    diagnostics::sort_by_span(&mut effect_diags);
    type_diags.extend(effect_diags);

    TypeckResult {
        diagnostics: type_diags,
        obligations: checker.obligations,
        function_types: checker.functions,
        effect_table: checker.effect_table,
        type_table: checker.type_table,
    }
}
