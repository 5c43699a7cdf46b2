//! Rill canonicalizer: a deterministic, idempotent rewrite pipeline that
//! turns a parsed program into the canonical form the back-end consumes.
//!
//! The pipeline operates on a fresh-id clone of its input (the input is
//! never mutated) and applies up to four phases, in order:
//!
//! 1. **Desugar** -- pipes to calls, ranges to `__range` calls.
//! 2. **Normalize** -- synthetic `else { () }`, unit-filled empty blocks,
//!    explicit `return ()`.
//! 3. **Annotate effects** -- a `NodeId -> EffectAnnotation` side table.
//! 4. **Insert validators** -- wrap external call sites in
//!    `__validate_T(...)`.
//!
//! Applying the pipeline to its own output produces a structurally
//! identical tree (modulo node ids and synthetic spans); two runs over
//! the same input produce byte-identical serialized output.

mod annotate;
mod desugar;
mod normalize;
mod validators;

use rustc_hash::FxHashMap;

use rill_parser::ast::{IdGen, NodeId, Program};
use rill_typeck::effects::EffectSet;
use rill_typeck::FnSig;

pub use annotate::EffectAnnotation;
pub use validators::ValidatorInsertion;

/// Which phases run, and the side tables the later phases need.
///
/// All phase flags default to on. `effect_info` feeds effect annotation
/// (missing entries are treated as empty declared rows) and `type_info`
/// feeds validator naming (missing info falls back to the program's own
/// external declarations).
#[derive(Debug, Clone)]
pub struct CanonOptions {
    pub desugar: bool,
    pub normalize: bool,
    pub annotate_effects: bool,
    pub insert_validators: bool,
    pub type_info: Option<FxHashMap<String, FnSig>>,
    pub effect_info: Option<FxHashMap<String, EffectSet>>,
}

impl Default for CanonOptions {
    fn default() -> Self {
        Self::all()
    }
}

impl CanonOptions {
    pub fn all() -> Self {
        CanonOptions {
            desugar: true,
            normalize: true,
            annotate_effects: true,
            insert_validators: true,
            type_info: None,
            effect_info: None,
        }
    }

    /// Attach the checker's tables.
    pub fn with_typeck(mut self, result: &rill_typeck::TypeckResult) -> Self {
        self.type_info = Some(result.function_types.clone());
        self.effect_info = Some(result.effect_table.clone());
        self
    }
}

/// Output of canonicalization.
pub struct CanonResult {
    /// The canonical program, freshly owned; the input is untouched.
    pub program: Program,
    /// Per-node effect summaries (empty unless the phase ran).
    pub effect_annotations: FxHashMap<NodeId, EffectAnnotation>,
    /// Log of inserted validators, in walk order.
    pub validator_insertions: Vec<ValidatorInsertion>,
}

/// Run the canonicalization pipeline over `program`.
pub fn canonicalize(program: &Program, options: &CanonOptions) -> CanonResult {
    let mut ids = IdGen::new();
    let mut canonical = rill_parser::ast::fresh::clone_program(program, &mut ids);

    if options.desugar {
        desugar::desugar_program(&mut canonical, &mut ids);
    }
    if options.normalize {
        normalize::normalize_program(&mut canonical, &mut ids);
    }
    let effect_annotations = if options.annotate_effects {
        annotate::annotate_program(&canonical, options.effect_info.as_ref())
    } else {
        FxHashMap::default()
    };
    let validator_insertions = if options.insert_validators {
        validators::insert_validators(&mut canonical, &mut ids, options.type_info.as_ref())
    } else {
        Vec::new()
    };

    CanonResult {
        program: canonical,
        effect_annotations,
        validator_insertions,
    }
}
