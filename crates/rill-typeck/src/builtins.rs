//! Built-in types and functions.
//!
//! `Option` and `Result` are ordinary sum definitions pre-registered in
//! the type registry, so constructor resolution and exhaustiveness treat
//! them like user sums. A handful of built-in functions (`println`,
//! `print`, `len`, `str`) are installed as signatures with their effect
//! rows; the effect checker reads the same table.

use rustc_hash::FxHashMap;

use crate::effects::EffectSet;
use crate::env::{SumDefInfo, TypeRegistry, VariantInfo};
use crate::ty::{Ty, TyCon};
use crate::FnSig;

/// Well-known generic constructors and their arities. Used when
/// converting `Named` type expressions.
pub const WELL_KNOWN_CONSTRUCTORS: &[(&str, usize)] = &[
    ("Option", 1),
    ("Result", 2),
    ("Map", 2),
    ("Set", 1),
    ("IO", 1),
    ("Async", 1),
    ("Err", 1),
    ("Mut", 1),
];

/// Arity of a well-known constructor, if `name` is one.
pub fn well_known_arity(name: &str) -> Option<usize> {
    WELL_KNOWN_CONSTRUCTORS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, arity)| *arity)
}

/// Register built-in sum definitions and function signatures.
pub fn register(
    registry: &mut TypeRegistry,
    functions: &mut FxHashMap<String, FnSig>,
    effect_table: &mut FxHashMap<String, EffectSet>,
) {
    registry.sums.insert(
        "Option".to_string(),
        SumDefInfo {
            name: "Option".to_string(),
            params: vec!["T".to_string()],
            variants: vec![
                VariantInfo {
                    name: "Some".to_string(),
                    fields: vec![Ty::Con(TyCon::new("T"))],
                    field_names: None,
                },
                VariantInfo { name: "None".to_string(), fields: vec![], field_names: None },
            ],
        },
    );
    registry.sums.insert(
        "Result".to_string(),
        SumDefInfo {
            name: "Result".to_string(),
            params: vec!["T".to_string(), "E".to_string()],
            variants: vec![
                VariantInfo {
                    name: "Ok".to_string(),
                    fields: vec![Ty::Con(TyCon::new("T"))],
                    field_names: None,
                },
                VariantInfo {
                    name: "Err".to_string(),
                    fields: vec![Ty::Con(TyCon::new("E"))],
                    field_names: None,
                },
            ],
        },
    );

    let mut install = |name: &str, sig: FnSig| {
        effect_table.insert(name.to_string(), sig.effects);
        functions.insert(name.to_string(), sig);
    };

    install(
        "println",
        FnSig {
            type_params: vec![],
            param_names: vec!["message".to_string()],
            params: vec![Ty::str()],
            ret: Ty::unit(),
            effects: EffectSet::IO,
            external: false,
        },
    );
    install(
        "print",
        FnSig {
            type_params: vec![],
            param_names: vec!["message".to_string()],
            params: vec![Ty::str()],
            ret: Ty::unit(),
            effects: EffectSet::IO,
            external: false,
        },
    );
    install(
        "len",
        FnSig {
            type_params: vec!["T".to_string()],
            param_names: vec!["items".to_string()],
            params: vec![Ty::array(Ty::Con(TyCon::new("T")))],
            ret: Ty::int(),
            effects: EffectSet::empty(),
            external: false,
        },
    );
    install(
        "str",
        FnSig {
            type_params: vec!["T".to_string()],
            param_names: vec!["value".to_string()],
            params: vec![Ty::Con(TyCon::new("T"))],
            ret: Ty::str(),
            effects: EffectSet::empty(),
            external: false,
        },
    );
}
