//! Type environment and type-definition registry.
//!
//! The environment is a scope stack mapping value names to their types
//! (and mutability). The registry is the global store of record, sum, and
//! alias definitions; variant lookup for constructor resolution goes
//! through it.

use rustc_hash::FxHashMap;

use crate::ty::Ty;

/// A value binding: its type and whether it was declared `mut`.
#[derive(Debug, Clone)]
pub struct Binding {
    pub ty: Ty,
    pub mutable: bool,
}

/// A stack of lexical scopes mapping names to bindings. Lookup walks from
/// the innermost scope outward.
pub struct TypeEnv {
    scopes: Vec<FxHashMap<String, Binding>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        TypeEnv { scopes: vec![FxHashMap::default()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// # Panics
    ///
    /// Panics if called when only the global scope remains.
    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    pub fn insert(&mut self, name: String, ty: Ty, mutable: bool) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .insert(name, Binding { ty, mutable });
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

// ── Type-definition registry ───────────────────────────────────────────

/// A registered record definition.
#[derive(Debug, Clone)]
pub struct RecordDefInfo {
    pub name: String,
    /// Generic parameter names; payload types reference them as rigid
    /// `Con`s of the same name.
    pub params: Vec<String>,
    pub fields: Vec<(String, Ty)>,
}

/// A registered sum definition.
#[derive(Debug, Clone)]
pub struct SumDefInfo {
    pub name: String,
    pub params: Vec<String>,
    pub variants: Vec<VariantInfo>,
}

/// One variant of a sum definition.
#[derive(Debug, Clone)]
pub struct VariantInfo {
    pub name: String,
    /// Payload types in declaration order (empty for nullary variants).
    pub fields: Vec<Ty>,
    /// Field names for named payloads.
    pub field_names: Option<Vec<String>>,
}

/// A registered type alias.
#[derive(Debug, Clone)]
pub struct AliasInfo {
    pub name: String,
    pub params: Vec<String>,
    pub ty: Ty,
}

/// The central store of type definitions in a program.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    pub records: FxHashMap<String, RecordDefInfo>,
    pub sums: FxHashMap<String, SumDefInfo>,
    pub aliases: FxHashMap<String, AliasInfo>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is any kind of user-defined type.
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
            || self.sums.contains_key(name)
            || self.aliases.contains_key(name)
    }

    /// Number of generic parameters `name` expects, if defined.
    pub fn arity(&self, name: &str) -> Option<usize> {
        if let Some(r) = self.records.get(name) {
            return Some(r.params.len());
        }
        if let Some(s) = self.sums.get(name) {
            return Some(s.params.len());
        }
        self.aliases.get(name).map(|a| a.params.len())
    }

    /// Find the sum definition declaring a variant of this name, together
    /// with the variant itself.
    pub fn find_variant(&self, variant: &str) -> Option<(&SumDefInfo, &VariantInfo)> {
        // Deterministic choice if two sums share a variant name: smallest
        // sum name wins.
        let mut found: Option<(&SumDefInfo, &VariantInfo)> = None;
        for sum in self.sums.values() {
            if let Some(v) = sum.variants.iter().find(|v| v.name == variant) {
                match &found {
                    Some((existing, _)) if existing.name <= sum.name => {}
                    _ => found = Some((sum, v)),
                }
            }
        }
        found
    }
}
