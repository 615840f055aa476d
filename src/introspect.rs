//! # Signature Introspection
//!
//! Computes the [`ParameterSet`] of a logic function by walking its delegation
//! chain ([`Logic::wrapped`]) down to the first layer that declares a
//! [`Signature`].
//!
//! ## Parameter Sets
//!
//! - `all` - every request-visible parameter name, in declaration order
//! - `required` - typed parameters without a default
//! - `optional` - parameters with a default
//! - `logic` - the names passed into the function itself (`all` minus extras
//!   consumed by wrapping layers)
//!
//! A function with no reachable signature resolves to an empty set: it accepts
//! no request parameters, which is not an error.
//!
//! ## Memoization
//!
//! [`resolve_cached`] memoizes the result per logic function (by `Arc`
//! identity) in a lock-free map. Concurrent first callers may both compute the
//! set; the computation is pure so only the first insert is kept.

use crate::logic::{Logic, LogicRef, Signature};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Parameter names of a logic function, split by role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParameterSet {
    pub all: Vec<String>,
    pub required: Vec<String>,
    pub optional: Vec<String>,
    pub logic: Vec<String>,
}

impl ParameterSet {
    /// Build the set for a declared signature.
    #[must_use]
    pub fn from_signature(signature: &Signature) -> Self {
        let mut set = ParameterSet::default();
        for spec in signature.all_parameters() {
            set.all.push(spec.name.clone());
            if spec.is_required() {
                set.required.push(spec.name.clone());
            }
            if spec.is_optional() {
                set.optional.push(spec.name.clone());
            }
        }
        set.logic = signature
            .parameters()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        set
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Whether `name` is accepted from the request.
    #[must_use]
    pub fn accepts(&self, name: &str) -> bool {
        self.all.iter().any(|n| n == name)
    }
}

/// Signature found on the delegation chain together with its parameter set.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSignature {
    /// Empty when no layer declares a signature.
    pub signature: Signature,
    pub params: ParameterSet,
}

/// First signature declared on the delegation chain starting at `logic`.
#[must_use]
pub fn find_signature(logic: &dyn Logic) -> Option<&Signature> {
    let mut current = logic;
    loop {
        if let Some(signature) = current.signature() {
            return Some(signature);
        }
        current = current.wrapped()?.as_ref();
    }
}

/// Parameter set of `logic`.
#[must_use]
pub fn resolve(logic: &dyn Logic) -> ParameterSet {
    find_signature(logic)
        .map(ParameterSet::from_signature)
        .unwrap_or_default()
}

/// Signature and parameter set of `logic`, uncached.
#[must_use]
pub fn resolve_signature(logic: &dyn Logic) -> ResolvedSignature {
    match find_signature(logic) {
        Some(signature) => ResolvedSignature {
            params: ParameterSet::from_signature(signature),
            signature: signature.clone(),
        },
        None => ResolvedSignature::default(),
    }
}

// Keyed by the address of the logic function; the entry keeps the function
// alive so the address cannot be reused while cached.
static SIGNATURES: Lazy<DashMap<usize, (LogicRef, Arc<ResolvedSignature>)>> =
    Lazy::new(DashMap::new);

fn cache_key(logic: &LogicRef) -> usize {
    Arc::as_ptr(logic) as *const () as usize
}

/// Memoized [`resolve_signature`].
#[must_use]
pub fn resolve_cached(logic: &LogicRef) -> Arc<ResolvedSignature> {
    let key = cache_key(logic);
    if let Some(entry) = SIGNATURES.get(&key) {
        debug!(logic = %logic.name(), "Signature cache hit");
        return Arc::clone(&entry.value().1);
    }

    let resolved = Arc::new(resolve_signature(logic.as_ref()));
    debug!(
        logic = %logic.name(),
        params = ?resolved.params.all,
        required = ?resolved.params.required,
        "Signature resolved"
    );
    let entry = SIGNATURES
        .entry(key)
        .or_insert_with(|| (Arc::clone(logic), resolved));
    Arc::clone(&entry.value().1)
}
