//! # Schema Validator Cache Module
//!
//! Thread-safe caching of compiled JSON Schema validators, so schema-mode
//! bindings do not recompile their request and response documents per request.
//!
//! ## Overview
//!
//! Compiling a JSON Schema is far more expensive than validating against it.
//! Bindings compile their request schema (and response schema, if any) once at
//! route-creation time through this cache and keep the compiled validator;
//! bindings whose documents are identical share one validator.
//!
//! ## Cache Key Structure
//!
//! Keys are formatted as `{generation}:{schema_hash}`:
//! - `generation`: counter incremented by [`ValidatorCache::clear`]
//! - `schema_hash`: SHA-256 of the serialized schema document
//!
//! The binding key and kind passed to [`ValidatorCache::get_or_compile`] only
//! label log records and compile errors.
//!
//! ## Thread Safety
//!
//! The cache uses `Arc<RwLock<HashMap>>`: readers proceed concurrently, a miss
//! takes the write lock to insert. A poisoned lock is recovered, since the map
//! only ever holds fully compiled validators.

use anyhow::anyhow;
use jsonschema::Validator;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info};

/// Thread-safe cache for compiled JSON Schema validators
///
/// # Example
///
/// ```rust
/// use brrtlogic::validator_cache::ValidatorCache;
/// use serde_json::json;
///
/// let cache = ValidatorCache::new(true);
/// let schema = json!({"type": "object", "properties": {"name": {"type": "string"}}});
///
/// let validator = cache.get_or_compile("foo:create_foo:POST", "request", &schema).unwrap();
/// assert!(validator.is_valid(&json!({"name": "a"})));
/// assert_eq!(cache.size(), 1);
/// ```
#[derive(Clone)]
pub struct ValidatorCache {
    cache: Arc<RwLock<HashMap<String, Arc<Validator>>>>,
    /// When false every call compiles and nothing is stored.
    enabled: bool,
    generation: Arc<AtomicU64>,
}

impl Default for ValidatorCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl std::fmt::Debug for ValidatorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorCache")
            .field("enabled", &self.enabled)
            .field("generation", &self.generation())
            .field("size", &self.size())
            .finish()
    }
}

impl ValidatorCache {
    pub fn new(enabled: bool) -> Self {
        info!(enabled = enabled, "Initializing JSON Schema validator cache");
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            enabled,
            generation: Arc::new(AtomicU64::new(1)),
        }
    }

    fn cache_key(&self, schema: &Value) -> String {
        format!("{}:{}", self.generation(), schema_hash(schema))
    }

    fn compile(binding_key: &str, kind: &str, schema: &Value) -> anyhow::Result<Validator> {
        jsonschema::validator_for(schema).map_err(|e| {
            error!(
                binding_key = binding_key,
                kind = kind,
                error = %e,
                "Failed to compile JSON Schema"
            );
            anyhow!("invalid {kind} schema for {binding_key}: {e}")
        })
    }

    /// Get a cached validator for `schema` or compile and cache a new one
    ///
    /// # Arguments
    ///
    /// * `binding_key` - `<resource>:<handler>:<method>` of the binding, for logs
    /// * `kind` - Validation kind: "request" or "response"
    /// * `schema` - JSON Schema document to compile on a miss
    ///
    /// # Errors
    ///
    /// Returns an error if the schema does not compile.
    pub fn get_or_compile(
        &self,
        binding_key: &str,
        kind: &str,
        schema: &Value,
    ) -> anyhow::Result<Arc<Validator>> {
        if !self.enabled {
            return Self::compile(binding_key, kind, schema).map(Arc::new);
        }

        let key = self.cache_key(schema);

        // Fast path: read lock only
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(validator) = cache.get(&key) {
                debug!(cache_key = %key, "Schema validator cache hit");
                return Ok(Arc::clone(validator));
            }
        }

        let validator = Arc::new(Self::compile(binding_key, kind, schema)?);
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);

        // Another thread might have compiled while we waited
        if let Some(existing) = cache.get(&key) {
            debug!(cache_key = %key, "Schema validator compiled by another thread");
            return Ok(Arc::clone(existing));
        }

        cache.insert(key.clone(), Arc::clone(&validator));
        info!(
            binding_key = binding_key,
            kind = kind,
            cache_key = %key,
            cache_size = cache.len(),
            "Schema validator compiled and cached"
        );
        Ok(validator)
    }

    /// Number of validators currently cached
    pub fn size(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current key generation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Clear all cached validators and start a new key generation
    ///
    /// Keys from the previous generation can never match again, even if an
    /// in-flight compilation inserts one after the clear.
    pub fn clear(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let old = self.generation.fetch_add(1, Ordering::AcqRel);
        let removed = cache.len();
        cache.clear();
        info!(
            old_generation = old,
            new_generation = old + 1,
            removed = removed,
            "Schema validator cache cleared"
        );
    }
}

/// Hex SHA-256 of the serialized schema document.
fn schema_hash(schema: &Value) -> String {
    Sha256::digest(schema.to_string().as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {"age": {"type": "integer"}},
            "required": ["age"]
        })
    }

    #[test]
    fn test_cache_hit_returns_same_validator() {
        let cache = ValidatorCache::new(true);
        let a = cache.get_or_compile("foo:get_foo:GET", "request", &schema()).unwrap();
        let b = cache.get_or_compile("foo:get_foo:GET", "request", &schema()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_different_documents_never_share_a_key() {
        let cache = ValidatorCache::new(true);
        let a = json!({"type": "object", "required": ["a"]});
        let b = json!({"type": "object", "required": ["b"]});
        let va = cache.get_or_compile("foo:list:POST", "request", &a).unwrap();
        let vb = cache.get_or_compile("foo:list:POST", "request", &b).unwrap();
        assert!(!Arc::ptr_eq(&va, &vb));
        assert!(vb.is_valid(&json!({"b": 1})));
        assert!(!vb.is_valid(&json!({"a": 1})));
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_identical_documents_shared_across_bindings() {
        let cache = ValidatorCache::new(true);
        let a = cache.get_or_compile("foo:get_foo:GET", "request", &schema()).unwrap();
        let b = cache.get_or_compile("bar:get_bar:GET", "request", &schema()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.size(), 1);
    }

    #[test]
    fn test_kinds_are_separate_entries() {
        let cache = ValidatorCache::new(true);
        cache.get_or_compile("foo:get_foo:GET", "request", &schema()).unwrap();
        cache.get_or_compile("foo:get_foo:GET", "response", &json!({"type": "object"})).unwrap();
        assert_eq!(cache.size(), 2);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = ValidatorCache::new(false);
        let v = cache.get_or_compile("k", "request", &schema()).unwrap();
        assert!(v.is_valid(&json!({"age": 3})));
        assert!(!v.is_valid(&json!({"age": "x"})));
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_invalid_schema_is_an_error() {
        let cache = ValidatorCache::new(true);
        let err = cache
            .get_or_compile("k", "request", &json!({"type": "not-a-type"}))
            .unwrap_err();
        assert!(err.to_string().contains("invalid request schema for k"));
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_clear_bumps_generation() {
        let cache = ValidatorCache::new(true);
        let before = cache.get_or_compile("k", "request", &schema()).unwrap();
        assert_eq!(cache.generation(), 1);
        cache.clear();
        assert_eq!(cache.size(), 0);
        assert_eq!(cache.generation(), 2);
        let after = cache.get_or_compile("k", "request", &schema()).unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = ValidatorCache::new(true);
        let clone = cache.clone();
        cache.get_or_compile("k", "request", &schema()).unwrap();
        assert_eq!(clone.size(), 1);
    }
}
