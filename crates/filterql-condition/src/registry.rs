//! The custom operator registry (component C7, spec §4.4).
//!
//! Grounded on `postrust_core::schema_cache::SchemaCacheRef`'s
//! `Arc<RwLock<Option<T>>>` wrapper shape, re-grounded on a sync
//! `parking_lot::RwLock` rather than the teacher's `tokio::sync::RwLock`:
//! the registry is mutated synchronously (no I/O during registration), so a
//! sync lock is the idiomatic match (§9 "Global state").

use filterql_core::query_builder::PredicateResolver;
use filterql_core::{Error, FilterDefinition, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A user-supplied implementation of one or more `Op::Custom` operators.
pub trait OperatorProvider: Send + Sync {
    /// Operator codes this provider claims, upper-cased.
    fn supported_operators(&self) -> HashSet<String>;

    /// Phase 2 (spec §4.3): build the deferred predicate closure for one
    /// filter whose operator this provider claims.
    fn to_resolver(&self, filter: &FilterDefinition) -> Result<PredicateResolver>;
}

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<dyn OperatorProvider>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Process-wide, case-insensitive, thread-safe registry of custom operator
/// providers (spec §4.4). All methods operate on the single process-wide
/// table — there is intentionally no per-instance state here, matching §9's
/// "exactly two process-wide singletons are permitted" (the other being the
/// DSL cache, C5).
pub struct OperatorRegistry;

impl OperatorRegistry {
    /// Register `provider` for every code it claims. Each code must be
    /// currently unclaimed; on a duplicate, no code is registered (all-or-
    /// nothing) and an error is returned. Concurrent duplicate attempts:
    /// exactly one succeeds, guaranteed by holding the write lock for the
    /// whole check-then-insert.
    pub fn register(provider: Arc<dyn OperatorProvider>) -> Result<()> {
        let codes: HashSet<String> = provider
            .supported_operators()
            .into_iter()
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if codes.is_empty() {
            return Err(Error::filter_definition(
                "operator provider must claim at least one operator code",
            ));
        }

        let mut table = REGISTRY.write();
        if let Some(taken) = codes.iter().find(|c| table.contains_key(*c)) {
            return Err(Error::filter_definition(format!(
                "operator code '{taken}' is already registered"
            )));
        }
        for code in codes {
            table.insert(code, provider.clone());
        }
        tracing::info!(target: "filterql_condition::registry", "registered custom operator provider");
        Ok(())
    }

    /// Unregister a provider by removing every code it currently claims in
    /// the live table (so prior `register` calls for other providers on
    /// overlapping codes, which would have failed, are not a concern here).
    pub fn unregister(provider: &Arc<dyn OperatorProvider>) {
        let codes = provider.supported_operators();
        let mut table = REGISTRY.write();
        for code in codes {
            table.remove(&code.to_ascii_uppercase());
        }
    }

    /// Unregister specific codes directly.
    pub fn unregister_codes(codes: impl IntoIterator<Item = impl Into<String>>) {
        let mut table = REGISTRY.write();
        for code in codes {
            table.remove(&code.into().to_ascii_uppercase());
        }
    }

    pub fn unregister_all() {
        REGISTRY.write().clear();
    }

    /// Case-insensitive lookup; blank/empty codes always return `None`.
    pub fn get_provider(code: &str) -> Option<Arc<dyn OperatorProvider>> {
        if code.trim().is_empty() {
            return None;
        }
        REGISTRY.read().get(&code.to_ascii_uppercase()).cloned()
    }

    /// Immutable snapshot of every registered, upper-cased code.
    pub fn all_registered_operators() -> HashSet<String> {
        REGISTRY.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Soundex;
    impl OperatorProvider for Soundex {
        fn supported_operators(&self) -> HashSet<String> {
            ["SOUNDEX".to_string()].into_iter().collect()
        }
        fn to_resolver(&self, _filter: &FilterDefinition) -> Result<PredicateResolver> {
            Err(Error::Internal("not needed for this test".into()))
        }
    }

    // Tests run serially against process-wide state; `unregister_all` keeps
    // them independent regardless of execution order.
    fn reset() {
        OperatorRegistry::unregister_all();
    }

    #[test]
    fn register_then_lookup_case_insensitive() {
        reset();
        OperatorRegistry::register(Arc::new(Soundex)).unwrap();
        assert!(OperatorRegistry::get_provider("soundex").is_some());
        assert!(OperatorRegistry::get_provider("SOUNDEX").is_some());
        reset();
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        reset();
        OperatorRegistry::register(Arc::new(Soundex)).unwrap();
        let err = OperatorRegistry::register(Arc::new(Soundex));
        assert!(err.is_err());
        reset();
    }

    #[test]
    fn blank_lookup_returns_none() {
        assert!(OperatorRegistry::get_provider("").is_none());
        assert!(OperatorRegistry::get_provider("   ").is_none());
    }

    #[test]
    fn unregister_frees_the_code() {
        reset();
        let provider: Arc<dyn OperatorProvider> = Arc::new(Soundex);
        OperatorRegistry::register(provider.clone()).unwrap();
        OperatorRegistry::unregister(&provider);
        assert!(OperatorRegistry::get_provider("SOUNDEX").is_none());
    }
}
