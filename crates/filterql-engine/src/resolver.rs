//! Computed-field provider instances (spec §6.3).
//!
//! Grounded on §9's "Deep inheritance of providers" / "Dynamic dispatch"
//! design notes: a small capability trait invoked through a trait object,
//! with no reflection. `noBean()` in the source language instantiates a
//! provider by no-arg construction from its class; Rust has no equivalent
//! runtime class lookup, so the idiomatic replacement is a small registry
//! of no-arg factory closures keyed by the same provider-class string the
//! projection metadata already carries (§6.1 `ComputedFieldMeta::provider_class`).

use filterql_core::{Error, Result, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A computed-field provider: invoked post-aggregation with the (possibly
/// reduced) dependency values already materialized in the row, returning
/// the single output value (spec §4.7 step 5, §6.3).
pub trait ComputedFieldProvider: Send + Sync {
    fn compute(&self, method_name: &str, dependency_values: &[Value]) -> Result<Value>;
}

/// `InstanceResolver.resolve(providerClass) → instance` (spec §6.3).
pub trait InstanceResolver: Send + Sync {
    fn resolve(&self, provider_class: &str) -> Result<Arc<dyn ComputedFieldProvider>>;
}

type Factory = dyn Fn() -> Arc<dyn ComputedFieldProvider> + Send + Sync;

/// The built-in `noBean()` resolver (spec §6.3): instantiates providers by
/// no-arg construction. Since Rust has no class-by-name reflection, hosts
/// register one no-arg factory closure per `provider_class` string up
/// front; resolution is then a plain map lookup, same cost and shape as the
/// source language's reflective no-arg constructor call.
#[derive(Default)]
pub struct NoBeanResolver {
    factories: HashMap<String, Arc<Factory>>,
}

impl NoBeanResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        provider_class: impl Into<String>,
        factory: impl Fn() -> Arc<dyn ComputedFieldProvider> + Send + Sync + 'static,
    ) -> Self {
        self.factories.insert(provider_class.into(), Arc::new(factory));
        self
    }
}

impl InstanceResolver for NoBeanResolver {
    fn resolve(&self, provider_class: &str) -> Result<Arc<dyn ComputedFieldProvider>> {
        self.factories
            .get(provider_class)
            .map(|factory| factory())
            .ok_or_else(|| {
                Error::Internal(format!(
                    "no_bean(): no no-arg constructor registered for provider class '{provider_class}'"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;
    impl ComputedFieldProvider for Echo {
        fn compute(&self, _method_name: &str, dependency_values: &[Value]) -> Result<Value> {
            Ok(dependency_values.first().cloned().unwrap_or(Value::Null))
        }
    }

    #[test]
    fn resolves_a_registered_factory() {
        let resolver = NoBeanResolver::new().register("Echo", || Arc::new(Echo));
        let provider = resolver.resolve("Echo").unwrap();
        assert_eq!(provider.compute("x", &[Value::Int(1)]).unwrap(), Value::Int(1));
    }

    #[test]
    fn unregistered_class_errors() {
        let resolver = NoBeanResolver::new();
        assert!(resolver.resolve("Nope").is_err());
    }
}
