//! The abstract `Condition` DAG and the two-phase structure/bind protocol
//! (component C6, spec §4.3).
//!
//! Grounded on the teacher's `postrust_core::plan::types::CoercibleLogicTree`
//! (`Expr{negated,op,children}` / `Stmt(leaf)`): same tree shape, but the
//! leaf here carries only a deferred `argKey` — never an already-coerced
//! value — which is the structural difference the two-phase protocol
//! requires (§4.3: "Phase 1 — structure: NO value read").

use filterql_core::{Op, PropertyReference};
use std::sync::Arc;

/// An abstract AND/OR/NOT tree over deferred filter arguments.
///
/// Immutable once built; `And`/`Or`/`Not` share subtrees via `Arc` rather
/// than deep-copying, so `Condition` forms a DAG after simplification (§9
/// "Cyclic graphs" design note) and is cheap to clone and share across
/// threads.
#[derive(Clone, Debug)]
pub enum Condition {
    /// A leaf referencing a single filter by argKey. Carries the
    /// `PropertyReference` and operator it was built against, but never a
    /// value — phase 2 (`to_resolver`) is the only place a value is read.
    Atom {
        arg_key: String,
        property: Arc<PropertyReference>,
        op: Op,
    },
    And(Arc<Condition>, Arc<Condition>),
    Or(Arc<Condition>, Arc<Condition>),
    Not(Arc<Condition>),
}

impl Condition {
    pub fn atom(arg_key: impl Into<String>, property: Arc<PropertyReference>, op: Op) -> Self {
        Condition::Atom {
            arg_key: arg_key.into(),
            property,
            op,
        }
    }

    /// Fresh immutable AND node (spec §4.3 "Composition laws").
    pub fn and(left: Condition, right: Condition) -> Self {
        Condition::And(Arc::new(left), Arc::new(right))
    }

    pub fn or(left: Condition, right: Condition) -> Self {
        Condition::Or(Arc::new(left), Arc::new(right))
    }

    pub fn not(inner: Condition) -> Self {
        Condition::Not(Arc::new(inner))
    }

    /// All argKeys reachable from this condition, in traversal order
    /// (spec §3 invariant: "the argKey graph inside a Condition is a subset
    /// of filters.keys() referenced in combineWith").
    pub fn arg_keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_arg_keys(&mut keys);
        keys
    }

    fn collect_arg_keys<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::Atom { arg_key, .. } => out.push(arg_key.as_str()),
            Condition::And(l, r) | Condition::Or(l, r) => {
                l.collect_arg_keys(out);
                r.collect_arg_keys(out);
            }
            Condition::Not(inner) => inner.collect_arg_keys(out),
        }
    }
}

/// Phase 1 of the two-phase protocol (spec §4.3): converts one DSL atom
/// (`argKey`, `PropertyReference`, operator code) into a `Condition::Atom`
/// with no value read. Implementations may additionally validate that the
/// operator is declared supported by the property (or resolvable through
/// the operator registry, C7).
pub trait FilterContext: Send + Sync {
    fn to_condition(
        &self,
        arg_key: &str,
        property: Arc<PropertyReference>,
        op: Op,
    ) -> filterql_core::Result<Condition>;
}

/// The default `FilterContext`: builds an atom directly, only rejecting an
/// operator that is neither in `property.supported_operators` nor the
/// closed-enum `Custom` escape hatch (whether a custom code is actually
/// registered is deferred to C7, at resolve time).
#[derive(Default)]
pub struct DefaultFilterContext;

impl FilterContext for DefaultFilterContext {
    fn to_condition(
        &self,
        arg_key: &str,
        property: Arc<PropertyReference>,
        op: Op,
    ) -> filterql_core::Result<Condition> {
        if !op.is_custom() && !property.supports(op.code()) {
            return Err(filterql_core::Error::filter_definition(format!(
                "property '{}' does not support operator {op}",
                property.name
            )));
        }
        Ok(Condition::atom(arg_key, property, op))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filterql_core::property::ValueType;

    fn pr() -> Arc<PropertyReference> {
        PropertyReference::new("age", ValueType::Integer, ["GT", "EQ"], "User")
    }

    #[test]
    fn default_context_accepts_supported_operator() {
        let ctx = DefaultFilterContext;
        let cond = ctx.to_condition("a", pr(), Op::Gt).unwrap();
        assert_eq!(cond.arg_keys(), vec!["a"]);
    }

    #[test]
    fn default_context_rejects_unsupported_operator() {
        let ctx = DefaultFilterContext;
        assert!(ctx.to_condition("a", pr(), Op::Range).is_err());
    }

    #[test]
    fn and_or_not_share_subtrees_as_a_dag() {
        let atom = Condition::atom("a", pr(), Op::Gt);
        let combined = Condition::and(atom.clone(), Condition::not(atom));
        assert_eq!(combined.arg_keys(), vec!["a", "a"]);
    }
}
