//! The abstract query-builder seam (spec §6.2).
//!
//! This is the CORE's *only* coupling to a storage backend. Everything
//! above this module — the condition resolver (filterql-condition) and the
//! multi-query engine (filterql-engine) — talks exclusively through these
//! trait objects; no concrete SQL (or any other query text) appears here.
//!
//! Grounding note (recorded in DESIGN.md): spec §6.2 lists this interface
//! under "External Interfaces" without assigning it to a specific internal
//! component, and the condition resolver's `PredicateResolver` (C6, phase 2)
//! needs to reference it. Defining it in `filterql-core` rather than
//! `filterql-engine` keeps the dependency graph acyclic — `filterql-engine`
//! still owns the one concrete consumer (the multi-query algorithm, C10).

use crate::value::Value;

/// Sentinel `limit` meaning "no limit" — used by the multi-query engine
/// (C10) for batch child queries, which fetch every matching row for a
/// parent-id batch and apply pagination in memory per parent (§4.7 step 4)
/// rather than at the SQL level.
pub const UNBOUNDED: u32 = u32::MAX;

/// A bound attribute path, rooted at a query's entity (spec §6.2 `Path`).
pub trait Path {
    /// Navigate to a nested attribute: `path.get("address").get("city")`.
    fn get(&self, field: &str) -> Box<dyn Path>;

    /// The dotted path this `Path` represents, for diagnostics and for
    /// backends that need a textual column reference.
    fn field_path(&self) -> String;
}

/// An opaque backend predicate, produced by `CriteriaBuilder` and consumed
/// only by `Query::where_`. `as_any` exists solely so test backends (and
/// hosts debugging a predicate tree) can downcast to their concrete type;
/// the engine itself never inspects a `Predicate`'s contents.
pub trait Predicate {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Ascending/descending ORDER BY term bound to a `Path`.
pub struct OrderExpr {
    pub path: Box<dyn Path>,
    pub ascending: bool,
}

/// A single criteria-style query under construction (spec §6.2 `Query`).
pub trait Query {
    /// The root bound variable.
    fn root(&self) -> Box<dyn Path>;

    /// `multiSelect` — project these paths, aliased by DTO name.
    fn multi_select(&mut self, aliased: Vec<(String, Box<dyn Path>)>);

    fn where_clause(&mut self, predicate: Box<dyn Predicate>);

    fn order_by(&mut self, orders: Vec<OrderExpr>);

    /// Execute with an offset/limit window, returning one `Tuple` per row.
    fn execute(&self, offset: u32, limit: u32) -> crate::error::Result<Vec<Box<dyn Tuple>>>;
}

/// Builds backend predicates and aggregate/function expressions (spec §6.2
/// `CriteriaBuilder`).
pub trait CriteriaBuilder {
    fn equal(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate>;
    fn not_equal(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate>;
    fn gt(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate>;
    fn ge(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate>;
    fn lt(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate>;
    fn le(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate>;
    fn like(&self, path: &dyn Path, pattern: &Value, negated: bool) -> Box<dyn Predicate>;
    fn between(&self, path: &dyn Path, lo: &Value, hi: &Value, negated: bool) -> Box<dyn Predicate>;
    fn in_list(&self, path: &dyn Path, values: &[Value], negated: bool) -> Box<dyn Predicate>;
    fn is_null(&self, path: &dyn Path, negated: bool) -> Box<dyn Predicate>;

    fn and(&self, predicates: Vec<Box<dyn Predicate>>) -> Box<dyn Predicate>;
    fn or(&self, predicates: Vec<Box<dyn Predicate>>) -> Box<dyn Predicate>;
    fn not(&self, predicate: Box<dyn Predicate>) -> Box<dyn Predicate>;
    fn conjunction(&self) -> Box<dyn Predicate>;
    fn disjunction(&self) -> Box<dyn Predicate>;

    /// A named function call over a path, for `Op::Custom` providers that
    /// need backend-side expressions (e.g. `soundex(name)`).
    fn function(&self, name: &str, args: Vec<Box<dyn Path>>) -> Box<dyn Path>;

    fn sum(&self, path: &dyn Path) -> Box<dyn Path>;
    fn avg(&self, path: &dyn Path) -> Box<dyn Path>;
    fn min(&self, path: &dyn Path) -> Box<dyn Path>;
    fn max(&self, path: &dyn Path) -> Box<dyn Path>;
    fn count(&self, path: &dyn Path) -> Box<dyn Path>;
    fn count_distinct(&self, path: &dyn Path) -> Box<dyn Path>;
}

/// One result row (spec §6.2 `Tuple`).
pub trait Tuple {
    fn get(&self, alias: &str) -> Option<Value>;
    fn elements(&self) -> Vec<String>;
}

/// Entry point a host implements to hand the engine a backend (spec §6.2).
pub trait QueryBuilderFactory {
    fn create_tuple_query(&self, root_entity: &str) -> Box<dyn Query>;
    fn criteria_builder(&self) -> &dyn CriteriaBuilder;
}

/// Deferred-until-execution predicate closure (GLOSSARY
/// `PredicateResolver`): a closure over `(root, builder) → Predicate`,
/// produced by phase 2 of the condition protocol (C6) and invoked once the
/// multi-query engine (C10) has a live `Query`/`CriteriaBuilder` pair.
pub type PredicateResolver =
    Box<dyn Fn(&dyn Path, &dyn CriteriaBuilder) -> Box<dyn Predicate> + Send + Sync>;
