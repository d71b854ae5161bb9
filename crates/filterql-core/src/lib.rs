//! FilterQL Core - shared data model, coercion, validation, and the
//! abstract backend seam for the FilterQL filter/projection/fetch CORE.
//!
//! This crate has no knowledge of the DSL (`filterql-dsl`), the condition
//! DAG (`filterql-condition`), the projection grammar
//! (`filterql-projection`), or the multi-query engine (`filterql-engine`) —
//! every other crate in the workspace depends on this one, never the other
//! way around.
//!
//! # Modules
//!
//! - [`op`] — the `Op` taxonomy (C1).
//! - [`value`] / [`property`] — runtime values and `PropertyReference` (C2).
//! - [`coercion`] / [`validation`] — type coercion and arity checks (C2/C3).
//! - [`filter`] — `FilterDefinition`, `FilterRequest`, `Pagination` (§3).
//! - [`config`] — `FilterConfig` and `DslPolicy` (§4.1, §4.2).
//! - [`query_builder`] — the abstract backend seam (§6.2).
//! - [`cancellation`] — cooperative cancellation (§5).
//! - [`error`] — the shared error taxonomy (§7).

pub mod cancellation;
pub mod coercion;
pub mod config;
pub mod error;
pub mod filter;
pub mod op;
pub mod property;
pub mod query_builder;
pub mod validation;
pub mod value;

pub use cancellation::CancellationToken;
pub use config::{DslPolicy, EnumMatching, FilterConfig, NullHandling, NullValuePolicy, StringNormalization};
pub use error::{Error, Result};
pub use filter::{FilterDefinition, FilterRequest, Pagination, SortBy, SortDirection};
pub use op::{Op, OpMeta};
pub use property::{PropertyReference, ValueType};
pub use query_builder::{CriteriaBuilder, OrderExpr, Path, Predicate, PredicateResolver, Query, QueryBuilderFactory, Tuple, UNBOUNDED};
pub use value::Value;

/// Prelude for common imports.
pub mod prelude {
    pub use super::config::FilterConfig;
    pub use super::error::{Error, Result};
    pub use super::filter::{FilterDefinition, FilterRequest, Pagination, SortBy};
    pub use super::op::Op;
    pub use super::property::{PropertyReference, ValueType};
    pub use super::value::Value;
}
