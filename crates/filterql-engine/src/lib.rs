//! FilterQL Engine - the multi-query batch fetch algorithm, composite
//! identity, computed-field evaluation, and response shaping (components
//! C10/C11, spec §4.7/§4.8/§6.3/§6.4).
//!
//! This is the only crate that drives a [`filterql_core::query_builder`]
//! backend end to end: it takes an [`filterql_projection::ExecutionPlan`]
//! and a resolved [`filterql_condition::Condition`] and returns either raw
//! [`row::RowBuffer`] trees or rendered JSON.
//!
//! # Modules
//!
//! - [`composite`] — `CompositeKey`, batch partitioning, `IdPredicateBuilder` (§4.8).
//! - [`row`] — `RowBuffer`, the materialized per-row record (§3).
//! - [`resolver`] — `ComputedFieldProvider` / `InstanceResolver` (§6.3).
//! - [`computed`] — computed-field evaluation and the dependency-slot
//!   removal rule (§4.7 step 5, §9).
//! - [`plan_index`] — path-keyed flattening of an `ExecutionPlan` tree.
//! - [`render`] — `RowBuffer` → nested JSON (§6.4).
//! - [`engine`] — the `Engine` entry point tying the above together (§4.7).

pub mod composite;
pub mod computed;
pub mod engine;
pub mod path;
pub mod plan_index;
pub mod render;
pub mod resolver;
pub mod row;

pub use composite::{CompositeKey, IdPredicateBuilder, MAX_IN_CLAUSE, MAX_PARENT_BATCH};
pub use engine::Engine;
pub use plan_index::PlanIndex;
pub use render::render_rows;
pub use resolver::{ComputedFieldProvider, InstanceResolver, NoBeanResolver};
pub use row::RowBuffer;
