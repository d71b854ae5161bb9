//! FilterQL Condition - the abstract AND/OR/NOT condition DAG, the
//! two-phase structure/bind protocol, and the process-wide custom operator
//! registry (components C6/C7, spec §4.3/§4.4).

pub mod condition;
pub mod registry;
pub mod resolver;

pub use condition::{Condition, DefaultFilterContext, FilterContext};
pub use registry::{OperatorProvider, OperatorRegistry};
pub use resolver::{to_resolver, QueryExecutionParams};
