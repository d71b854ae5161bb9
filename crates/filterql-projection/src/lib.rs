//! FilterQL Projection - the compact projection grammar parser, the
//! projection metadata seam (§6.1), and the execution-plan builder
//! (components C8/C9, spec §4.5/§4.6).

pub mod grammar;
pub mod metadata;
pub mod plan;
pub mod types;

pub use grammar::parse_projection;
pub use metadata::{ComputedFieldMeta, DirectMapping, MetadataRegistry, Reducer, ReducerBinding, ProjectionMetadata};
pub use plan::{CollectionNode, ComputedFieldPlan, ExecutionPlan, FieldSchema, FieldSlot, SlotStatus};
pub use types::{CollectionOptions, PathSegment, ProjectionField};
