//! `PropertyReference` and its value-type taxonomy (spec §3).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Semantic class of values a property holds, used by coercion (C2) and
/// validation (C3) to pick the right conversion/compatibility rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    Uuid,
    /// A fixed set of names; `case_insensitive` governs the §4.1 enum
    /// coercion fallback.
    Enum {
        variants: Vec<String>,
        case_insensitive: bool,
    },
    /// A property whose own values are a collection of `element`.
    Collection(Box<ValueType>),
}

/// A symbolic filterable property (spec §3).
///
/// Defined by the schema registry at startup and immutable thereafter —
/// cheap to share, so it is held behind `Arc` wherever a `FilterDefinition`
/// or `Condition` atom needs one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyReference {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub supported_operators: HashSet<String>,
    /// Opaque tag of the owning aggregate/entity, e.g. `"Author"`.
    pub entity_type: String,
}

impl PropertyReference {
    pub fn new(
        name: impl Into<String>,
        value_type: ValueType,
        supported_operators: impl IntoIterator<Item = &'static str>,
        entity_type: impl Into<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            value_type,
            supported_operators: supported_operators.into_iter().map(String::from).collect(),
            entity_type: entity_type.into(),
        })
    }

    /// Whether `op_code` (already upper-cased) is declared supported.
    /// Custom operators are checked against the registry separately (§4.1);
    /// this only reflects the property's own declared set.
    pub fn supports(&self, op_code: &str) -> bool {
        self.supported_operators.contains(op_code)
    }
}
