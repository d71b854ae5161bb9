//! `FilterDefinition`, `FilterRequest`, and pagination (spec §3, §6.4).

use crate::op::Op;
use crate::property::PropertyReference;
use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One named filter: a property, an operator, and (unless the operator is a
/// null-check) a value. Immutable once constructed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterDefinition {
    #[serde(rename = "ref")]
    pub property: Arc<PropertyReference>,
    pub op: Op,
    pub value: Value,
}

impl FilterDefinition {
    pub fn new(property: Arc<PropertyReference>, op: Op, value: Value) -> Self {
        Self { property, op, value }
    }
}

/// Sort direction for a `SortBy` term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl Default for SortDirection {
    fn default() -> Self {
        Self::Asc
    }
}

/// One ORDER BY term.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortBy {
    pub field: String,
    pub direction: SortDirection,
}

impl SortBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// The inclusive bounds used by spec §3/§4.7: `size ∈ [1, 10000]`.
pub const MIN_PAGE_SIZE: u32 = 1;
pub const MAX_PAGE_SIZE: u32 = 10_000;

/// Root-level pagination (spec §3 `Pagination`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: u32,
    pub size: u32,
    pub sort: Vec<SortBy>,
}

impl Default for Pagination {
    /// §4.7 step 2 default: `offset: 0, size: 50`.
    fn default() -> Self {
        Self {
            offset: 0,
            size: 50,
            sort: Vec::new(),
        }
    }
}

impl Pagination {
    /// Builder-style constructor (SPEC_FULL §D.3) — clamps `size` into
    /// `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]` rather than erroring, matching how
    /// `CollectionOptions` (§4.5) silently bounds its own `size`.
    pub fn new(offset: u32, size: u32) -> Self {
        Self {
            offset,
            size: size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE),
            sort: Vec::new(),
        }
    }

    pub fn with_sort(mut self, sort: Vec<SortBy>) -> Self {
        self.sort = sort;
        self
    }

    pub fn push_sort(mut self, term: SortBy) -> Self {
        self.sort.push(term);
        self
    }
}

/// The inbound request shape of spec §6.4: filters keyed by free-form
/// argKey, a combinator DSL expression, an optional projection, and
/// optional pagination.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterRequest {
    pub filters: IndexMap<String, FilterDefinition>,
    pub combine_with: String,
    #[serde(default)]
    pub projection: Option<Vec<String>>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl FilterRequest {
    pub fn new(combine_with: impl Into<String>) -> Self {
        Self {
            filters: IndexMap::new(),
            combine_with: combine_with.into(),
            projection: None,
            pagination: None,
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, def: FilterDefinition) -> Self {
        self.filters.insert(key.into(), def);
        self
    }

    pub fn with_projection(mut self, fields: Vec<String>) -> Self {
        self.projection = Some(fields);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}
