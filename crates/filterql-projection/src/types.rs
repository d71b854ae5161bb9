//! Projection grammar data model (spec §3 `ProjectionField`, §4.5).

use filterql_core::SortBy;
use serde::{Deserialize, Serialize};

/// Per-collection pagination/sort options, parsed from a bracketed
/// `[size=,page=,sort=]` clause. `size ∈ [1, 10000]`, default 10; `page ≥ 0`,
/// default 0.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionOptions {
    pub size: u32,
    pub page: u32,
    pub sort: Vec<SortBy>,
}

impl Default for CollectionOptions {
    fn default() -> Self {
        Self {
            size: 10,
            page: 0,
            sort: Vec::new(),
        }
    }
}

/// One segment of a dotted field path, carrying its own options when it
/// names a collection (`authors[size=10]`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub name: String,
    pub options: Option<CollectionOptions>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: None,
        }
    }

    pub fn with_options(name: impl Into<String>, options: CollectionOptions) -> Self {
        Self {
            name: name.into(),
            options: Some(options),
        }
    }
}

/// One parsed projection entry (spec §3): a dotted path prefix of navigable
/// segments, plus the leaf field names requested at the end of that path.
/// An empty `fields` list means "project this node's default leaves" (§4.5
/// "Omitted projection ⇒ project all scalar ... fields").
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionField {
    pub prefix: Vec<PathSegment>,
    pub fields: Vec<String>,
}

impl ProjectionField {
    /// The options attached to the deepest navigable segment, if any —
    /// convenient for callers that only care about the innermost collection.
    pub fn innermost_options(&self) -> Option<&CollectionOptions> {
        self.prefix.last().and_then(|seg| seg.options.as_ref())
    }
}

pub(crate) fn sort_term(field: &str, direction: &str) -> Result<SortBy, String> {
    match direction.to_ascii_lowercase().as_str() {
        "asc" => Ok(SortBy::asc(field)),
        "desc" => Ok(SortBy::desc(field)),
        other => Err(format!("unknown sort direction '{other}', expected asc|desc")),
    }
}
