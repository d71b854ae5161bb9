//! Projection metadata traits (spec §6.1) — the read-only registry the
//! execution plan builder (C9) consults to resolve DTO field paths to entity
//! paths. Implementations are supplied by hosts (typically generated from
//! annotations); FilterQL only constrains the shape.

use std::sync::Arc;

/// One direct (non-computed) DTO↔entity field mapping.
#[derive(Clone, Debug, PartialEq)]
pub struct DirectMapping {
    pub dto_field: String,
    pub entity_field: String,
    pub dto_field_type: String,
    pub collection: bool,
    pub is_nested: bool,
    /// For a `collection` mapping: the entity class of its elements, used to
    /// look up the child's own `ProjectionMetadata` (§4.6 step 3).
    pub target_entity_class: Option<String>,
    /// An explicit `mappedBy` field name on the child side, if declared —
    /// the first of the three `parentReferenceField` resolution strategies
    /// in §4.6 step 3.
    pub mapped_by: Option<String>,
}

impl DirectMapping {
    pub fn scalar(dto_field: impl Into<String>, entity_field: impl Into<String>, dto_field_type: impl Into<String>) -> Self {
        Self {
            dto_field: dto_field.into(),
            entity_field: entity_field.into(),
            dto_field_type: dto_field_type.into(),
            collection: false,
            is_nested: false,
            target_entity_class: None,
            mapped_by: None,
        }
    }

    pub fn collection(
        dto_field: impl Into<String>,
        entity_field: impl Into<String>,
        target_entity_class: impl Into<String>,
    ) -> Self {
        Self {
            dto_field: dto_field.into(),
            entity_field: entity_field.into(),
            dto_field_type: "List".to_string(),
            collection: true,
            is_nested: false,
            target_entity_class: Some(target_entity_class.into()),
            mapped_by: None,
        }
    }

    pub fn with_mapped_by(mut self, field: impl Into<String>) -> Self {
        self.mapped_by = Some(field.into());
        self
    }
}

/// A single reducer applied to a computed field's dependency at the given
/// index (spec §4.6 step 4: `SUM, AVG, COUNT, COUNT_DISTINCT, MIN, MAX`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Avg,
    Count,
    CountDistinct,
    Min,
    Max,
}

/// A reducer bound to one of a computed field's dependency slots.
#[derive(Clone, Debug, PartialEq)]
pub struct ReducerBinding {
    pub dependency_index: usize,
    pub reducer: Reducer,
}

/// A computed (derived) DTO field: a provider method invoked post-aggregation
/// over its (possibly reduced) dependency values (§4.6 step 4, §6.3).
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedFieldMeta {
    pub dto_field: String,
    pub dependencies: Vec<String>,
    pub reducers: Vec<ReducerBinding>,
    pub provider_class: String,
    pub method_name: String,
}

impl ComputedFieldMeta {
    /// Whether the dependency at `index` is consumed through a reducer
    /// (aggregate, `SQL_IGNORE`) rather than selected directly (`SQL_ONLY`).
    pub fn is_aggregate_dependency(&self, index: usize) -> bool {
        self.reducers.iter().any(|r| r.dependency_index == index)
    }
}

/// Metadata for one DTO/projection root: its direct mappings, computed
/// fields, and entity id-field names.
pub struct ProjectionMetadata {
    pub entity_class: String,
    pub direct_mappings: Vec<DirectMapping>,
    pub computed_fields: Vec<ComputedFieldMeta>,
    pub id_fields: Vec<String>,
}

impl ProjectionMetadata {
    pub fn direct_mapping(&self, dto_field: &str) -> Option<&DirectMapping> {
        self.direct_mappings.iter().find(|m| m.dto_field == dto_field)
    }

    pub fn computed_field(&self, dto_field: &str) -> Option<&ComputedFieldMeta> {
        self.computed_fields.iter().find(|c| c.dto_field == dto_field)
    }

    /// Every direct mapping that is a scalar, non-collection, non-nested
    /// leaf — the default projection when none is requested (§4.5).
    pub fn default_scalar_fields(&self) -> impl Iterator<Item = &DirectMapping> {
        self.direct_mappings
            .iter()
            .filter(|m| !m.collection && !m.is_nested)
    }
}

/// The read-only metadata registry consulted by the plan builder.
pub trait MetadataRegistry: Send + Sync {
    fn metadata_for(&self, entity_class: &str) -> Option<Arc<ProjectionMetadata>>;

    /// Resolve a dotted DTO path to its canonical entity path, within the
    /// scope of `projection_class`. `ignore_case` mirrors `FilterConfig`'s
    /// case-sensitivity knob (spec §6.1: "throws on not-found").
    fn to_entity_path(
        &self,
        dto_path: &str,
        projection_class: &str,
        ignore_case: bool,
    ) -> filterql_core::Result<String> {
        let metadata = self
            .metadata_for(projection_class)
            .ok_or_else(|| filterql_core::Error::projection_definition(format!("no metadata for '{projection_class}'")))?;

        let found = metadata.direct_mappings.iter().find(|m| {
            if ignore_case {
                m.dto_field.eq_ignore_ascii_case(dto_path)
            } else {
                m.dto_field == dto_path
            }
        });

        match found {
            Some(mapping) => Ok(mapping.entity_field.clone()),
            None => Err(filterql_core::Error::projection_definition(format!(
                "'{dto_path}' does not resolve to an entity path on '{projection_class}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixtureRegistry {
        entries: Mutex<HashMap<String, Arc<ProjectionMetadata>>>,
    }

    impl MetadataRegistry for FixtureRegistry {
        fn metadata_for(&self, entity_class: &str) -> Option<Arc<ProjectionMetadata>> {
            self.entries.lock().unwrap().get(entity_class).cloned()
        }
    }

    fn registry() -> FixtureRegistry {
        let mut entries = HashMap::new();
        entries.insert(
            "User".to_string(),
            Arc::new(ProjectionMetadata {
                entity_class: "User".to_string(),
                direct_mappings: vec![DirectMapping::scalar("name", "name", "String")],
                computed_fields: vec![],
                id_fields: vec!["id".to_string()],
            }),
        );
        FixtureRegistry { entries: Mutex::new(entries) }
    }

    #[test]
    fn resolves_a_direct_mapping() {
        let reg = registry();
        assert_eq!(reg.to_entity_path("name", "User", false).unwrap(), "name");
    }

    #[test]
    fn unresolvable_path_errors() {
        let reg = registry();
        assert!(reg.to_entity_path("nope", "User", false).is_err());
    }

    #[test]
    fn default_scalar_fields_excludes_collections_and_nested() {
        let meta = ProjectionMetadata {
            entity_class: "User".to_string(),
            direct_mappings: vec![
                DirectMapping::scalar("name", "name", "String"),
                DirectMapping::collection("books", "books", "Book"),
            ],
            computed_fields: vec![],
            id_fields: vec!["id".into()],
        };
        let defaults: Vec<_> = meta.default_scalar_fields().map(|m| m.dto_field.as_str()).collect();
        assert_eq!(defaults, vec!["name"]);
    }
}
