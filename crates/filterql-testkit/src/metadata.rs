//! Fixture `ProjectionMetadata`/`MetadataRegistry` and `PropertyReference`s
//! for the handful of entities the end-to-end scenario tests need: `User`
//! (flat filter scenarios), `Author`/`Book` (nested collections), and
//! `Company`/`Department` (computed-field post-aggregation).

use filterql_core::property::{PropertyReference, ValueType};
use filterql_projection::{ComputedFieldMeta, DirectMapping, MetadataRegistry, ProjectionMetadata, Reducer, ReducerBinding};
use std::collections::HashMap;
use std::sync::Arc;

pub struct FixtureRegistry {
    entries: HashMap<String, Arc<ProjectionMetadata>>,
}

impl FixtureRegistry {
    pub fn new() -> Self {
        let mut entries = HashMap::new();

        entries.insert(
            "User".to_string(),
            Arc::new(ProjectionMetadata {
                entity_class: "User".to_string(),
                direct_mappings: vec![
                    DirectMapping::scalar("id", "id", "Integer"),
                    DirectMapping::scalar("username", "username", "String"),
                    DirectMapping::scalar("name", "name", "String"),
                    DirectMapping::scalar("age", "age", "Integer"),
                ],
                computed_fields: vec![],
                id_fields: vec!["id".to_string()],
            }),
        );

        entries.insert(
            "Author".to_string(),
            Arc::new(ProjectionMetadata {
                entity_class: "Author".to_string(),
                direct_mappings: vec![
                    DirectMapping::scalar("id", "id", "Integer"),
                    DirectMapping::scalar("name", "name", "String"),
                    DirectMapping::collection("books", "books", "Book"),
                ],
                computed_fields: vec![],
                id_fields: vec!["id".to_string()],
            }),
        );

        entries.insert(
            "Book".to_string(),
            Arc::new(ProjectionMetadata {
                entity_class: "Book".to_string(),
                direct_mappings: vec![
                    DirectMapping::scalar("id", "id", "Integer"),
                    DirectMapping::scalar("title", "title", "String"),
                    DirectMapping::scalar("year", "year", "Integer"),
                    DirectMapping::scalar("author", "author", "Author"),
                ],
                computed_fields: vec![],
                id_fields: vec!["id".to_string()],
            }),
        );

        entries.insert(
            "Department".to_string(),
            Arc::new(ProjectionMetadata {
                entity_class: "Department".to_string(),
                direct_mappings: vec![
                    DirectMapping::scalar("id", "id", "Integer"),
                    DirectMapping::scalar("budget", "budget", "Integer"),
                    DirectMapping::scalar("company", "company", "Company"),
                ],
                computed_fields: vec![],
                id_fields: vec!["id".to_string()],
            }),
        );

        entries.insert(
            "Company".to_string(),
            Arc::new(ProjectionMetadata {
                entity_class: "Company".to_string(),
                direct_mappings: vec![
                    DirectMapping::scalar("id", "id", "Integer"),
                    DirectMapping::scalar("name", "name", "String"),
                    DirectMapping::collection("departments", "departments", "Department"),
                ],
                computed_fields: vec![ComputedFieldMeta {
                    dto_field: "totalBudgetInfo".to_string(),
                    // dependency 0 ("id") is a plain, non-aggregate dependency —
                    // it reuses the id slot already present for row identity —
                    // dependency 1 is reduced via SUM over the departments
                    // association (spec §4.6 step 4).
                    dependencies: vec!["id".to_string(), "departments.budget".to_string()],
                    reducers: vec![ReducerBinding { dependency_index: 1, reducer: Reducer::Sum }],
                    provider_class: "CompanyBudgetProvider".to_string(),
                    method_name: "totalBudgetInfo".to_string(),
                }],
                id_fields: vec!["id".to_string()],
            }),
        );

        Self { entries }
    }
}

impl Default for FixtureRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataRegistry for FixtureRegistry {
    fn metadata_for(&self, entity_class: &str) -> Option<Arc<ProjectionMetadata>> {
        self.entries.get(entity_class).cloned()
    }
}

pub fn username_property() -> Arc<PropertyReference> {
    PropertyReference::new("username", ValueType::String, ["EQ", "NE", "MATCHES", "NOT_MATCHES", "IN", "NOT_IN", "IS_NULL", "NOT_NULL"], "User")
}

pub fn age_property() -> Arc<PropertyReference> {
    PropertyReference::new("age", ValueType::Integer, ["EQ", "NE", "GT", "GTE", "LT", "LTE", "RANGE", "NOT_RANGE", "IS_NULL", "NOT_NULL"], "User")
}

pub fn name_property() -> Arc<PropertyReference> {
    PropertyReference::new("name", ValueType::String, ["EQ", "NE", "MATCHES", "NOT_MATCHES"], "User")
}
