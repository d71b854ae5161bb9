//! Execution plan builder (component C9, spec §4.6).
//!
//! Grounded on `postrust_core::plan::read_plan::ReadPlan` / `ReadPlanTree`
//! (`build_select_fields`, `build_relation_selects`): the overall shape of
//! "walk the requested fields against metadata, emit a typed, level-ordered
//! plan" is the same job the teacher's read-plan builder does, generalized
//! here from a single JOIN-shaped tree to the batch-level tree §4.6/§4.7
//! need. `postrust_core::schema_cache::relationship::Relationship` informed
//! the `mappedBy`/reverse-scan/naming-convention cascade for
//! `parent_reference_field` (§4.6 step 3).

use crate::grammar::parse_projection;
use crate::metadata::{ComputedFieldMeta, DirectMapping, MetadataRegistry, ProjectionMetadata};
use crate::types::{CollectionOptions, ProjectionField};
use filterql_core::{Error, Result, SortBy};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Per-slot status (spec §4.6, §9 design note).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotStatus {
    /// Selected and emitted.
    Sql,
    /// Selected, not emitted — a dependency of a computed field or a
    /// batching key.
    SqlOnly,
    /// Emitted, not selected through the plain select list — a computed
    /// output, or (for a dependency) a value populated through the
    /// aggregate-reducer path rather than a literal column select.
    SqlIgnore,
    /// Not selected at all — a placeholder marking where a child
    /// collection's rows attach.
    SqlIgnoreCollection,
}

/// One row slot: an entity-side field name, the DTO alias it is rendered
/// under, and its status.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSlot {
    pub entity_field: String,
    pub dto_alias: String,
    pub status: SlotStatus,
}

/// Compact indexed description of every slot in a row (SPEC_FULL §D.4):
/// two parallel arrays (implicit in `slots`) plus two hash indexes for
/// O(1) lookup both ways.
#[derive(Clone, Debug, Default)]
pub struct FieldSchema {
    slots: Vec<FieldSlot>,
    by_entity: IndexMap<String, usize>,
    by_dto: IndexMap<String, usize>,
}

impl FieldSchema {
    pub fn push(&mut self, entity_field: impl Into<String>, dto_alias: impl Into<String>, status: SlotStatus) -> usize {
        let entity_field = entity_field.into();
        let dto_alias = dto_alias.into();
        let idx = self.slots.len();
        self.by_entity.insert(entity_field.clone(), idx);
        self.by_dto.insert(dto_alias.clone(), idx);
        self.slots.push(FieldSlot { entity_field, dto_alias, status });
        idx
    }

    pub fn slots(&self) -> &[FieldSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn index_by_entity_field(&self, field: &str) -> Option<usize> {
        self.by_entity.get(field).copied()
    }

    pub fn index_by_dto_field(&self, field: &str) -> Option<usize> {
        self.by_dto.get(field).copied()
    }

    pub fn by_entity_field(&self, field: &str) -> Option<&FieldSlot> {
        self.index_by_entity_field(field).map(|i| &self.slots[i])
    }

    pub fn by_dto_field(&self, field: &str) -> Option<&FieldSlot> {
        self.index_by_dto_field(field).map(|i| &self.slots[i])
    }

    /// Plain columns to select via `Query::multi_select` — `SQL`/`SQL_ONLY`
    /// slots only; aggregate and collection-placeholder slots are populated
    /// through other mechanisms (reducer selects, child batch queries).
    pub fn selectable(&self) -> impl Iterator<Item = (usize, &FieldSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.status, SlotStatus::Sql | SlotStatus::SqlOnly))
    }

    /// Slots that end up in the final emitted row — `SQL`/`SQL_IGNORE`.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &FieldSlot)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.status, SlotStatus::Sql | SlotStatus::SqlIgnore))
    }
}

/// A computed field bound to its resolved dependency/output slot aliases
/// within one `FieldSchema`.
#[derive(Clone, Debug)]
pub struct ComputedFieldPlan {
    pub meta: ComputedFieldMeta,
    pub dependency_aliases: Vec<String>,
    pub output_alias: String,
}

/// One batched child-collection fetch (spec §3 `CollectionNode`).
#[derive(Clone, Debug)]
pub struct CollectionNode {
    /// The DTO field name this collection is attached under on its parent.
    pub dto_field: String,
    /// Dotted chain of ancestor collection DTO names from the root down to
    /// (but not including) this node — `[]` for a root-level collection,
    /// `["authors"]` for `authors.books`. Used at execution time to find the
    /// exact set of parent rows this node's ids come from (SPEC_FULL §D —
    /// spec §4.7's "parent IDs become the next level's parent IDs" is exact
    /// for a single linear chain; a branching projection tree needs this
    /// extra bookkeeping to avoid pooling unrelated siblings' ids together).
    pub parent_path: Vec<String>,
    pub element_type: String,
    pub parent_reference_field: String,
    pub id_fields: Vec<String>,
    pub schema: FieldSchema,
    pub computed_fields: Vec<ComputedFieldPlan>,
    pub sort_fields: Vec<SortBy>,
    pub options: CollectionOptions,
    /// DTO fields directly named in the requested projection at this node
    /// (not merely pulled in as a computed-field dependency) — spec §9 Open
    /// Question's removal rule.
    pub directly_projected: HashSet<String>,
}

/// The full execution plan (spec §3 `ExecutionPlan`): root scalar/computed
/// fields plus `CollectionLevel[]` ordered by depth (BFS).
#[derive(Clone, Debug, Default)]
pub struct ExecutionPlan {
    pub root_entity: String,
    pub root_schema: FieldSchema,
    pub root_computed_fields: Vec<ComputedFieldPlan>,
    pub root_directly_projected: HashSet<String>,
    /// The root entity's own id fields — carried alongside `root_schema` so
    /// the engine (C10) can key root `RowBuffer`s and seed the first
    /// `CollectionLevel`'s parent-id batch without re-querying metadata.
    pub root_id_fields: Vec<String>,
    pub levels: Vec<Vec<CollectionNode>>,
}

#[derive(Default)]
struct GroupAcc {
    options: Option<CollectionOptions>,
    sub_entries: Vec<ProjectionField>,
}

struct PendingGroup {
    parent_path: Vec<String>,
    parent_entity: String,
    name: String,
    options: CollectionOptions,
    sub_entries: Vec<ProjectionField>,
}

/// Split parsed projection entries into this level's requested leaf fields
/// and its per-collection sub-groups, rejecting conflicting bracketed
/// options on repeated references to the same collection (spec §4.5
/// "Multiple references to the same collection path must carry *identical*
/// options").
fn split_requests(entries: Vec<ProjectionField>, context: &str) -> Result<(Vec<String>, IndexMap<String, GroupAcc>)> {
    let mut leaf_fields = Vec::new();
    let mut groups: IndexMap<String, GroupAcc> = IndexMap::new();

    for entry in entries {
        if entry.prefix.is_empty() {
            leaf_fields.extend(entry.fields);
            continue;
        }

        let mut prefix = entry.prefix;
        let head = prefix.remove(0);
        let sub_entry = ProjectionField { prefix, fields: entry.fields };

        let acc = groups.entry(head.name.clone()).or_default();
        if let Some(opts) = head.options {
            match &acc.options {
                Some(existing) if *existing != opts => {
                    return Err(Error::projection_definition(format!(
                        "conflicting collection options for '{}' in '{context}'",
                        head.name
                    )));
                }
                _ => acc.options = Some(opts),
            }
        }
        acc.sub_entries.push(sub_entry);
    }

    Ok((leaf_fields, groups))
}

/// Resolve one entity's scalar/collection/computed fields into a
/// `FieldSchema` plus the computed-field plans bound to it (spec §4.6 steps
/// 1-4).
fn resolve_node(
    metadata: &ProjectionMetadata,
    leaf_fields: &[String],
    use_defaults: bool,
) -> Result<(FieldSchema, Vec<ComputedFieldPlan>, HashSet<String>)> {
    let mut schema = FieldSchema::default();

    let mut requested: Vec<String> = Vec::new();
    if use_defaults {
        requested.extend(metadata.default_scalar_fields().map(|m| m.dto_field.clone()));
        requested.extend(metadata.computed_fields.iter().map(|c| c.dto_field.clone()));
    } else {
        requested.extend(leaf_fields.iter().cloned());
    }

    // id fields are always selected, even when not requested directly —
    // they key per-parent batching and row identity (§4.7, §4.8).
    for id_field in &metadata.id_fields {
        if schema.index_by_entity_field(id_field).is_some() {
            continue;
        }
        let dto_alias = metadata
            .direct_mappings
            .iter()
            .find(|m| m.entity_field == *id_field)
            .map(|m| m.dto_field.clone())
            .unwrap_or_else(|| id_field.clone());
        let visible = requested.iter().any(|r| r == &dto_alias);
        schema.push(id_field.clone(), dto_alias, if visible { SlotStatus::Sql } else { SlotStatus::SqlOnly });
    }

    let mut directly_projected = HashSet::new();

    for field in &requested {
        if schema.index_by_dto_field(field).is_some() {
            directly_projected.insert(field.clone());
            continue;
        }
        if let Some(mapping) = metadata.direct_mapping(field) {
            let status = if mapping.collection {
                SlotStatus::SqlIgnoreCollection
            } else {
                SlotStatus::Sql
            };
            schema.push(mapping.entity_field.clone(), mapping.dto_field.clone(), status);
            directly_projected.insert(field.clone());
            continue;
        }
        if metadata.computed_field(field).is_none() {
            return Err(Error::projection_definition(format!(
                "'{field}' does not resolve to an entity path on '{}'",
                metadata.entity_class
            )));
        }
        directly_projected.insert(field.clone());
    }

    let mut computed_plans = Vec::new();
    for field in &requested {
        let Some(meta) = metadata.computed_field(field) else { continue };

        let mut dependency_aliases = Vec::with_capacity(meta.dependencies.len());
        for (idx, dep_path) in meta.dependencies.iter().enumerate() {
            let alias = dep_path.replace('.', "__");
            if schema.index_by_dto_field(&alias).is_none() {
                let status = if meta.is_aggregate_dependency(idx) {
                    SlotStatus::SqlIgnore
                } else {
                    SlotStatus::SqlOnly
                };
                schema.push(dep_path.clone(), alias.clone(), status);
            }
            dependency_aliases.push(alias);
        }

        let output_alias = meta.dto_field.clone();
        if schema.index_by_dto_field(&output_alias).is_none() {
            schema.push(format!("__computed__{output_alias}"), output_alias.clone(), SlotStatus::SqlIgnore);
        }

        computed_plans.push(ComputedFieldPlan {
            meta: meta.clone(),
            dependency_aliases,
            output_alias,
        });
    }

    Ok((schema, computed_plans, directly_projected))
}

fn resolve_parent_reference_field(mapping: &DirectMapping, element_metadata: &ProjectionMetadata, parent_entity: &str) -> String {
    if let Some(explicit) = &mapping.mapped_by {
        return explicit.clone();
    }
    if let Some(found) = element_metadata
        .direct_mappings
        .iter()
        .find(|m| !m.collection && m.dto_field_type == parent_entity)
    {
        return found.entity_field.clone();
    }
    camel_lower_first(parent_entity)
}

fn camel_lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Build the execution plan for `root_entity` against `projection` (spec
/// §4.6). `None` means "no projection requested" — every scalar leaf plus
/// every declared computed field (§4.5 "Omitted projection").
pub fn build_plan(registry: &dyn MetadataRegistry, root_entity: &str, projection: Option<&[String]>) -> Result<ExecutionPlan> {
    let root_metadata = registry
        .metadata_for(root_entity)
        .ok_or_else(|| Error::projection_definition(format!("no projection metadata for '{root_entity}'")))?;

    let entries = match projection {
        Some(raw) => parse_projection(raw)?,
        None => Vec::new(),
    };

    let (root_leaf_fields, root_groups) = split_requests(entries, root_entity)?;
    let (root_schema, root_computed_fields, root_directly_projected) =
        resolve_node(&root_metadata, &root_leaf_fields, projection.is_none())?;

    let mut levels: Vec<Vec<CollectionNode>> = Vec::new();
    let mut frontier: Vec<PendingGroup> = root_groups
        .into_iter()
        .map(|(name, acc)| PendingGroup {
            parent_path: Vec::new(),
            parent_entity: root_entity.to_string(),
            name,
            options: acc.options.unwrap_or_default(),
            sub_entries: acc.sub_entries,
        })
        .collect();

    while !frontier.is_empty() {
        let mut level_nodes = Vec::with_capacity(frontier.len());
        let mut next_frontier = Vec::new();

        for pending in frontier {
            let parent_metadata = registry
                .metadata_for(&pending.parent_entity)
                .ok_or_else(|| Error::projection_definition(format!("no projection metadata for '{}'", pending.parent_entity)))?;

            let mapping = parent_metadata.direct_mapping(&pending.name).ok_or_else(|| {
                Error::projection_definition(format!(
                    "'{}' does not resolve to an entity path on '{}'",
                    pending.name, pending.parent_entity
                ))
            })?;
            if !mapping.collection {
                return Err(Error::projection_definition(format!(
                    "'{}' is a scalar field on '{}', not a collection, but was given bracketed options",
                    pending.name, pending.parent_entity
                )));
            }
            let element_type = mapping
                .target_entity_class
                .clone()
                .ok_or_else(|| Error::Internal(format!("collection mapping '{}' has no target entity class", pending.name)))?;
            let element_metadata = registry
                .metadata_for(&element_type)
                .ok_or_else(|| Error::projection_definition(format!("no projection metadata for '{element_type}'")))?;

            let (sub_leaf_fields, sub_groups) = split_requests(pending.sub_entries, &pending.name)?;
            let use_defaults = sub_leaf_fields.is_empty() && sub_groups.is_empty();
            let (schema, computed_fields, directly_projected) = resolve_node(&element_metadata, &sub_leaf_fields, use_defaults)?;

            let parent_reference_field = resolve_parent_reference_field(mapping, &element_metadata, &pending.parent_entity);

            let mut node_path = pending.parent_path.clone();
            node_path.push(pending.name.clone());

            for (name, acc) in sub_groups {
                next_frontier.push(PendingGroup {
                    parent_path: node_path.clone(),
                    parent_entity: element_type.clone(),
                    name,
                    options: acc.options.unwrap_or_default(),
                    sub_entries: acc.sub_entries,
                });
            }

            level_nodes.push(CollectionNode {
                dto_field: pending.name,
                parent_path: pending.parent_path,
                element_type,
                parent_reference_field,
                id_fields: element_metadata.id_fields.clone(),
                schema,
                computed_fields,
                sort_fields: pending.options.sort.clone(),
                options: pending.options,
                directly_projected,
            });
        }

        levels.push(level_nodes);
        frontier = next_frontier;
    }

    Ok(ExecutionPlan {
        root_entity: root_entity.to_string(),
        root_schema,
        root_computed_fields,
        root_directly_projected,
        root_id_fields: root_metadata.id_fields.clone(),
        levels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Reducer, ReducerBinding};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct FixtureRegistry {
        entries: Mutex<HashMap<String, Arc<ProjectionMetadata>>>,
    }

    impl MetadataRegistry for FixtureRegistry {
        fn metadata_for(&self, entity_class: &str) -> Option<Arc<ProjectionMetadata>> {
            self.entries.lock().unwrap().get(entity_class).cloned()
        }
    }

    fn author_books_registry() -> FixtureRegistry {
        let mut entries = HashMap::new();
        entries.insert(
            "Book".to_string(),
            Arc::new(ProjectionMetadata {
                entity_class: "Book".to_string(),
                direct_mappings: vec![
                    DirectMapping::scalar("title", "title", "String"),
                    DirectMapping::scalar("year", "year", "Integer"),
                    DirectMapping::scalar("author", "author", "Author"),
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
                    DirectMapping::scalar("id", "id", "Uuid"),
                    DirectMapping::scalar("name", "name", "String"),
                    DirectMapping::collection("books", "books", "Book"),
                ],
                computed_fields: vec![],
                id_fields: vec!["id".to_string()],
            }),
        );
        FixtureRegistry { entries: Mutex::new(entries) }
    }

    #[test]
    fn root_scalars_resolve_without_projection() {
        let reg = author_books_registry();
        let plan = build_plan(&reg, "Author", None).unwrap();
        assert!(plan.root_schema.by_dto_field("name").is_some());
        // "books" is a collection, excluded from default scalar fields
        assert!(plan.root_schema.by_dto_field("books").is_none());
        assert!(plan.levels.is_empty());
    }

    #[test]
    fn nested_collection_with_options_builds_one_level() {
        let reg = author_books_registry();
        let projection = vec!["id".to_string(), "name".to_string(), "books[size=2,sort=year:desc].title,year".to_string()];
        let plan = build_plan(&reg, "Author", Some(&projection)).unwrap();
        assert_eq!(plan.levels.len(), 1);
        let node = &plan.levels[0][0];
        assert_eq!(node.dto_field, "books");
        assert_eq!(node.element_type, "Book");
        assert_eq!(node.options.size, 2);
        assert_eq!(node.parent_reference_field, "author");
        assert!(node.schema.by_dto_field("title").is_some());
        assert!(node.schema.by_dto_field("year").is_some());
    }

    #[test]
    fn conflicting_options_on_repeated_collection_path_is_rejected() {
        let reg = author_books_registry();
        let projection = vec!["books[size=2].title".to_string(), "books[size=5].year".to_string()];
        assert!(build_plan(&reg, "Author", Some(&projection)).is_err());
    }

    #[test]
    fn identical_options_on_repeated_collection_path_is_accepted() {
        let reg = author_books_registry();
        let projection = vec!["books[size=2].title".to_string(), "books[size=2].year".to_string()];
        let plan = build_plan(&reg, "Author", Some(&projection)).unwrap();
        assert_eq!(plan.levels[0].len(), 1);
        assert!(plan.levels[0][0].schema.by_dto_field("title").is_some());
        assert!(plan.levels[0][0].schema.by_dto_field("year").is_some());
    }

    #[test]
    fn unresolvable_path_is_a_projection_definition_error() {
        let reg = author_books_registry();
        let projection = vec!["nope".to_string()];
        assert!(build_plan(&reg, "Author", Some(&projection)).is_err());
    }

    #[test]
    fn computed_field_aggregate_dependency_gets_sql_ignore_slot() {
        let mut entries = HashMap::new();
        entries.insert(
            "Department".to_string(),
            Arc::new(ProjectionMetadata {
                entity_class: "Department".to_string(),
                direct_mappings: vec![
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
                    DirectMapping::scalar("name", "name", "String"),
                    DirectMapping::collection("departments", "departments", "Department"),
                ],
                computed_fields: vec![ComputedFieldMeta {
                    dto_field: "totalBudgetInfo".to_string(),
                    dependencies: vec!["departments.budget".to_string()],
                    reducers: vec![ReducerBinding { dependency_index: 0, reducer: Reducer::Sum }],
                    provider_class: "CompanyBudgetProvider".to_string(),
                    method_name: "totalBudgetInfo".to_string(),
                }],
                id_fields: vec!["id".to_string()],
            }),
        );
        let reg = FixtureRegistry { entries: Mutex::new(entries) };

        let projection = vec!["id".to_string(), "name".to_string(), "totalBudgetInfo".to_string()];
        let plan = build_plan(&reg, "Company", Some(&projection)).unwrap();
        assert!(plan.levels.is_empty());
        let dep_slot = plan.root_schema.by_dto_field("departments__budget").unwrap();
        assert_eq!(dep_slot.status, SlotStatus::SqlIgnore);
        let out_slot = plan.root_schema.by_dto_field("totalBudgetInfo").unwrap();
        assert_eq!(out_slot.status, SlotStatus::SqlIgnore);
        assert_eq!(plan.root_computed_fields.len(), 1);
        assert_eq!(plan.root_computed_fields[0].dependency_aliases, vec!["departments__budget"]);
    }
}
