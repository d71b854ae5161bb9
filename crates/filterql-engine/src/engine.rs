//! Multi-query batch fetch engine (component C10, spec §4.7).
//!
//! Grounded on `postrust_core::plan::mod::create_action_plan`/`create_db_plan`
//! (the "walk a plan tree, dispatch per node kind" control flow): fetch the
//! root rows, then for each `CollectionLevel` collect the parent ids reachable
//! so far, partition them into bounded batches, and issue one child query per
//! batch with an `id IN (...)` (or composite OR-of-AND) predicate instead of a
//! per-row n+1 fetch. This is a deliberate departure from the teacher's own
//! single-query-with-JOINs execution model — the plan-tree-walk shape is
//! kept, only the leaf execution strategy changes to the batch-fetch model
//! §4.7 specifies. §4.8's composite identity and §9's cooperative
//! cancellation are threaded through the same loop.

use crate::composite::{partition_batches, CompositeKey, IdPredicateBuilder, MAX_PARENT_BATCH};
use crate::path::nested_path;
use crate::plan_index::PlanIndex;
use crate::row::{collect_parents_mut, RowBuffer};
use crate::{computed, resolver::InstanceResolver};
use filterql_condition::{to_resolver, Condition, QueryExecutionParams};
use filterql_core::query_builder::{CriteriaBuilder, OrderExpr, Path, Query, QueryBuilderFactory, Tuple, UNBOUNDED};
use filterql_core::{CancellationToken, Error, FilterConfig, Pagination, Result, SortDirection, Value};
use filterql_projection::{CollectionNode, ComputedFieldPlan, ExecutionPlan, FieldSchema};
use std::collections::{HashMap, HashSet};

/// Runs the fetch algorithm against one live backend (§6.2 `QueryBuilderFactory`)
/// and one computed-field `InstanceResolver` (§6.3).
pub struct Engine<'a> {
    factory: &'a dyn QueryBuilderFactory,
    resolver: &'a dyn InstanceResolver,
    config: &'a FilterConfig,
}

impl<'a> Engine<'a> {
    pub fn new(factory: &'a dyn QueryBuilderFactory, resolver: &'a dyn InstanceResolver, config: &'a FilterConfig) -> Self {
        Self { factory, resolver, config }
    }

    /// Fetch `plan`'s full row tree for the given root condition and
    /// pagination (spec §4.7 steps 1-5). Returns materialized `RowBuffer`s;
    /// call [`crate::render::render_rows`] to shape them into JSON.
    pub fn execute(
        &self,
        plan: &ExecutionPlan,
        condition: Option<&Condition>,
        params: &QueryExecutionParams,
        pagination: &Pagination,
        cancellation: &CancellationToken,
    ) -> Result<Vec<RowBuffer>> {
        cancellation.check()?;
        let index = PlanIndex::build(plan);
        let builder = self.factory.criteria_builder();

        let mut root_query = self.factory.create_tuple_query(&plan.root_entity);
        let root = root_query.root();

        let predicate = match condition {
            Some(cond) => {
                let resolved = to_resolver(cond, params, self.config)?;
                resolved(root.as_ref(), builder)
            }
            None => builder.conjunction(),
        };
        root_query.where_clause(predicate);
        root_query.multi_select(build_select(root.as_ref(), builder, &plan.root_schema, &plan.root_computed_fields));
        root_query.order_by(order_exprs(root.as_ref(), &pagination.sort));

        let tuples = root_query.execute(pagination.offset, pagination.size)?;
        let mut root_rows: Vec<RowBuffer> = materialize_rows(tuples, &plan.root_schema, &plan.root_computed_fields, &[])
            .into_iter()
            .map(|(_, row)| row)
            .collect();

        for level in &plan.levels {
            cancellation.check()?;
            for node in level {
                let parent_schema = *index
                    .schema_by_path
                    .get(&node.parent_path)
                    .ok_or_else(|| Error::Internal(format!("no schema indexed for path {:?}", node.parent_path)))?;
                let parent_id_fields = *index
                    .id_fields_by_path
                    .get(&node.parent_path)
                    .ok_or_else(|| Error::Internal(format!("no id fields indexed for path {:?}", node.parent_path)))?;

                let mut parent_rows = collect_parents_mut(&mut root_rows, &node.parent_path);
                fetch_level(self.factory, node, parent_schema, parent_id_fields, &mut parent_rows, cancellation)?;
            }
        }

        computed::evaluate(root_rows.iter_mut(), &plan.root_schema, &plan.root_computed_fields, self.resolver)?;
        for level in &plan.levels {
            for node in level {
                if node.computed_fields.is_empty() {
                    continue;
                }
                let mut path = node.parent_path.clone();
                path.push(node.dto_field.clone());
                let rows = collect_parents_mut(&mut root_rows, &path);
                computed::evaluate(rows, &node.schema, &node.computed_fields, self.resolver)?;
            }
        }

        Ok(root_rows)
    }

    /// Convenience wrapper combining [`Engine::execute`] with
    /// [`crate::render::render_rows`] — what a host actually calls end to
    /// end (spec §4.7 step 6 / §6.4).
    pub fn execute_and_render(
        &self,
        plan: &ExecutionPlan,
        condition: Option<&Condition>,
        params: &QueryExecutionParams,
        pagination: &Pagination,
        cancellation: &CancellationToken,
    ) -> Result<Vec<serde_json::Value>> {
        let rows = self.execute(plan, condition, params, pagination, cancellation)?;
        let index = PlanIndex::build(plan);
        Ok(crate::render::render_rows(&rows, &index))
    }
}

/// Fetch and attach one `CollectionNode`'s children for every row currently
/// reachable as a parent (spec §4.7 step 4).
fn fetch_level(
    factory: &dyn QueryBuilderFactory,
    node: &CollectionNode,
    parent_schema: &FieldSchema,
    parent_id_fields: &[String],
    parent_rows: &mut [&mut RowBuffer],
    cancellation: &CancellationToken,
) -> Result<()> {
    if parent_rows.is_empty() {
        return Ok(());
    }
    let builder = factory.criteria_builder();

    let mut ids = Vec::with_capacity(parent_rows.len());
    let mut by_key: HashMap<CompositeKey, usize> = HashMap::with_capacity(parent_rows.len());
    for (i, row) in parent_rows.iter().enumerate() {
        let key = extract_key(parent_schema, row, parent_id_fields);
        ids.push(key.clone());
        by_key.insert(key, i);
    }

    // A parent reached through a single-field id navigates the association
    // directly (`node.parentReferenceField`); a composite parent id instead
    // navigates through the association to each of the parent's own id
    // fields (`"<parentReferenceField>.<idField>"`, spec §4.8).
    let key_paths: Vec<String> = if parent_id_fields.len() <= 1 {
        vec![node.parent_reference_field.clone()]
    } else {
        parent_id_fields
            .iter()
            .map(|field| format!("{}.{field}", node.parent_reference_field))
            .collect()
    };
    let key_aliases: Vec<String> = (0..key_paths.len()).map(|i| format!("__parent_key_{i}__")).collect();

    let mut children_by_parent: HashMap<CompositeKey, Vec<RowBuffer>> = HashMap::new();

    for batch in partition_batches(&ids, MAX_PARENT_BATCH) {
        cancellation.check()?;

        let mut child_query = factory.create_tuple_query(&node.element_type);
        let child_root = child_query.root();

        let predicate = IdPredicateBuilder::build(child_root.as_ref(), builder, &key_paths, &batch);
        child_query.where_clause(predicate);

        let mut aliases: Vec<(String, Box<dyn Path>)> = key_paths
            .iter()
            .zip(key_aliases.iter())
            .map(|(path, alias)| (alias.clone(), nested_path(child_root.as_ref(), path)))
            .collect();
        aliases.extend(build_select(child_root.as_ref(), builder, &node.schema, &node.computed_fields));
        child_query.multi_select(aliases);
        child_query.order_by(order_exprs(child_root.as_ref(), &node.sort_fields));

        // Pagination is applied per parent, in memory, below — not at the
        // SQL level, since one batch query spans every parent in the batch.
        let tuples = child_query.execute(0, UNBOUNDED)?;
        for (key, row) in materialize_rows(tuples, &node.schema, &node.computed_fields, &key_aliases) {
            children_by_parent.entry(key).or_default().push(row);
        }
    }

    for (key, mut children) in children_by_parent {
        let Some(&i) = by_key.get(&key) else { continue };
        let start = (node.options.page as usize).saturating_mul(node.options.size as usize);
        let end = start.saturating_add(node.options.size as usize);
        let page = if start < children.len() {
            children.drain(start..end.min(children.len())).collect()
        } else {
            Vec::new()
        };
        parent_rows[i].collections.insert(node.dto_field.clone(), page);
    }

    // Every declared collection slot starts empty, even for parents with no
    // matching children (spec §4.7 step 3).
    for row in parent_rows.iter_mut() {
        row.collections.entry(node.dto_field.clone()).or_insert_with(Vec::new);
    }
    Ok(())
}

fn extract_key(schema: &FieldSchema, row: &RowBuffer, id_fields: &[String]) -> CompositeKey {
    CompositeKey(
        id_fields
            .iter()
            .map(|field| {
                schema
                    .index_by_entity_field(field)
                    .map(|idx| row.get(idx).clone())
                    .unwrap_or(Value::Null)
            })
            .collect(),
    )
}

fn order_exprs(root: &dyn Path, sort: &[filterql_core::SortBy]) -> Vec<OrderExpr> {
    sort.iter()
        .map(|s| OrderExpr {
            path: nested_path(root, &s.field),
            ascending: s.direction == SortDirection::Asc,
        })
        .collect()
}

/// The `multiSelect` list for one node: every plain `SQL`/`SQL_ONLY` column,
/// plus one reducer expression per distinct aggregate computed-field
/// dependency (spec §4.6 step 4, §4.7 step 2).
fn build_select(
    root: &dyn Path,
    builder: &dyn CriteriaBuilder,
    schema: &FieldSchema,
    computed: &[ComputedFieldPlan],
) -> Vec<(String, Box<dyn Path>)> {
    let mut aliases: Vec<(String, Box<dyn Path>)> = schema
        .selectable()
        .map(|(_, slot)| (slot.dto_alias.clone(), nested_path(root, &slot.entity_field)))
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    for plan in computed {
        for (i, dep_alias) in plan.dependency_aliases.iter().enumerate() {
            if !plan.meta.is_aggregate_dependency(i) || !seen.insert(dep_alias.clone()) {
                continue;
            }
            let Some(binding) = plan.meta.reducers.iter().find(|r| r.dependency_index == i) else { continue };
            let base = nested_path(root, &plan.meta.dependencies[i]);
            aliases.push((dep_alias.clone(), apply_reducer(builder, binding.reducer, base.as_ref())));
        }
    }
    aliases
}

fn apply_reducer(builder: &dyn CriteriaBuilder, reducer: filterql_projection::Reducer, path: &dyn Path) -> Box<dyn Path> {
    use filterql_projection::Reducer;
    match reducer {
        Reducer::Sum => builder.sum(path),
        Reducer::Avg => builder.avg(path),
        Reducer::Min => builder.min(path),
        Reducer::Max => builder.max(path),
        Reducer::Count => builder.count(path),
        Reducer::CountDistinct => builder.count_distinct(path),
    }
}

/// Turn a batch of `Tuple`s into `RowBuffer`s, reading `key_aliases` off
/// each tuple first (if any) to recover the parent-grouping key a batched
/// child query attached under `"__parent_key_N__"` aliases.
fn materialize_rows(
    tuples: Vec<Box<dyn Tuple>>,
    schema: &FieldSchema,
    computed: &[ComputedFieldPlan],
    key_aliases: &[String],
) -> Vec<(CompositeKey, RowBuffer)> {
    tuples
        .into_iter()
        .map(|tuple| {
            let key = CompositeKey(key_aliases.iter().map(|alias| tuple.get(alias).unwrap_or(Value::Null)).collect());

            let mut row = RowBuffer::new(schema.len());
            for (idx, slot) in schema.selectable() {
                if let Some(value) = tuple.get(&slot.dto_alias) {
                    row.set(idx, value);
                }
            }
            for plan in computed {
                for (i, dep_alias) in plan.dependency_aliases.iter().enumerate() {
                    if !plan.meta.is_aggregate_dependency(i) {
                        continue;
                    }
                    if let Some(idx) = schema.index_by_dto_field(dep_alias) {
                        if let Some(value) = tuple.get(dep_alias) {
                            row.set(idx, value);
                        }
                    }
                }
            }
            (key, row)
        })
        .collect()
}
