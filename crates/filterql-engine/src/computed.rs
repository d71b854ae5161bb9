//! Computed-field evaluator (component C11, spec §4.7 step 5, §9 Open
//! Question).
//!
//! By the time this runs, every dependency value — whether selected
//! directly (`SQL_ONLY`) or through a reducer at query time (`SQL_IGNORE`,
//! §4.6 step 4) — is already materialized in the row. This pass only
//! invokes the provider and decides, at emission time, which dependency
//! slots to drop.

use crate::resolver::InstanceResolver;
use crate::row::RowBuffer;
use filterql_core::Result;
use filterql_projection::{ComputedFieldPlan, FieldSchema, FieldSlot};
use std::collections::HashSet;

/// Resolve every computed field in `computed` against each row in `rows`
/// and write the result into that field's output slot (spec §4.7 step 5:
/// "for each visible computed-output slot, resolve the provider instance,
/// pass the dependency values ... and write the result into the row").
pub fn evaluate<'a>(
    rows: impl IntoIterator<Item = &'a mut RowBuffer>,
    schema: &FieldSchema,
    computed: &[ComputedFieldPlan],
    resolver: &dyn InstanceResolver,
) -> Result<()> {
    if computed.is_empty() {
        return Ok(());
    }

    for row in rows {
        for plan in computed {
            let dependency_values = plan
                .dependency_aliases
                .iter()
                .map(|alias| {
                    schema
                        .index_by_dto_field(alias)
                        .map(|idx| row.get(idx).clone())
                        .unwrap_or(filterql_core::Value::Null)
                })
                .collect::<Vec<_>>();

            let provider = resolver.resolve(&plan.meta.provider_class)?;
            let value = provider.compute(&plan.meta.method_name, &dependency_values)?;

            if let Some(idx) = schema.index_by_dto_field(&plan.output_alias) {
                row.set(idx, value);
            }
        }
    }
    Ok(())
}

/// The final set of slots that make it into the emitted row (spec §4.7 step
/// 6, §9 Open Question).
///
/// Starts from `FieldSchema::visible()` (`SQL`/`SQL_IGNORE`) and drops any
/// slot that is *purely* a computed-field dependency — i.e. its DTO alias
/// appears in some `ComputedFieldPlan::dependency_aliases` — unless that
/// same alias was also directly requested in the projection (§9: "a
/// dependency slot is removed iff it was added purely to satisfy a computed
/// field AND is not referenced by any DTO alias in the visible
/// projection"). Computed *output* aliases are never dependency aliases of
/// their own field, so they always pass through untouched.
pub fn emit_slots<'a>(schema: &'a FieldSchema, computed: &[ComputedFieldPlan], directly_projected: &HashSet<String>) -> Vec<(usize, &'a FieldSlot)> {
    let dependency_aliases: HashSet<&str> = computed
        .iter()
        .flat_map(|plan| plan.dependency_aliases.iter().map(String::as_str))
        .collect();

    schema
        .visible()
        .filter(|(_, slot)| !dependency_aliases.contains(slot.dto_alias.as_str()) || directly_projected.contains(&slot.dto_alias))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ComputedFieldProvider, NoBeanResolver};
    use filterql_core::Value;
    use filterql_projection::metadata::{ComputedFieldMeta, Reducer, ReducerBinding};
    use filterql_projection::SlotStatus;
    use std::sync::Arc;

    struct Sum;
    impl ComputedFieldProvider for Sum {
        fn compute(&self, _method_name: &str, dependency_values: &[Value]) -> Result<Value> {
            Ok(dependency_values.first().cloned().unwrap_or(Value::Null))
        }
    }

    fn company_schema() -> (FieldSchema, Vec<ComputedFieldPlan>) {
        let mut schema = FieldSchema::default();
        schema.push("id", "id", SlotStatus::Sql);
        schema.push("name", "name", SlotStatus::Sql);
        schema.push("departments.budget", "departments__budget", SlotStatus::SqlIgnore);
        schema.push("__computed__totalBudgetInfo", "totalBudgetInfo", SlotStatus::SqlIgnore);

        let plans = vec![ComputedFieldPlan {
            meta: ComputedFieldMeta {
                dto_field: "totalBudgetInfo".to_string(),
                dependencies: vec!["departments.budget".to_string()],
                reducers: vec![ReducerBinding { dependency_index: 0, reducer: Reducer::Sum }],
                provider_class: "Sum".to_string(),
                method_name: "totalBudgetInfo".to_string(),
            },
            dependency_aliases: vec!["departments__budget".to_string()],
            output_alias: "totalBudgetInfo".to_string(),
        }];
        (schema, plans)
    }

    #[test]
    fn aggregate_dependency_is_dropped_unless_directly_projected() {
        let (schema, plans) = company_schema();
        let mut rows = vec![RowBuffer::new(schema.len())];
        rows[0].set(schema.index_by_dto_field("departments__budget").unwrap(), Value::Int(300_000));

        let resolver = NoBeanResolver::new().register("Sum", || Arc::new(Sum));
        evaluate(&mut rows, &schema, &plans, &resolver).unwrap();
        assert_eq!(*rows[0].get(schema.index_by_dto_field("totalBudgetInfo").unwrap()), Value::Int(300_000));

        let visible = emit_slots(&schema, &plans, &HashSet::new());
        let aliases: Vec<&str> = visible.iter().map(|(_, s)| s.dto_alias.as_str()).collect();
        assert!(aliases.contains(&"totalBudgetInfo"));
        assert!(!aliases.contains(&"departments__budget"));
    }

    #[test]
    fn directly_projected_dependency_survives_emission() {
        let (schema, plans) = company_schema();
        let mut directly_projected = HashSet::new();
        directly_projected.insert("departments__budget".to_string());

        let visible = emit_slots(&schema, &plans, &directly_projected);
        let aliases: Vec<&str> = visible.iter().map(|(_, s)| s.dto_alias.as_str()).collect();
        assert!(aliases.contains(&"departments__budget"));
    }
}
