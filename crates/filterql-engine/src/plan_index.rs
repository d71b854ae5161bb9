//! Flattens an `ExecutionPlan` tree into path-keyed lookup tables so the
//! engine (C10) and the response renderer (§6.4) can address any node —
//! root or nested collection — without re-walking the tree on every access.

use filterql_projection::{CollectionNode, ComputedFieldPlan, ExecutionPlan, FieldSchema};
use std::collections::{HashMap, HashSet};

/// One node's worth of plan data, addressed by its path (the chain of
/// collection DTO field names from the root; empty for the root itself).
pub struct PlanIndex<'p> {
    pub schema_by_path: HashMap<Vec<String>, &'p FieldSchema>,
    pub computed_by_path: HashMap<Vec<String>, &'p [ComputedFieldPlan]>,
    pub directly_projected_by_path: HashMap<Vec<String>, &'p HashSet<String>>,
    pub id_fields_by_path: HashMap<Vec<String>, &'p [String]>,
    pub node_by_path: HashMap<Vec<String>, &'p CollectionNode>,
    /// Every node path grouped by depth, in the same order as
    /// `ExecutionPlan::levels` — used to drive the engine's level-by-level
    /// fetch loop without re-deriving it from `node_by_path`.
    pub levels: &'p [Vec<CollectionNode>],
}

impl<'p> PlanIndex<'p> {
    pub fn build(plan: &'p ExecutionPlan) -> Self {
        let mut schema_by_path = HashMap::new();
        let mut computed_by_path = HashMap::new();
        let mut directly_projected_by_path = HashMap::new();
        let mut id_fields_by_path = HashMap::new();
        let mut node_by_path = HashMap::new();

        schema_by_path.insert(Vec::new(), &plan.root_schema);
        computed_by_path.insert(Vec::new(), plan.root_computed_fields.as_slice());
        directly_projected_by_path.insert(Vec::new(), &plan.root_directly_projected);
        id_fields_by_path.insert(Vec::new(), plan.root_id_fields.as_slice());

        for level in &plan.levels {
            for node in level {
                let mut path = node.parent_path.clone();
                path.push(node.dto_field.clone());
                schema_by_path.insert(path.clone(), &node.schema);
                computed_by_path.insert(path.clone(), node.computed_fields.as_slice());
                directly_projected_by_path.insert(path.clone(), &node.directly_projected);
                id_fields_by_path.insert(path.clone(), node.id_fields.as_slice());
                node_by_path.insert(path, node);
            }
        }

        Self {
            schema_by_path,
            computed_by_path,
            directly_projected_by_path,
            id_fields_by_path,
            node_by_path,
            levels: &plan.levels,
        }
    }
}
