//! `RowBuffer` — a flat indexed record returned by sub-queries (spec §3).
//!
//! Stores one value per schema slot, including internal (query-only) and
//! visible slots, plus nested child collections keyed by their DTO field
//! name. Mutated only during a single execution (C10); thereafter read-only
//! (spec §3 "Lifecycles").

use filterql_core::Value;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct RowBuffer {
    /// One value per `FieldSchema` slot index, in the schema's slot order.
    pub values: Vec<Value>,
    /// Child rows for each collection-valued DTO field attached at this
    /// node, keyed by DTO field name. Always present (possibly empty) for
    /// every collection the execution plan declares at this level, per
    /// spec §4.7 step 3: "Initialize every declared collection slot to an
    /// empty sequence."
    pub collections: HashMap<String, Vec<RowBuffer>>,
}

impl RowBuffer {
    pub fn new(slot_count: usize) -> Self {
        Self {
            values: vec![Value::Null; slot_count],
            collections: HashMap::new(),
        }
    }

    pub fn set(&mut self, idx: usize, value: Value) {
        if idx >= self.values.len() {
            self.values.resize(idx + 1, Value::Null);
        }
        self.values[idx] = value;
    }

    pub fn get(&self, idx: usize) -> &Value {
        self.values.get(idx).unwrap_or(&Value::Null)
    }
}

/// Recursively collect mutable references to every row reachable from
/// `rows` by following `path`'s chain of collection DTO field names — the
/// set of "parent rows" a given `CollectionNode` attaches its next batch of
/// children to (spec §4.7 step 4). An empty `path` means `rows` themselves
/// are the parents.
///
/// Each recursive call borrows a disjoint child `Vec<RowBuffer>` reached
/// through a different row's `collections` map, so there is no aliasing
/// between sibling branches — safe under the borrow checker without any
/// unsafe code or index juggling.
pub fn collect_parents_mut<'a>(rows: &'a mut [RowBuffer], path: &[String]) -> Vec<&'a mut RowBuffer> {
    let Some((head, rest)) = path.split_first() else {
        return rows.iter_mut().collect();
    };

    let mut out = Vec::new();
    for row in rows.iter_mut() {
        if let Some(children) = row.collections.get_mut(head) {
            out.extend(collect_parents_mut(children, rest));
        }
    }
    out
}
