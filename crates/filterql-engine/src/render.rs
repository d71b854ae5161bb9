//! Response shaping (spec §6.4): `RowBuffer` → nested JSON.
//!
//! Dotted DTO aliases (`"address.city"`) insert a nested object
//! (`{address: {city: ...}}`); collection-valued DTO fields become arrays
//! of recursively rendered child rows. Internal (non-emitted) slots are
//! filtered out per the computed-field dependency rule in `computed::emit_slots`.

use crate::computed::emit_slots;
use crate::plan_index::PlanIndex;
use crate::row::RowBuffer;
use filterql_core::Value;
use serde_json::{Map, Value as Json};

pub fn render_rows(rows: &[RowBuffer], index: &PlanIndex) -> Vec<Json> {
    rows.iter().map(|row| render_row(row, &[], index)).collect()
}

fn render_row(row: &RowBuffer, path: &[String], index: &PlanIndex) -> Json {
    let mut map = Map::new();

    if let (Some(schema), Some(computed), Some(directly_projected)) = (
        index.schema_by_path.get(path),
        index.computed_by_path.get(path),
        index.directly_projected_by_path.get(path),
    ) {
        for (idx, slot) in emit_slots(schema, computed, directly_projected) {
            insert_dotted(&mut map, &slot.dto_alias, value_to_json(row.get(idx)));
        }
    }

    for (dto_field, children) in &row.collections {
        let mut child_path = path.to_vec();
        child_path.push(dto_field.clone());
        let rendered: Vec<Json> = children.iter().map(|child| render_row(child, &child_path, index)).collect();
        insert_dotted(&mut map, dto_field, Json::Array(rendered));
    }

    Json::Object(map)
}

/// Insert `value` under `alias`, splitting on `.` to build nested objects —
/// `"address.city"` becomes `{"address": {"city": value}}`, merging into
/// any sibling dotted alias already inserted under the same prefix.
fn insert_dotted(map: &mut Map<String, Json>, alias: &str, value: Json) {
    match alias.split_once('.') {
        None => {
            map.insert(alias.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = map.entry(head.to_string()).or_insert_with(|| Json::Object(Map::new()));
            if let Json::Object(nested) = entry {
                insert_dotted(nested, rest, value);
            }
        }
    }
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::Str(s) => Json::String(s.clone()),
        Value::Uuid(u) => Json::String(u.to_string()),
        Value::DateTime(dt) => Json::String(dt.to_rfc3339()),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
    }
}
