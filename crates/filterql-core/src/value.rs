//! Runtime filter values (component C2's input/output type).
//!
//! `Value` is the coercion target/source used by §4.1's type table. It is
//! deliberately smaller than `serde_json::Value` — no nested objects — since
//! filter values are always scalars or flat collections of scalars.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A coerced filter value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    List(Vec<Value>),
}

// `Value` needs to be usable as a `CompositeKey` component (spec §4.8:
// "value-based equality/hash"), so `Eq`/`Hash` are implemented by hand —
// `f64` has neither, so floats hash/compare on their bit pattern. Filter
// values that reach identity comparisons are practically always integers,
// strings, or UUIDs; this only has to be internally consistent, not IEEE-754
// correct for NaN.
impl Eq for Value {}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::Uuid(u) => u.hash(state),
            Value::DateTime(dt) => dt.hash(state),
            Value::List(items) => items.hash(state),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// View this value as a homogeneous element sequence: a `List` yields its
    /// elements, any other non-null value yields a single-element slice view,
    /// `Null` yields an empty sequence. Used by §4.1's arity rules, which
    /// treat "scalar or collection" uniformly.
    pub fn as_elements(&self) -> Vec<&Value> {
        match self {
            Value::Null => vec![],
            Value::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    pub fn element_count(&self) -> usize {
        self.as_elements().len()
    }

    /// Construct from a `serde_json::Value` as received over the §6.4 JSON
    /// boundary, without coercion (coercion happens later, per §4.1, once
    /// the target `ValueType` is known).
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            // Nested objects have no meaning as a filter value; treated as
            // opaque strings rather than rejected outright, so validation
            // (C3) is the single place that reports the mismatch.
            serde_json::Value::Object(_) => Value::Str(value.to_string()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}
