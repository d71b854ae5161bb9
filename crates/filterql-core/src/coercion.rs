//! Value→target-type coercion (component C2, spec §4.1).
//!
//! Coercion always runs before validation (C3): a string `"30"` destined for
//! an `Integer` property is parsed here first, so validation only ever sees
//! values already in their target shape.

use crate::config::{EnumMatching, FilterConfig, StringNormalization};
use crate::error::{Error, Result};
use crate::property::ValueType;
use crate::value::Value;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Coerce `value` toward `target`, applying `config`'s enum/string rules.
/// Collections are coerced element-wise, recursing into `target`'s element
/// type if present, or the scalar `target` itself otherwise (so `IN`/`RANGE`
/// against a scalar property type coerce each element the same way).
pub fn coerce(value: &Value, target: &ValueType, config: &FilterConfig) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    if let Value::List(items) = value {
        let element_target = match target {
            ValueType::Collection(inner) => inner.as_ref(),
            other => other,
        };
        let coerced: Result<Vec<Value>> =
            items.iter().map(|v| coerce(v, element_target, config)).collect();
        return Ok(Value::List(coerced?));
    }

    match target {
        ValueType::Collection(inner) => {
            // A bare scalar against a collection-typed property: treat a
            // comma-separated string as the collection-input recognition
            // §4.1 calls out, otherwise wrap the single coerced element.
            if let Value::Str(s) = value {
                if s.contains(',') {
                    let parts: Result<Vec<Value>> = s
                        .split(',')
                        .map(|p| coerce(&Value::Str(p.trim().to_string()), inner, config))
                        .collect();
                    return Ok(Value::List(parts?));
                }
            }
            Ok(Value::List(vec![coerce(value, inner, config)?]))
        }
        ValueType::String => Ok(Value::Str(normalize_string(&to_display_string(value), config))),
        ValueType::Integer => coerce_integer(value),
        ValueType::Float => coerce_float(value),
        ValueType::Boolean => coerce_boolean(value),
        ValueType::Uuid => coerce_uuid(value),
        ValueType::DateTime => coerce_datetime(value),
        ValueType::Enum {
            variants,
            case_insensitive,
        } => coerce_enum(value, variants, *case_insensitive, config),
    }
}

fn to_display_string(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize_string(s: &str, config: &FilterConfig) -> String {
    match config.string_normalization {
        StringNormalization::None => s.to_string(),
        StringNormalization::Trim => s.trim().to_string(),
        StringNormalization::Lower => s.to_lowercase(),
        StringNormalization::Upper => s.to_uppercase(),
    }
}

fn coerce_integer(value: &Value) -> Result<Value> {
    match value {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) if f.fract() == 0.0 => Ok(Value::Int(*f as i64)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::filter_validation(format!("cannot coerce '{s}' to integer"))),
        Value::Bool(b) => Ok(Value::Int(if *b { 1 } else { 0 })),
        other => Err(Error::filter_validation(format!(
            "cannot coerce {other} to integer"
        ))),
    }
}

fn coerce_float(value: &Value) -> Result<Value> {
    match value {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::filter_validation(format!("cannot coerce '{s}' to float"))),
        other => Err(Error::filter_validation(format!(
            "cannot coerce {other} to float"
        ))),
    }
}

fn coerce_boolean(value: &Value) -> Result<Value> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Int(i) => Ok(Value::Bool(*i != 0)),
        Value::Float(f) => Ok(Value::Bool(*f != 0.0)),
        Value::Str(s) => {
            let lowered = s.trim().to_ascii_lowercase();
            match lowered.as_str() {
                "true" | "1" | "yes" | "oui" | "y" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "non" | "n" => Ok(Value::Bool(false)),
                _ => Err(Error::filter_validation(format!(
                    "cannot coerce '{s}' to boolean"
                ))),
            }
        }
        other => Err(Error::filter_validation(format!(
            "cannot coerce {other} to boolean"
        ))),
    }
}

fn coerce_uuid(value: &Value) -> Result<Value> {
    match value {
        Value::Uuid(u) => Ok(Value::Uuid(*u)),
        Value::Str(s) => Uuid::parse_str(s.trim())
            .map(Value::Uuid)
            .map_err(|_| Error::filter_validation(format!("cannot coerce '{s}' to uuid"))),
        other => Err(Error::filter_validation(format!(
            "cannot coerce {other} to uuid"
        ))),
    }
}

/// ISO-8601 strings, epoch millis, or an already-coerced `DateTime` (§4.1
/// "cross-type conversions via system zone" — the system zone is only
/// relevant for naive-local inputs, which this CORE does not accept; every
/// accepted representation is already zone-aware or zone-free epoch millis).
fn coerce_datetime(value: &Value) -> Result<Value> {
    match value {
        Value::DateTime(dt) => Ok(Value::DateTime(*dt)),
        Value::Int(millis) => Utc
            .timestamp_millis_opt(*millis)
            .single()
            .map(Value::DateTime)
            .ok_or_else(|| Error::filter_validation(format!("epoch millis {millis} out of range"))),
        Value::Str(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| Value::DateTime(dt.with_timezone(&Utc)))
            .map_err(|_| Error::filter_validation(format!("cannot coerce '{s}' to datetime"))),
        other => Err(Error::filter_validation(format!(
            "cannot coerce {other} to datetime"
        ))),
    }
}

fn coerce_enum(
    value: &Value,
    variants: &[String],
    case_insensitive: bool,
    config: &FilterConfig,
) -> Result<Value> {
    let raw = to_display_string(value);
    if variants.iter().any(|v| v == &raw) {
        return Ok(Value::Str(raw));
    }
    if case_insensitive || config.enum_matching == EnumMatching::CaseInsensitive {
        if let Some(matched) = variants.iter().find(|v| v.eq_ignore_ascii_case(&raw)) {
            return Ok(Value::Str(matched.clone()));
        }
    }
    Err(Error::filter_validation(format!(
        "'{raw}' is not a member of enum {{{}}}",
        variants.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> FilterConfig {
        FilterConfig::default()
    }

    #[test]
    fn coerces_numeric_strings() {
        let v = coerce(&Value::Str("42".into()), &ValueType::Integer, &cfg()).unwrap();
        assert_eq!(v, Value::Int(42));
    }

    #[test]
    fn coerces_boolean_word_forms() {
        for word in ["true", "1", "yes", "oui", "y", "TRUE"] {
            let v = coerce(&Value::Str(word.into()), &ValueType::Boolean, &cfg()).unwrap();
            assert_eq!(v, Value::Bool(true));
        }
    }

    #[test]
    fn coerces_comma_separated_string_to_collection() {
        let target = ValueType::Collection(Box::new(ValueType::Integer));
        let v = coerce(&Value::Str("1,2,3".into()), &target, &cfg()).unwrap();
        assert_eq!(v, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn enum_case_insensitive_fallback() {
        let variants = vec!["Active".to_string(), "Inactive".to_string()];
        let target = ValueType::Enum {
            variants,
            case_insensitive: true,
        };
        let v = coerce(&Value::Str("active".into()), &target, &cfg()).unwrap();
        assert_eq!(v, Value::Str("Active".into()));
    }

    #[test]
    fn enum_exact_mode_rejects_case_mismatch() {
        let variants = vec!["Active".to_string()];
        let target = ValueType::Enum {
            variants,
            case_insensitive: false,
        };
        assert!(coerce(&Value::Str("active".into()), &target, &cfg()).is_err());
    }

    #[test]
    fn null_passes_through_untouched() {
        assert_eq!(coerce(&Value::Null, &ValueType::Integer, &cfg()).unwrap(), Value::Null);
    }
}
