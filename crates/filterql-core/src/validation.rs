//! Operator/value/type compatibility checks (component C3, spec §4.1).
//!
//! Validation always runs against an already-coerced `Value` (C2 runs
//! first) — so every check here is about *shape* (arity, emptiness,
//! element type) rather than parsing.

use crate::config::{FilterConfig, NullValuePolicy};
use crate::error::{Error, Result};
use crate::op::Op;
use crate::property::ValueType;
use crate::value::Value;

/// Outcome of applying §4.1's `nullValuePolicy` to a `null`-valued filter
/// whose operator is not itself a null-check.
pub enum NullPolicyOutcome {
    /// Validate/bind using this (possibly rewritten) operator instead.
    Rewritten(Op),
    /// Drop the filter entirely — it becomes a tautology upstream.
    Ignore,
}

/// Apply `config.null_value_policy` to a `null` value paired with a
/// non-null-check operator. Returns `Ok(None)` unchanged when `value` is not
/// `null`, or when `op` is already a null-check (nothing to rewrite).
pub fn apply_null_policy(
    op: &Op,
    value: &Value,
    config: &FilterConfig,
) -> Result<Option<NullPolicyOutcome>> {
    if !value.is_null() || op.is_null_check() {
        return Ok(None);
    }
    match config.null_value_policy {
        NullValuePolicy::StrictException => Err(Error::filter_validation(
            "null value requires a null-check operator under STRICT_EXCEPTION policy",
        )),
        NullValuePolicy::IgnoreFilter => Ok(Some(NullPolicyOutcome::Ignore)),
        NullValuePolicy::CoerceToIsNull => match op {
            Op::Eq => Ok(Some(NullPolicyOutcome::Rewritten(Op::IsNull))),
            Op::Ne => Ok(Some(NullPolicyOutcome::Rewritten(Op::NotNull))),
            other => Err(Error::filter_validation(format!(
                "null value with operator {other} cannot be coerced to a null-check under COERCE_TO_IS_NULL"
            ))),
        },
    }
}

/// Validate `value` (already coerced toward `target`) against `op`'s arity
/// rules (spec §4.1 table). `Op::Custom` is always `Ok` here — compatibility
/// for custom operators is the registry's (C7) responsibility.
pub fn validate(op: &Op, value: &Value, target: &ValueType) -> Result<()> {
    match op {
        Op::IsNull | Op::NotNull => Ok(()),
        Op::Custom(_) => Ok(()),
        Op::Eq | Op::Ne | Op::Gt | Op::Gte | Op::Lt | Op::Lte | Op::Matches | Op::NotMatches => {
            let elements = value.as_elements();
            if elements.is_empty() {
                return Err(Error::filter_validation(format!(
                    "{op} requires a non-empty value"
                )));
            }
            check_elements_assignable(op, &elements, target)
        }
        Op::In | Op::NotIn => {
            let elements = value.as_elements();
            if elements.is_empty() {
                return Err(Error::filter_validation(format!(
                    "{op} requires at least one value"
                )));
            }
            check_elements_assignable(op, &elements, target)
        }
        Op::Range | Op::NotRange => {
            let elements = value.as_elements();
            if elements.len() != 2 {
                return Err(Error::filter_validation(format!(
                    "{op} requires exactly two elements, got {}",
                    elements.len()
                )));
            }
            check_elements_assignable(op, &elements, target)
        }
    }
}

fn check_elements_assignable(op: &Op, elements: &[&Value], target: &ValueType) -> Result<()> {
    for element in elements {
        if !is_assignable(element, target) {
            return Err(Error::filter_validation(format!(
                "value {element} is not assignable to {target:?} for operator {op}"
            )));
        }
    }
    Ok(())
}

/// "Assignable" per §4.1: primitive/wrapper equivalence (a coerced `Value`
/// already carries the wrapper form, so this is mostly a tag match) plus
/// the enum/collection special cases.
fn is_assignable(value: &Value, target: &ValueType) -> bool {
    match target {
        ValueType::String => matches!(value, Value::Str(_)),
        ValueType::Integer => matches!(value, Value::Int(_)),
        ValueType::Float => matches!(value, Value::Float(_) | Value::Int(_)),
        ValueType::Boolean => matches!(value, Value::Bool(_)),
        ValueType::Uuid => matches!(value, Value::Uuid(_)),
        ValueType::DateTime => matches!(value, Value::DateTime(_)),
        ValueType::Enum { .. } => matches!(value, Value::Str(_)),
        ValueType::Collection(inner) => is_assignable(value, inner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_requires_exactly_two_elements() {
        let three = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(validate(&Op::Range, &three, &ValueType::Integer).is_err());

        let two = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert!(validate(&Op::Range, &two, &ValueType::Integer).is_ok());
    }

    #[test]
    fn null_check_ops_accept_any_value() {
        assert!(validate(&Op::IsNull, &Value::Int(1), &ValueType::Integer).is_ok());
        assert!(validate(&Op::NotNull, &Value::Null, &ValueType::Integer).is_ok());
    }

    #[test]
    fn in_accepts_single_scalar_or_collection() {
        assert!(validate(&Op::In, &Value::Int(1), &ValueType::Integer).is_ok());
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert!(validate(&Op::In, &list, &ValueType::Integer).is_ok());
    }

    #[test]
    fn strict_policy_rejects_null_for_non_null_check_op() {
        let cfg = FilterConfig::default();
        let outcome = apply_null_policy(&Op::Eq, &Value::Null, &cfg);
        assert!(outcome.is_err());
    }

    #[test]
    fn coerce_to_is_null_rewrites_eq_and_ne() {
        let mut cfg = FilterConfig::default();
        cfg.null_value_policy = NullValuePolicy::CoerceToIsNull;

        match apply_null_policy(&Op::Eq, &Value::Null, &cfg).unwrap() {
            Some(NullPolicyOutcome::Rewritten(Op::IsNull)) => {}
            _ => panic!("expected rewrite to IS_NULL"),
        }
        match apply_null_policy(&Op::Ne, &Value::Null, &cfg).unwrap() {
            Some(NullPolicyOutcome::Rewritten(Op::NotNull)) => {}
            _ => panic!("expected rewrite to NOT_NULL"),
        }
        assert!(apply_null_policy(&Op::Gt, &Value::Null, &cfg).is_err());
    }
}
