//! The operator taxonomy (spec §3 `Op`, component C1).
//!
//! `Op` is a closed sum type plus a `Custom` escape hatch, per §9's design
//! note "avoid string-typed ops in the internal representation after
//! parsing" — the DSL and projection layers work with `&str` operator
//! codes only at the edge; everything past the parser carries `Op`.

use serde::{Deserialize, Serialize};

/// A filter operator.
///
/// Variants map 1:1 onto the codes recognized by spec §3: `EQ NE GT GTE LT
/// LTE MATCHES NOT_MATCHES IN NOT_IN RANGE NOT_RANGE IS_NULL NOT_NULL`, plus
/// `Custom` for operators registered at runtime (C7).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Matches,
    NotMatches,
    In,
    NotIn,
    Range,
    NotRange,
    IsNull,
    NotNull,
    /// An operator not in the closed set, resolved through the operator
    /// registry (C7). Carries the upper-cased registry key.
    Custom(String),
}

/// Static metadata about an `Op` variant (spec §3 `Op`: code/symbol/arity).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpMeta {
    pub code: &'static str,
    pub symbol: Option<&'static str>,
    pub requires_value: bool,
    pub supports_multiple_values: bool,
}

impl Op {
    /// Parse a canonical code (case-insensitive) into an `Op`.
    ///
    /// Unknown codes become `Op::Custom(code.to_uppercase())` rather than an
    /// error — whether a custom code is actually registered is checked later,
    /// by the operator registry (C7), not here.
    pub fn parse(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "EQ" => Op::Eq,
            "NE" => Op::Ne,
            "GT" => Op::Gt,
            "GTE" => Op::Gte,
            "LT" => Op::Lt,
            "LTE" => Op::Lte,
            "MATCHES" => Op::Matches,
            "NOT_MATCHES" => Op::NotMatches,
            "IN" => Op::In,
            "NOT_IN" => Op::NotIn,
            "RANGE" => Op::Range,
            "NOT_RANGE" => Op::NotRange,
            "IS_NULL" => Op::IsNull,
            "NOT_NULL" => Op::NotNull,
            other => Op::Custom(other.to_string()),
        }
    }

    /// Canonical string code, as emitted in error messages and DSL atoms.
    pub fn code(&self) -> &str {
        match self {
            Op::Eq => "EQ",
            Op::Ne => "NE",
            Op::Gt => "GT",
            Op::Gte => "GTE",
            Op::Lt => "LT",
            Op::Lte => "LTE",
            Op::Matches => "MATCHES",
            Op::NotMatches => "NOT_MATCHES",
            Op::In => "IN",
            Op::NotIn => "NOT_IN",
            Op::Range => "RANGE",
            Op::NotRange => "NOT_RANGE",
            Op::IsNull => "IS_NULL",
            Op::NotNull => "NOT_NULL",
            Op::Custom(code) => code,
        }
    }

    /// Whether this operator is the closed-enum `Custom` escape hatch.
    pub fn is_custom(&self) -> bool {
        matches!(self, Op::Custom(_))
    }

    /// Whether this operator is a null-check (`IS_NULL`/`NOT_NULL`) — the
    /// only ops that never read a value (§3, §4.1).
    pub fn is_null_check(&self) -> bool {
        matches!(self, Op::IsNull | Op::NotNull)
    }

    /// Static arity/value-shape metadata for the built-in operators.
    /// Returns `None` for `Custom` — arity is deferred to the registry.
    pub fn meta(&self) -> Option<OpMeta> {
        let (code, symbol, requires_value, supports_multi) = match self {
            Op::Eq => ("EQ", Some("="), true, false),
            Op::Ne => ("NE", Some("!="), true, false),
            Op::Gt => ("GT", Some(">"), true, false),
            Op::Gte => ("GTE", Some(">="), true, false),
            Op::Lt => ("LT", Some("<"), true, false),
            Op::Lte => ("LTE", Some("<="), true, false),
            Op::Matches => ("MATCHES", Some("~"), true, false),
            Op::NotMatches => ("NOT_MATCHES", Some("!~"), true, false),
            Op::In => ("IN", None, true, true),
            Op::NotIn => ("NOT_IN", None, true, true),
            Op::Range => ("RANGE", None, true, true),
            Op::NotRange => ("NOT_RANGE", None, true, true),
            Op::IsNull => ("IS_NULL", None, false, false),
            Op::NotNull => ("NOT_NULL", None, false, false),
            Op::Custom(_) => return None,
        };
        Some(OpMeta {
            code,
            symbol,
            requires_value,
            supports_multiple_values: supports_multi,
        })
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_codes_case_insensitively() {
        assert_eq!(Op::parse("eq"), Op::Eq);
        assert_eq!(Op::parse("Range"), Op::Range);
        assert_eq!(Op::parse("NOT_NULL"), Op::NotNull);
    }

    #[test]
    fn unknown_code_becomes_custom() {
        assert_eq!(Op::parse("soundex"), Op::Custom("SOUNDEX".to_string()));
        assert!(Op::Custom("SOUNDEX".to_string()).is_custom());
    }

    #[test]
    fn null_check_ops_never_require_a_value() {
        assert!(!Op::IsNull.meta().unwrap().requires_value);
        assert!(!Op::NotNull.meta().unwrap().requires_value);
        assert!(Op::Eq.meta().unwrap().requires_value);
    }
}
