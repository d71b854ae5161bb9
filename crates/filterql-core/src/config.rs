//! Configuration for the CORE (spec §4.1 `FilterConfig`, §4.2 `DslPolicy`).
//!
//! Shaped after the teacher's `AppConfig` — a plain `Default` impl plus a
//! documented override point — but FilterQL has no network surface of its
//! own, so there is no `from_env()` here; hosts build a `FilterConfig`
//! directly and pass it down.

use serde::{Deserialize, Serialize};

/// How `NULL` values sort relative to non-null values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullHandling {
    NullsFirst,
    NullsLast,
    /// Defer to whatever the backend does natively.
    Native,
}

/// Enum-value matching strategy (§4.1 "Enum" coercion rule).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnumMatching {
    Exact,
    CaseInsensitive,
}

/// String normalization applied before comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringNormalization {
    None,
    Trim,
    Lower,
    Upper,
}

/// What happens when a filter's value is `null` (§4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullValuePolicy {
    /// Raise `FilterValidationException` for any op but EQ/NE.
    StrictException,
    /// EQ → IS_NULL, NE → NOT_NULL; any other op still errors.
    CoerceToIsNull,
    /// Silently drop the filter (it becomes a tautology upstream).
    IgnoreFilter,
}

/// Value coercion and validation configuration (spec §4.1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterConfig {
    pub ignore_case: bool,
    pub null_handling: NullHandling,
    pub enum_matching: EnumMatching,
    pub string_normalization: StringNormalization,
    pub null_value_policy: NullValuePolicy,
}

impl Default for FilterConfig {
    /// Defaults pinned by SPEC_FULL §D.2: `ignoreCase: false, nullHandling:
    /// Native, enumMatching: Exact, stringNormalization: None,
    /// nullValuePolicy: StrictException`. Spec §4.1 names the option set but
    /// not the defaults; these are the conservative, least-surprising choice
    /// for each axis.
    fn default() -> Self {
        Self {
            ignore_case: false,
            null_handling: NullHandling::Native,
            enum_matching: EnumMatching::Exact,
            string_normalization: StringNormalization::None,
            null_value_policy: NullValuePolicy::StrictException,
        }
    }
}

/// DSL parser limits and mode (spec §4.2).
///
/// SPEC_FULL §D.1: promoted from a bare `maxExpressionLength` constant into a
/// real config struct so hosts can move the parser off its defaults without
/// forking it — it also carries the `strict_identifiers` toggle the grammar
/// note calls "strict mode", and the precedence table the shunting-yard
/// parser consults.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DslPolicy {
    /// Reject expressions longer than this (spec §4.2 step 1, default 1000).
    pub max_expression_length: usize,
    /// When true, `IDENT` must match `[A-Za-z_][A-Za-z0-9_]*`; when false,
    /// any run of non-`&|!()` characters is accepted as an identifier.
    pub strict_identifiers: bool,
}

impl Default for DslPolicy {
    fn default() -> Self {
        Self {
            max_expression_length: 1000,
            strict_identifiers: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_config_defaults_match_spec_full_d2() {
        let cfg = FilterConfig::default();
        assert!(!cfg.ignore_case);
        assert_eq!(cfg.enum_matching, EnumMatching::Exact);
        assert_eq!(cfg.null_value_policy, NullValuePolicy::StrictException);
    }

    #[test]
    fn dsl_policy_default_matches_spec_4_2() {
        let policy = DslPolicy::default();
        assert_eq!(policy.max_expression_length, 1000);
        assert!(!policy.strict_identifiers);
    }
}
