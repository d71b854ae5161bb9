//! The FilterQL error taxonomy (spec §7).
//!
//! Every error the CORE raises is one of the five kinds below. Each maps to
//! exactly one stage of the pipeline — the DSL parser, the value validator,
//! condition/argument binding, the projection parser and plan builder, or
//! the fetch engine's cooperative cancellation check — and propagation is
//! always immediate: nothing here is swallowed or retried.

use thiserror::Error;

/// Result type used throughout FilterQL.
pub type Result<T> = std::result::Result<T, Error>;

/// The FilterQL error taxonomy.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // DSL parser (C4) — tokenizing, shunting-yard, simplification
    // ========================================================================
    #[error("DSL syntax error in rule '{rule}': {message}")]
    DslSyntax { rule: &'static str, message: String },

    // ========================================================================
    // Value validator (C3)
    // ========================================================================
    #[error("filter validation failed: {0}")]
    FilterValidation(String),

    // ========================================================================
    // Condition builder, argument binder, operator registry (C6/C7)
    // ========================================================================
    #[error("filter definition error: {0}")]
    FilterDefinition(String),

    // ========================================================================
    // Projection parser and execution plan builder (C8/C9)
    // ========================================================================
    #[error("projection definition error: {0}")]
    ProjectionDefinition(String),

    // ========================================================================
    // Multi-query fetch engine (C10)
    // ========================================================================
    #[error("request cancelled")]
    Cancelled,

    // ========================================================================
    // Anything that should never happen given the invariants in spec §3
    // ========================================================================
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn dsl_syntax(rule: &'static str, message: impl Into<String>) -> Self {
        Self::DslSyntax {
            rule,
            message: message.into(),
        }
    }

    pub fn filter_validation(message: impl Into<String>) -> Self {
        Self::FilterValidation(message.into())
    }

    pub fn filter_definition(message: impl Into<String>) -> Self {
        Self::FilterDefinition(message.into())
    }

    pub fn projection_definition(message: impl Into<String>) -> Self {
        Self::ProjectionDefinition(message.into())
    }

    /// Short machine-readable kind, for hosts that want to branch without
    /// matching on the full enum (mirrors the teacher's `code()` convention,
    /// minus the HTTP-status mapping that belongs to a transport layer).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DslSyntax { .. } => "dsl_syntax",
            Self::FilterValidation(_) => "filter_validation",
            Self::FilterDefinition(_) => "filter_definition",
            Self::ProjectionDefinition(_) => "projection_definition",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dsl_syntax_includes_rule_name() {
        let err = Error::dsl_syntax("missing_operand", "expected identifier after '&'");
        assert_eq!(err.kind(), "dsl_syntax");
        assert!(err.to_string().contains("missing_operand"));
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(Error::Cancelled.kind(), "cancelled");
        assert_eq!(Error::Internal("x".into()).kind(), "internal");
    }
}
