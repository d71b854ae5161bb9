//! DSL tokens (spec §4.2 grammar).

use serde::{Deserialize, Serialize};

/// A single lexical token of the combinator DSL.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    /// A bare argKey identifier.
    Ident(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl Token {
    pub fn is_binary_op(&self) -> bool {
        matches!(self, Token::And | Token::Or)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{s}"),
            Token::And => write!(f, "&"),
            Token::Or => write!(f, "|"),
            Token::Not => write!(f, "!"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

/// The one whole-expression shorthand forms (spec §4.2: "combine *all*
/// filter keys with the corresponding operator; NOT = NOT of the AND of
/// all"). Recognized only when the entire (trimmed) DSL expression is
/// exactly one of these three keywords — see DESIGN.md for why this CORE
/// does not support shorthand nested inside a larger expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shorthand {
    And,
    Or,
    Not,
}

impl Shorthand {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(Shorthand::And),
            "OR" => Some(Shorthand::Or),
            "NOT" => Some(Shorthand::Not),
            _ => None,
        }
    }
}
