//! FilterQL DSL - the combinator-expression front end: tokenizer,
//! shunting-yard parser, Boolean simplifier, process-wide LRU structural
//! cache, and the glue that turns a parsed `FilterTree` plus a filter set
//! into a `Condition` (components C4/C5, spec §4.2).

pub mod cache;
pub mod parser;
pub mod postfix;
pub mod simplify;
pub mod token;
pub mod tokenize;

pub use cache::CacheStats;
pub use parser::{build_condition, parse, FilterTree};
pub use token::{Shorthand, Token};
