//! Top-level entry points tying tokenize → shunting-yard → simplify → cache
//! → `Condition` construction together (component C4, spec §4.2/§4.3).

use crate::cache;
use crate::postfix::to_postfix;
use crate::simplify::simplify;
use crate::token::{Shorthand, Token};
use crate::tokenize::tokenize;
use filterql_condition::{Condition, FilterContext};
use filterql_core::filter::FilterDefinition;
use filterql_core::{DslPolicy, Error, Result};
use indexmap::IndexMap;

/// The parsed, simplified postfix representation of a combinator DSL
/// expression (spec §3 `FilterTree`). Stateless — references argKey
/// identifiers only, never resolved `FilterDefinition`s.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterTree {
    postfix: Vec<Token>,
}

impl FilterTree {
    pub fn postfix(&self) -> &[Token] {
        &self.postfix
    }
}

/// Parse `expr` into a `FilterTree`, consulting (and populating) the
/// process-wide structural cache. A cache hit skips tokenizing, shunting-yard
/// conversion, and simplification entirely; parse errors are never cached
/// (spec §7 "Cache only stores successful parses").
pub fn parse(expr: &str, policy: &DslPolicy) -> Result<FilterTree> {
    if let Some(cached) = cache::get(expr) {
        return Ok(FilterTree { postfix: cached });
    }

    let tokens = tokenize(expr, policy)?;
    let raw_postfix = to_postfix(&tokens)?;
    let postfix = simplify(&raw_postfix);

    cache::put(expr, postfix.clone());
    Ok(FilterTree { postfix })
}

/// Build a `Condition` DAG from a parsed `FilterTree` against a concrete
/// filter set, resolving each Ident to its `FilterDefinition` and handing the
/// (argKey, property, op) triple to `ctx.to_condition` (phase 1, spec §4.3).
///
/// `combine_with` is re-checked here (rather than solely in `parse`) because
/// whole-expression shorthand (`"AND" | "OR" | "NOT"`) can only be resolved
/// once the actual filter set is known — a filter literally named "and" must
/// take priority over the shorthand reading (see `token::Shorthand`).
pub fn build_condition(
    combine_with: &str,
    filters: &IndexMap<String, FilterDefinition>,
    policy: &DslPolicy,
    ctx: &dyn FilterContext,
) -> Result<Condition> {
    let trimmed = combine_with.trim();

    if !filters.contains_key(trimmed) {
        if let Some(shorthand) = Shorthand::from_str(trimmed) {
            return build_shorthand(shorthand, filters, ctx);
        }
    }

    let tree = parse(combine_with, policy)?;
    build_from_postfix(&tree.postfix, filters, ctx)
}

fn build_shorthand(
    shorthand: Shorthand,
    filters: &IndexMap<String, FilterDefinition>,
    ctx: &dyn FilterContext,
) -> Result<Condition> {
    if filters.is_empty() {
        return Err(Error::dsl_syntax(
            "empty_expression",
            "shorthand combinator requires at least one filter",
        ));
    }

    let mut atoms = filters
        .iter()
        .map(|(key, def)| ctx.to_condition(key, def.property.clone(), def.op));
    let first = atoms.next().unwrap()?;

    match shorthand {
        Shorthand::And => atoms.try_fold(first, |acc, next| Ok(Condition::and(acc, next?))),
        Shorthand::Or => atoms.try_fold(first, |acc, next| Ok(Condition::or(acc, next?))),
        Shorthand::Not => {
            let conjunction = atoms.try_fold(first, |acc, next| Ok(Condition::and(acc, next?)))?;
            Ok(Condition::not(conjunction))
        }
    }
}

fn build_from_postfix(
    postfix: &[Token],
    filters: &IndexMap<String, FilterDefinition>,
    ctx: &dyn FilterContext,
) -> Result<Condition> {
    let mut stack: Vec<Condition> = Vec::with_capacity(postfix.len());

    for token in postfix {
        match token {
            Token::Ident(key) => {
                let def = filters.get(key).ok_or_else(|| {
                    Error::filter_definition(format!(
                        "combineWith references undefined filter key '{key}'"
                    ))
                })?;
                let cond = ctx.to_condition(key, def.property.clone(), def.op)?;
                stack.push(cond);
            }
            Token::Not => {
                let inner = stack.pop().ok_or_else(|| {
                    Error::dsl_syntax("missing_operand", "'!' with no operand during build")
                })?;
                stack.push(Condition::not(inner));
            }
            Token::And => {
                let right = stack.pop().ok_or_else(|| {
                    Error::dsl_syntax("missing_operand", "'&' missing right operand during build")
                })?;
                let left = stack.pop().ok_or_else(|| {
                    Error::dsl_syntax("missing_operand", "'&' missing left operand during build")
                })?;
                stack.push(Condition::and(left, right));
            }
            Token::Or => {
                let right = stack.pop().ok_or_else(|| {
                    Error::dsl_syntax("missing_operand", "'|' missing right operand during build")
                })?;
                let left = stack.pop().ok_or_else(|| {
                    Error::dsl_syntax("missing_operand", "'|' missing left operand during build")
                })?;
                stack.push(Condition::or(left, right));
            }
            Token::LParen | Token::RParen => {
                return Err(Error::Internal("parentheses cannot appear in a postfix stream".into()))
            }
        }
    }

    stack
        .pop()
        .filter(|_| stack.is_empty())
        .ok_or_else(|| Error::dsl_syntax("missing_operand", "expression did not reduce to a single condition"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use filterql_condition::DefaultFilterContext;
    use filterql_core::property::{PropertyReference, ValueType};
    use filterql_core::{Op, Value};

    fn filters() -> IndexMap<String, FilterDefinition> {
        let mut map = IndexMap::new();
        let age = PropertyReference::new("age", ValueType::Integer, ["GT", "LT"], "User");
        let name = PropertyReference::new("name", ValueType::String, ["EQ"], "User");
        map.insert("a".to_string(), FilterDefinition::new(age, Op::Gt, Value::Int(30)));
        map.insert(
            "b".to_string(),
            FilterDefinition::new(name, Op::Eq, Value::Str("bob".into())),
        );
        map
    }

    #[test]
    fn dsl_idempotence_across_whitespace() {
        let policy = DslPolicy::default();
        let e1 = parse("a & b", &policy).unwrap();
        let e2 = parse("a&b", &policy).unwrap();
        assert_eq!(e1, e2);
    }

    #[test]
    fn build_condition_resolves_identifiers_to_atoms() {
        let ctx = DefaultFilterContext;
        let policy = DslPolicy::default();
        let cond = build_condition("a & b", &filters(), &policy, &ctx).unwrap();
        let mut keys = cond.arg_keys();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn build_condition_rejects_undefined_filter_key() {
        let ctx = DefaultFilterContext;
        let policy = DslPolicy::default();
        assert!(build_condition("a & missing", &filters(), &policy, &ctx).is_err());
    }

    #[test]
    fn literal_filter_key_named_and_takes_priority_over_shorthand() {
        let ctx = DefaultFilterContext;
        let policy = DslPolicy::default();
        let mut map = filters();
        let flag = PropertyReference::new("flag", ValueType::Boolean, ["EQ"], "User");
        map.insert("AND".to_string(), FilterDefinition::new(flag, Op::Eq, Value::Bool(true)));

        let cond = build_condition("AND", &map, &policy, &ctx).unwrap();
        assert_eq!(cond.arg_keys(), vec!["AND"]);
    }

    #[test]
    fn shorthand_and_combines_every_filter() {
        let ctx = DefaultFilterContext;
        let policy = DslPolicy::default();
        let cond = build_condition("AND", &filters(), &policy, &ctx).unwrap();
        let mut keys = cond.arg_keys();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn shorthand_not_negates_the_conjunction_of_all_filters() {
        let ctx = DefaultFilterContext;
        let policy = DslPolicy::default();
        let cond = build_condition("not", &filters(), &policy, &ctx).unwrap();
        assert!(matches!(cond, Condition::Not(_)));
    }
}
