//! Phase 2 of the two-phase protocol (spec §4.3): binding arguments to a
//! `Condition` and producing a deferred `PredicateResolver`.

use crate::condition::Condition;
use crate::registry::OperatorRegistry;
use filterql_core::query_builder::{CriteriaBuilder, Path, Predicate, PredicateResolver};
use filterql_core::validation::{apply_null_policy, validate, NullPolicyOutcome};
use filterql_core::{coercion::coerce, Error, FilterConfig, FilterDefinition, Op, Result, Value};
use std::collections::HashMap;

/// The caller-supplied argument bindings for one resolve pass (spec §4.3
/// `QueryExecutionParams`).
#[derive(Clone, Debug, Default)]
pub struct QueryExecutionParams {
    pub arguments: HashMap<String, Value>,
}

impl QueryExecutionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }
}

/// Phase 2: traverse `condition`, bind each atom's `argKey` against
/// `params.arguments`, coerce and validate (C2/C3), and return a closure
/// deferred until the multi-query engine has a live query/builder pair.
///
/// Errors are raised immediately (not lazily, inside the returned closure)
/// — spec §4.3/§7: "Phase 2 errors are thrown on resolve", meaning on this
/// call, not on the closure's eventual invocation.
pub fn to_resolver(
    condition: &Condition,
    params: &QueryExecutionParams,
    config: &FilterConfig,
) -> Result<PredicateResolver> {
    match condition {
        Condition::Atom { arg_key, property, op } => atom_resolver(arg_key, property, op, params, config),
        Condition::And(l, r) => {
            let lr = to_resolver(l, params, config)?;
            let rr = to_resolver(r, params, config)?;
            Ok(Box::new(move |root: &dyn Path, builder: &dyn CriteriaBuilder| {
                let lp = lr(root, builder);
                let rp = rr(root, builder);
                builder.and(vec![lp, rp])
            }))
        }
        Condition::Or(l, r) => {
            let lr = to_resolver(l, params, config)?;
            let rr = to_resolver(r, params, config)?;
            Ok(Box::new(move |root: &dyn Path, builder: &dyn CriteriaBuilder| {
                let lp = lr(root, builder);
                let rp = rr(root, builder);
                builder.or(vec![lp, rp])
            }))
        }
        Condition::Not(inner) => {
            let ir = to_resolver(inner, params, config)?;
            Ok(Box::new(move |root: &dyn Path, builder: &dyn CriteriaBuilder| {
                let ip = ir(root, builder);
                builder.not(ip)
            }))
        }
    }
}

fn atom_resolver(
    arg_key: &str,
    property: &std::sync::Arc<filterql_core::PropertyReference>,
    op: &Op,
    params: &QueryExecutionParams,
    config: &FilterConfig,
) -> Result<PredicateResolver> {
    let raw_value = params.arguments.get(arg_key);

    if op.is_null_check() {
        let negated = matches!(op, Op::NotNull);
        let field_name = property.name.clone();
        return Ok(Box::new(move |root: &dyn Path, builder: &dyn CriteriaBuilder| {
            let path = resolve_path(root, &field_name);
            builder.is_null(path.as_ref(), negated)
        }));
    }

    let raw_value = raw_value.ok_or_else(|| {
        Error::filter_definition(format!("Required argument key '{arg_key}' not found"))
    })?;

    let effective_op = op.clone();
    if let Some(outcome) = apply_null_policy(op, raw_value, config)? {
        match outcome {
            NullPolicyOutcome::Ignore => {
                return Ok(Box::new(|_root: &dyn Path, builder: &dyn CriteriaBuilder| {
                    builder.conjunction()
                }));
            }
            NullPolicyOutcome::Rewritten(new_op) => {
                let negated = matches!(new_op, Op::NotNull);
                let field_name = property.name.clone();
                return Ok(Box::new(move |root: &dyn Path, builder: &dyn CriteriaBuilder| {
                    let path = resolve_path(root, &field_name);
                    builder.is_null(path.as_ref(), negated)
                }));
            }
        }
    }

    let coerced = coerce(raw_value, &property.value_type, config)?;
    validate(&effective_op, &coerced, &property.value_type)?;

    if let Op::Custom(code) = &effective_op {
        let provider = OperatorRegistry::get_provider(code).ok_or_else(|| {
            Error::filter_definition(format!("no operator provider registered for '{code}'"))
        })?;
        let filter = FilterDefinition::new(property.clone(), effective_op.clone(), coerced);
        return provider.to_resolver(&filter);
    }

    let field_name = property.name.clone();
    Ok(Box::new(move |root: &dyn Path, builder: &dyn CriteriaBuilder| {
        build_predicate(root, builder, &field_name, &effective_op, &coerced)
    }))
}

fn build_predicate(
    root: &dyn Path,
    builder: &dyn CriteriaBuilder,
    field_name: &str,
    op: &Op,
    value: &Value,
) -> Box<dyn Predicate> {
    let path = resolve_path(root, field_name);
    let path = path.as_ref();
    match op {
        Op::Eq => builder.equal(path, value),
        Op::Ne => builder.not_equal(path, value),
        Op::Gt => builder.gt(path, value),
        Op::Gte => builder.ge(path, value),
        Op::Lt => builder.lt(path, value),
        Op::Lte => builder.le(path, value),
        Op::Matches => builder.like(path, value, false),
        Op::NotMatches => builder.like(path, value, true),
        Op::In => builder.in_list(path, &value.as_elements().into_iter().cloned().collect::<Vec<_>>(), false),
        Op::NotIn => builder.in_list(path, &value.as_elements().into_iter().cloned().collect::<Vec<_>>(), true),
        Op::Range => {
            let elements = value.as_elements();
            builder.between(path, elements[0], elements[1], false)
        }
        Op::NotRange => {
            let elements = value.as_elements();
            builder.between(path, elements[0], elements[1], true)
        }
        Op::IsNull => builder.is_null(path, false),
        Op::NotNull => builder.is_null(path, true),
        Op::Custom(_) => unreachable!("custom operators are dispatched to the registry before this point"),
    }
}

/// Resolve a (possibly dotted) property name into a `Path`, nesting
/// `Path::get` once per segment.
fn resolve_path(root: &dyn Path, name: &str) -> Box<dyn Path> {
    let mut path = root.get(name.split('.').next().unwrap_or(name));
    for segment in name.split('.').skip(1) {
        path = path.get(segment);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use filterql_core::property::ValueType;
    use filterql_core::PropertyReference;

    // A minimal in-process Path/Predicate/CriteriaBuilder pair, just to
    // exercise the resolver's control flow without a real backend.
    struct TestPath(String);
    impl Path for TestPath {
        fn get(&self, field: &str) -> Box<dyn Path> {
            Box::new(TestPath(format!("{}.{}", self.0, field)))
        }
        fn field_path(&self) -> String {
            self.0.clone()
        }
    }

    #[derive(Debug, PartialEq)]
    struct TestPredicate(String);
    impl Predicate for TestPredicate {
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    struct TestBuilder;
    impl CriteriaBuilder for TestBuilder {
        fn equal(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!("{} = {value}", path.field_path())))
        }
        fn not_equal(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!("{} != {value}", path.field_path())))
        }
        fn gt(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!("{} > {value}", path.field_path())))
        }
        fn ge(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!("{} >= {value}", path.field_path())))
        }
        fn lt(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!("{} < {value}", path.field_path())))
        }
        fn le(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!("{} <= {value}", path.field_path())))
        }
        fn like(&self, path: &dyn Path, value: &Value, negated: bool) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!("{} {}LIKE {value}", path.field_path(), if negated { "NOT " } else { "" })))
        }
        fn between(&self, path: &dyn Path, lo: &Value, hi: &Value, negated: bool) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!(
                "{} {}BETWEEN {lo} AND {hi}",
                path.field_path(),
                if negated { "NOT " } else { "" }
            )))
        }
        fn in_list(&self, path: &dyn Path, values: &[Value], negated: bool) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!(
                "{} {}IN {:?}",
                path.field_path(),
                if negated { "NOT " } else { "" },
                values
            )))
        }
        fn is_null(&self, path: &dyn Path, negated: bool) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!(
                "{} IS {}NULL",
                path.field_path(),
                if negated { "NOT " } else { "" }
            )))
        }
        fn and(&self, predicates: Vec<Box<dyn Predicate>>) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!("AND({})", predicates.len())))
        }
        fn or(&self, predicates: Vec<Box<dyn Predicate>>) -> Box<dyn Predicate> {
            Box::new(TestPredicate(format!("OR({})", predicates.len())))
        }
        fn not(&self, _predicate: Box<dyn Predicate>) -> Box<dyn Predicate> {
            Box::new(TestPredicate("NOT(..)".into()))
        }
        fn conjunction(&self) -> Box<dyn Predicate> {
            Box::new(TestPredicate("TRUE".into()))
        }
        fn disjunction(&self) -> Box<dyn Predicate> {
            Box::new(TestPredicate("FALSE".into()))
        }
        fn function(&self, name: &str, _args: Vec<Box<dyn Path>>) -> Box<dyn Path> {
            Box::new(TestPath(name.to_string()))
        }
        fn sum(&self, path: &dyn Path) -> Box<dyn Path> {
            Box::new(TestPath(format!("SUM({})", path.field_path())))
        }
        fn avg(&self, path: &dyn Path) -> Box<dyn Path> {
            Box::new(TestPath(format!("AVG({})", path.field_path())))
        }
        fn min(&self, path: &dyn Path) -> Box<dyn Path> {
            Box::new(TestPath(format!("MIN({})", path.field_path())))
        }
        fn max(&self, path: &dyn Path) -> Box<dyn Path> {
            Box::new(TestPath(format!("MAX({})", path.field_path())))
        }
        fn count(&self, path: &dyn Path) -> Box<dyn Path> {
            Box::new(TestPath(format!("COUNT({})", path.field_path())))
        }
        fn count_distinct(&self, path: &dyn Path) -> Box<dyn Path> {
            Box::new(TestPath(format!("COUNT(DISTINCT {})", path.field_path())))
        }
    }

    fn pr() -> std::sync::Arc<PropertyReference> {
        PropertyReference::new("age", ValueType::Integer, ["GT", "EQ"], "User")
    }

    #[test]
    fn missing_arg_key_errors_unless_null_check() {
        let cond = Condition::atom("k", pr(), Op::Gt);
        let params = QueryExecutionParams::new();
        assert!(to_resolver(&cond, &params, &FilterConfig::default()).is_err());
    }

    #[test]
    fn different_bindings_yield_structurally_identical_but_distinct_predicates() {
        let cond = Condition::atom("k", pr(), Op::Gt);
        let config = FilterConfig::default();

        let p1 = QueryExecutionParams::new().with("k", Value::Int(1));
        let p2 = QueryExecutionParams::new().with("k", Value::Int(2));

        let r1 = to_resolver(&cond, &p1, &config).unwrap();
        let r2 = to_resolver(&cond, &p2, &config).unwrap();

        let root = TestPath("age".to_string());
        let builder = TestBuilder;
        let pred1 = r1(&root, &builder);
        let pred2 = r2(&root, &builder);

        let pred1 = pred1.as_any().downcast_ref::<TestPredicate>().unwrap();
        let pred2 = pred2.as_any().downcast_ref::<TestPredicate>().unwrap();
        assert_ne!(pred1.0, pred2.0);
    }

    #[test]
    fn null_check_ignores_missing_argument() {
        let cond = Condition::atom("k", pr(), Op::IsNull);
        let params = QueryExecutionParams::new();
        assert!(to_resolver(&cond, &params, &FilterConfig::default()).is_ok());
    }
}
