//! An in-memory implementation of the abstract query-builder seam (spec
//! §6.2), grounded on the `TestPath`/`TestPredicate`/`TestBuilder` fixtures in
//! `filterql_condition::resolver` and `filterql_engine::engine`'s
//! `FakePath`/`FakeQuery`/`FakeFactory` harness, generalized into a real
//! multi-table store so the engine's batched fetch (C10) can be driven end to
//! end without a database.
//!
//! `Path::field_path()` is purely diagnostic per the trait's own contract, so
//! this backend is free to give it a private textual convention: a reducer
//! wraps its base path as `"SUM(a.b)"`, which `decode_path` parses back when
//! a `Query` receives the path through a `multi_select`/`order_by` call.
//! Nothing outside this module ever inspects the convention.

use filterql_core::query_builder::{CriteriaBuilder, OrderExpr, Path, Predicate, Query, QueryBuilderFactory, Tuple};
use filterql_core::{Result, Value};
use filterql_projection::Reducer;
use std::any::Any;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

/// One stored record: a flat bag of entity-field values.
#[derive(Clone, Debug, Default)]
pub struct Row(pub HashMap<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.0.insert(field.into(), value);
        self
    }

    fn get(&self, field: &str) -> Value {
        self.0.get(field).cloned().unwrap_or(Value::Null)
    }
}

/// A to-many association: `entity.field` is reachable from `target_entity`
/// rows whose `fk_field` equals the parent's id.
#[derive(Clone)]
struct ToMany {
    target_entity: String,
    fk_field: String,
}

/// A handful of in-memory tables plus the association metadata needed to
/// walk them (§4.7's batched child fetch, §4.6 step 4's reducer dependency
/// walk). Shared across every `Query`/`Path`/`Predicate` this backend hands
/// out via `Arc`.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    collections: HashMap<(String, String), ToMany>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, entity: impl Into<String>, row: Row) {
        self.tables.write().unwrap().entry(entity.into()).or_default().push(row);
    }

    /// Declare that `entity.field` is a to-many collection whose elements
    /// live in `target_entity`, reachable by the scalar FK `fk_field` on each
    /// target row pointing back at the parent's id.
    pub fn declare_collection(
        mut self,
        entity: impl Into<String>,
        field: impl Into<String>,
        target_entity: impl Into<String>,
        fk_field: impl Into<String>,
    ) -> Self {
        self.collections.insert((entity.into(), field.into()), ToMany {
            target_entity: target_entity.into(),
            fk_field: fk_field.into(),
        });
        self
    }

    fn rows(&self, entity: &str) -> Vec<Row> {
        self.tables.read().unwrap().get(entity).cloned().unwrap_or_default()
    }

    fn to_many(&self, entity: &str, field: &str) -> Option<ToMany> {
        self.collections.get(&(entity.to_string(), field.to_string())).cloned()
    }
}

#[derive(Clone, Debug)]
pub struct MemPath {
    segments: Vec<String>,
    reducer: Option<Reducer>,
}

impl Path for MemPath {
    fn get(&self, field: &str) -> Box<dyn Path> {
        let mut segments = self.segments.clone();
        segments.push(field.to_string());
        Box::new(MemPath { segments, reducer: None })
    }

    fn field_path(&self) -> String {
        let plain = self.segments.join(".");
        match self.reducer {
            None => plain,
            Some(r) => format!("{}({plain})", reducer_code(r)),
        }
    }
}

fn reducer_code(r: Reducer) -> &'static str {
    match r {
        Reducer::Sum => "SUM",
        Reducer::Avg => "AVG",
        Reducer::Min => "MIN",
        Reducer::Max => "MAX",
        Reducer::Count => "COUNT",
        Reducer::CountDistinct => "COUNT_DISTINCT",
    }
}

fn decode_path(path: &dyn Path) -> MemPath {
    let text = path.field_path();
    const PREFIXES: &[(&str, Reducer)] = &[
        ("COUNT_DISTINCT(", Reducer::CountDistinct),
        ("SUM(", Reducer::Sum),
        ("AVG(", Reducer::Avg),
        ("MIN(", Reducer::Min),
        ("MAX(", Reducer::Max),
        ("COUNT(", Reducer::Count),
    ];
    for (prefix, reducer) in PREFIXES {
        if let Some(inner) = text.strip_prefix(*prefix).and_then(|s| s.strip_suffix(')')) {
            return MemPath {
                segments: inner.split('.').map(String::from).collect(),
                reducer: Some(*reducer),
            };
        }
    }
    MemPath {
        segments: text.split('.').map(String::from).collect(),
        reducer: None,
    }
}

#[derive(Clone, Copy, Debug)]
enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Clone, Debug)]
pub enum MemPredicate {
    Cmp(Vec<String>, CmpOp, Value),
    Like(Vec<String>, Value, bool),
    Between(Vec<String>, Value, Value, bool),
    InList(Vec<String>, Vec<Value>, bool),
    IsNull(Vec<String>, bool),
    And(Vec<MemPredicate>),
    Or(Vec<MemPredicate>),
    Not(Box<MemPredicate>),
    True,
    False,
}

impl Predicate for MemPredicate {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn segments_of(path: &dyn Path) -> Vec<String> {
    decode_path(path).segments
}

fn downcast(predicate: Box<dyn Predicate>) -> MemPredicate {
    predicate.as_any().downcast_ref::<MemPredicate>().cloned().unwrap_or(MemPredicate::False)
}

fn downcast_all(predicates: Vec<Box<dyn Predicate>>) -> Vec<MemPredicate> {
    predicates.into_iter().map(downcast).collect()
}

pub struct MemBuilder;

impl CriteriaBuilder for MemBuilder {
    fn equal(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
        Box::new(MemPredicate::Cmp(segments_of(path), CmpOp::Eq, value.clone()))
    }
    fn not_equal(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
        Box::new(MemPredicate::Cmp(segments_of(path), CmpOp::Ne, value.clone()))
    }
    fn gt(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
        Box::new(MemPredicate::Cmp(segments_of(path), CmpOp::Gt, value.clone()))
    }
    fn ge(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
        Box::new(MemPredicate::Cmp(segments_of(path), CmpOp::Ge, value.clone()))
    }
    fn lt(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
        Box::new(MemPredicate::Cmp(segments_of(path), CmpOp::Lt, value.clone()))
    }
    fn le(&self, path: &dyn Path, value: &Value) -> Box<dyn Predicate> {
        Box::new(MemPredicate::Cmp(segments_of(path), CmpOp::Le, value.clone()))
    }
    fn like(&self, path: &dyn Path, pattern: &Value, negated: bool) -> Box<dyn Predicate> {
        Box::new(MemPredicate::Like(segments_of(path), pattern.clone(), negated))
    }
    fn between(&self, path: &dyn Path, lo: &Value, hi: &Value, negated: bool) -> Box<dyn Predicate> {
        Box::new(MemPredicate::Between(segments_of(path), lo.clone(), hi.clone(), negated))
    }
    fn in_list(&self, path: &dyn Path, values: &[Value], negated: bool) -> Box<dyn Predicate> {
        Box::new(MemPredicate::InList(segments_of(path), values.to_vec(), negated))
    }
    fn is_null(&self, path: &dyn Path, negated: bool) -> Box<dyn Predicate> {
        Box::new(MemPredicate::IsNull(segments_of(path), negated))
    }
    fn and(&self, predicates: Vec<Box<dyn Predicate>>) -> Box<dyn Predicate> {
        Box::new(MemPredicate::And(downcast_all(predicates)))
    }
    fn or(&self, predicates: Vec<Box<dyn Predicate>>) -> Box<dyn Predicate> {
        Box::new(MemPredicate::Or(downcast_all(predicates)))
    }
    fn not(&self, predicate: Box<dyn Predicate>) -> Box<dyn Predicate> {
        Box::new(MemPredicate::Not(Box::new(downcast(predicate))))
    }
    fn conjunction(&self) -> Box<dyn Predicate> {
        Box::new(MemPredicate::True)
    }
    fn disjunction(&self) -> Box<dyn Predicate> {
        Box::new(MemPredicate::False)
    }
    fn function(&self, name: &str, _args: Vec<Box<dyn Path>>) -> Box<dyn Path> {
        Box::new(MemPath { segments: vec![name.to_string()], reducer: None })
    }
    fn sum(&self, path: &dyn Path) -> Box<dyn Path> {
        Box::new(MemPath { segments: decode_path(path).segments, reducer: Some(Reducer::Sum) })
    }
    fn avg(&self, path: &dyn Path) -> Box<dyn Path> {
        Box::new(MemPath { segments: decode_path(path).segments, reducer: Some(Reducer::Avg) })
    }
    fn min(&self, path: &dyn Path) -> Box<dyn Path> {
        Box::new(MemPath { segments: decode_path(path).segments, reducer: Some(Reducer::Min) })
    }
    fn max(&self, path: &dyn Path) -> Box<dyn Path> {
        Box::new(MemPath { segments: decode_path(path).segments, reducer: Some(Reducer::Max) })
    }
    fn count(&self, path: &dyn Path) -> Box<dyn Path> {
        Box::new(MemPath { segments: decode_path(path).segments, reducer: Some(Reducer::Count) })
    }
    fn count_distinct(&self, path: &dyn Path) -> Box<dyn Path> {
        Box::new(MemPath { segments: decode_path(path).segments, reducer: Some(Reducer::CountDistinct) })
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn resolve_scalar(_store: &InMemoryStore, row: &Row, segments: &[String]) -> Value {
    match segments.first() {
        Some(field) if segments.len() == 1 => row.get(field),
        // Multi-segment non-reducer navigation (a to-one hop) isn't needed
        // by anything this backend drives; treated as unresolvable.
        _ => Value::Null,
    }
}

fn resolve_reducer(store: &InMemoryStore, entity: &str, row: &Row, segments: &[String], reducer: Reducer) -> Value {
    let Some((head, rest)) = segments.split_first() else { return Value::Null };
    let Some(assoc) = store.to_many(entity, head) else { return Value::Null };
    let id = row.get("id");
    let children: Vec<Row> = store
        .rows(&assoc.target_entity)
        .into_iter()
        .filter(|child| child.get(&assoc.fk_field) == id)
        .collect();
    let values: Vec<Value> = children.iter().map(|child| resolve_scalar(store, child, rest)).collect();
    reduce(reducer, &values)
}

fn resolve_value(store: &InMemoryStore, entity: &str, row: &Row, segments: &[String], reducer: Option<Reducer>) -> Value {
    match reducer {
        None => resolve_scalar(store, row, segments),
        Some(r) => resolve_reducer(store, entity, row, segments, r),
    }
}

fn reduce(reducer: Reducer, values: &[Value]) -> Value {
    let nums: Vec<f64> = values.iter().filter_map(as_f64).collect();
    match reducer {
        Reducer::Sum => Value::Int(nums.iter().sum::<f64>() as i64),
        Reducer::Avg => {
            if nums.is_empty() {
                Value::Null
            } else {
                Value::Float(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        }
        Reducer::Min => nums.iter().cloned().fold(None, |acc, x| Some(acc.map_or(x, |a: f64| a.min(x)))).map(|v| Value::Int(v as i64)).unwrap_or(Value::Null),
        Reducer::Max => nums.iter().cloned().fold(None, |acc, x| Some(acc.map_or(x, |a: f64| a.max(x)))).map(|v| Value::Int(v as i64)).unwrap_or(Value::Null),
        Reducer::Count => Value::Int(values.len() as i64),
        Reducer::CountDistinct => {
            let mut seen = HashSet::new();
            Value::Int(values.iter().filter(|v| seen.insert(format!("{v:?}"))).count() as i64)
        }
    }
}

fn like_match(actual: &Value, pattern: &Value) -> bool {
    let (Value::Str(s), Value::Str(p)) = (actual, pattern) else { return false };
    let needle = p.trim_matches('%');
    if p.starts_with('%') && p.ends_with('%') && p.len() > 1 {
        s.to_lowercase().contains(&needle.to_lowercase())
    } else if let Some(suffix) = p.strip_prefix('%') {
        s.to_lowercase().ends_with(&suffix.to_lowercase())
    } else if let Some(prefix) = p.strip_suffix('%') {
        s.to_lowercase().starts_with(&prefix.to_lowercase())
    } else {
        s.eq_ignore_ascii_case(p)
    }
}

fn compare(a: &Value, op: CmpOp, b: &Value) -> bool {
    match op {
        CmpOp::Eq => a == b,
        CmpOp::Ne => a != b,
        _ => match compare_ord(a, b) {
            Some(ordering) => match (ordering, op) {
                (Ordering::Greater, CmpOp::Gt) => true,
                (Ordering::Greater | Ordering::Equal, CmpOp::Ge) => true,
                (Ordering::Less, CmpOp::Lt) => true,
                (Ordering::Less | Ordering::Equal, CmpOp::Le) => true,
                _ => false,
            },
            None => false,
        },
    }
}

fn compare_ord(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.partial_cmp(y),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn eval(store: &InMemoryStore, entity: &str, row: &Row, predicate: &MemPredicate) -> bool {
    match predicate {
        MemPredicate::Cmp(segments, op, value) => compare(&resolve_scalar(store, row, segments), *op, value),
        MemPredicate::Like(segments, pattern, negated) => like_match(&resolve_scalar(store, row, segments), pattern) != *negated,
        MemPredicate::Between(segments, lo, hi, negated) => {
            let actual = resolve_scalar(store, row, segments);
            let inside = compare(&actual, CmpOp::Ge, lo) && compare(&actual, CmpOp::Le, hi);
            inside != *negated
        }
        MemPredicate::InList(segments, values, negated) => {
            let actual = resolve_scalar(store, row, segments);
            values.contains(&actual) != *negated
        }
        MemPredicate::IsNull(segments, negated) => resolve_scalar(store, row, segments).is_null() != *negated,
        MemPredicate::And(predicates) => predicates.iter().all(|p| eval(store, entity, row, p)),
        MemPredicate::Or(predicates) => predicates.iter().any(|p| eval(store, entity, row, p)),
        MemPredicate::Not(inner) => !eval(store, entity, row, inner),
        MemPredicate::True => true,
        MemPredicate::False => false,
    }
}

struct MemTuple(HashMap<String, Value>);

impl Tuple for MemTuple {
    fn get(&self, alias: &str) -> Option<Value> {
        self.0.get(alias).cloned()
    }
    fn elements(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }
}

pub struct MemQuery {
    store: Arc<InMemoryStore>,
    entity: String,
    predicate: MemPredicate,
    selects: Vec<(String, MemPath)>,
    orders: Vec<(Vec<String>, bool)>,
}

impl Query for MemQuery {
    fn root(&self) -> Box<dyn Path> {
        Box::new(MemPath { segments: Vec::new(), reducer: None })
    }

    fn multi_select(&mut self, aliased: Vec<(String, Box<dyn Path>)>) {
        self.selects = aliased.into_iter().map(|(alias, path)| (alias, decode_path(path.as_ref()))).collect();
    }

    fn where_clause(&mut self, predicate: Box<dyn Predicate>) {
        self.predicate = downcast(predicate);
    }

    fn order_by(&mut self, orders: Vec<OrderExpr>) {
        self.orders = orders.into_iter().map(|o| (segments_of(o.path.as_ref()), o.ascending)).collect();
    }

    fn execute(&self, offset: u32, limit: u32) -> Result<Vec<Box<dyn Tuple>>> {
        let mut rows: Vec<Row> = self
            .store
            .rows(&self.entity)
            .into_iter()
            .filter(|row| eval(&self.store, &self.entity, row, &self.predicate))
            .collect();

        // Stable sort applied from the least-significant key to the most
        // significant one yields a correct overall multi-key ordering.
        for (segments, ascending) in self.orders.iter().rev() {
            rows.sort_by(|a, b| {
                let ordering = compare_ord(&resolve_scalar(&self.store, a, segments), &resolve_scalar(&self.store, b, segments)).unwrap_or(Ordering::Equal);
                if *ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        let start = (offset as usize).min(rows.len());
        let end = if limit == filterql_core::query_builder::UNBOUNDED {
            rows.len()
        } else {
            start.saturating_add(limit as usize).min(rows.len())
        };
        let page = &rows[start..end];

        let tuples = page
            .iter()
            .map(|row| {
                let values: HashMap<String, Value> = self
                    .selects
                    .iter()
                    .map(|(alias, path)| (alias.clone(), resolve_value(&self.store, &self.entity, row, &path.segments, path.reducer)))
                    .collect();
                Box::new(MemTuple(values)) as Box<dyn Tuple>
            })
            .collect();
        Ok(tuples)
    }
}

pub struct MemFactory {
    store: Arc<InMemoryStore>,
    builder: MemBuilder,
}

impl MemFactory {
    pub fn new(store: InMemoryStore) -> Self {
        Self { store: Arc::new(store), builder: MemBuilder }
    }
}

impl QueryBuilderFactory for MemFactory {
    fn create_tuple_query(&self, root_entity: &str) -> Box<dyn Query> {
        Box::new(MemQuery {
            store: self.store.clone(),
            entity: root_entity.to_string(),
            predicate: MemPredicate::True,
            selects: Vec::new(),
            orders: Vec::new(),
        })
    }

    fn criteria_builder(&self) -> &dyn CriteriaBuilder {
        &self.builder
    }
}
