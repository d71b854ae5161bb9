//! End-to-end acceptance tests for spec §8's scenarios S1-S6, driving the
//! full stack — DSL parser (C4), condition builder/resolver (C6), execution
//! plan builder (C9), and the multi-query engine (C10) — against the
//! in-memory backend in this crate. Property 6 ("no N+1") and property 7
//! ("composite keys") already have focused unit coverage in
//! `filterql-engine`; S6 below re-derives property 6 through the real
//! engine/backend pair rather than duplicating it in isolation.

use filterql_condition::{DefaultFilterContext, QueryExecutionParams};
use filterql_core::query_builder::{CriteriaBuilder, Query, QueryBuilderFactory};
use filterql_core::{CancellationToken, FilterConfig, FilterDefinition, Op, Pagination, Result, Value};
use filterql_dsl::build_condition;
use filterql_engine::{Engine, NoBeanResolver};
use filterql_projection::plan::build_plan;
use filterql_testkit::{age_property, name_property, username_property, CompanyBudgetProvider, FixtureRegistry, InMemoryStore, MemFactory, Row};
use indexmap::IndexMap;
use std::sync::Mutex;

fn user_store(rows: Vec<Row>) -> InMemoryStore {
    let store = InMemoryStore::new();
    for row in rows {
        store.insert("User", row);
    }
    store
}

#[test]
fn s1_simple_filter_keeps_only_the_matching_username() {
    let store = user_store(vec![
        Row::new().with("id", Value::Int(1)).with("username", Value::Str("john".into())),
        Row::new().with("id", Value::Int(2)).with("username", Value::Str("jane".into())),
    ]);
    let factory = MemFactory::new(store);
    let resolver = NoBeanResolver::new();
    let config = FilterConfig::default();

    let mut filters = IndexMap::new();
    filters.insert("f".to_string(), FilterDefinition::new(username_property(), Op::Eq, Value::Str("john".into())));
    let ctx = DefaultFilterContext;
    let condition = build_condition("f", &filters, &Default::default(), &ctx).unwrap();
    let params = QueryExecutionParams::new().with("f", Value::Str("john".into()));

    let registry = FixtureRegistry::new();
    let plan = build_plan(&registry, "User", None).unwrap();
    let engine = Engine::new(&factory, &resolver, &config);
    let rows = engine.execute(&plan, Some(&condition), &params, &Pagination::default(), &CancellationToken::new()).unwrap();

    assert_eq!(rows.len(), 1);
    let username_idx = plan.root_schema.index_by_dto_field("username").unwrap();
    assert_eq!(*rows[0].get(username_idx), Value::Str("john".into()));
}

#[test]
fn s2_range_keeps_ages_inside_the_inclusive_bounds() {
    let store = user_store(
        [20, 30, 40, 50]
            .into_iter()
            .enumerate()
            .map(|(i, age)| Row::new().with("id", Value::Int(i as i64)).with("age", Value::Int(age)))
            .collect(),
    );
    let factory = MemFactory::new(store);
    let resolver = NoBeanResolver::new();
    let config = FilterConfig::default();

    let mut filters = IndexMap::new();
    filters.insert("f".to_string(), FilterDefinition::new(age_property(), Op::Range, Value::List(vec![Value::Int(25), Value::Int(45)])));
    let ctx = DefaultFilterContext;
    let condition = build_condition("f", &filters, &Default::default(), &ctx).unwrap();
    let params = QueryExecutionParams::new().with("f", Value::List(vec![Value::Int(25), Value::Int(45)]));

    let registry = FixtureRegistry::new();
    let plan = build_plan(&registry, "User", None).unwrap();
    let engine = Engine::new(&factory, &resolver, &config);
    let rows = engine.execute(&plan, Some(&condition), &params, &Pagination::default(), &CancellationToken::new()).unwrap();

    let age_idx = plan.root_schema.index_by_dto_field("age").unwrap();
    let mut ages: Vec<i64> = rows.iter().map(|r| match r.get(age_idx) {
        Value::Int(n) => *n,
        other => panic!("expected Int, got {other:?}"),
    }).collect();
    ages.sort();
    assert_eq!(ages, vec![30, 40]);
}

#[test]
fn s3_boolean_precedence_combines_name_match_and_age() {
    let store = user_store(vec![
        Row::new().with("id", Value::Int(1)).with("name", Value::Str("Alice Smith".into())).with("age", Value::Int(25)),
        Row::new().with("id", Value::Int(2)).with("name", Value::Str("Bob Smith".into())).with("age", Value::Int(35)),
        Row::new().with("id", Value::Int(3)).with("name", Value::Str("Bob Jones".into())).with("age", Value::Int(40)),
    ]);
    let factory = MemFactory::new(store);
    let resolver = NoBeanResolver::new();
    let config = FilterConfig::default();

    let mut filters = IndexMap::new();
    filters.insert("a".to_string(), FilterDefinition::new(name_property(), Op::Matches, Value::Str("%smith%".into())));
    filters.insert("b".to_string(), FilterDefinition::new(age_property(), Op::Gt, Value::Int(30)));
    let ctx = DefaultFilterContext;
    let condition = build_condition("a & b", &filters, &Default::default(), &ctx).unwrap();
    let params = QueryExecutionParams::new().with("a", Value::Str("%smith%".into())).with("b", Value::Int(30));

    let registry = FixtureRegistry::new();
    let plan = build_plan(&registry, "User", None).unwrap();
    let engine = Engine::new(&factory, &resolver, &config);
    let rows = engine.execute(&plan, Some(&condition), &params, &Pagination::default(), &CancellationToken::new()).unwrap();

    assert_eq!(rows.len(), 1);
    let name_idx = plan.root_schema.index_by_dto_field("name").unwrap();
    assert_eq!(*rows[0].get(name_idx), Value::Str("Bob Smith".into()));
}

#[test]
fn s4_nested_collection_respects_size_and_descending_sort() {
    let store = InMemoryStore::new();
    store.insert("Author", Row::new().with("id", Value::Int(1)).with("name", Value::Str("A".into())));
    for (year, title) in [(2020, "Old"), (2022, "Mid"), (2024, "New")] {
        store.insert(
            "Book",
            Row::new().with("id", Value::Int(year)).with("title", Value::Str(title.into())).with("year", Value::Int(year)).with("author", Value::Int(1)),
        );
    }
    let factory = MemFactory::new(store);
    let resolver = NoBeanResolver::new();
    let config = FilterConfig::default();

    let registry = FixtureRegistry::new();
    let projection = vec!["id".to_string(), "name".to_string(), "books[size=2,sort=year:desc].title,year".to_string()];
    let plan = build_plan(&registry, "Author", Some(&projection)).unwrap();

    let engine = Engine::new(&factory, &resolver, &config);
    let rendered = engine.execute_and_render(&plan, None, &QueryExecutionParams::new(), &Pagination::default(), &CancellationToken::new()).unwrap();

    assert_eq!(rendered.len(), 1);
    let books = rendered[0]["books"].as_array().unwrap();
    assert_eq!(books.len(), 2);
    assert_eq!(books[0]["year"], 2024);
    assert_eq!(books[1]["year"], 2022);
}

#[test]
fn s5_computed_field_sums_department_budgets_after_aggregation() {
    let store = InMemoryStore::new()
        .declare_collection("Company", "departments", "Department", "company");
    store.insert("Company", Row::new().with("id", Value::Int(7)).with("name", Value::Str("Acme".into())));
    store.insert("Department", Row::new().with("id", Value::Int(1)).with("budget", Value::Int(100_000)).with("company", Value::Int(7)));
    store.insert("Department", Row::new().with("id", Value::Int(2)).with("budget", Value::Int(200_000)).with("company", Value::Int(7)));

    let factory = MemFactory::new(store);
    let resolver = NoBeanResolver::new().register("CompanyBudgetProvider", || std::sync::Arc::new(CompanyBudgetProvider));
    let config = FilterConfig::default();

    let registry = FixtureRegistry::new();
    let projection = vec!["id".to_string(), "name".to_string(), "totalBudgetInfo".to_string()];
    let plan = build_plan(&registry, "Company", Some(&projection)).unwrap();

    let engine = Engine::new(&factory, &resolver, &config);
    let rendered = engine.execute_and_render(&plan, None, &QueryExecutionParams::new(), &Pagination::default(), &CancellationToken::new()).unwrap();

    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0]["totalBudgetInfo"], "Company#7: budget=300000");
    assert!(rendered[0].get("departments").is_none(), "departments wasn't directly projected, so its dependency slot must not leak into the rendered row");
}

/// Counts `create_tuple_query` calls per entity so S6 can assert the actual
/// number of sub-queries the engine issues, not just the batch math in
/// isolation (property 6: "total number of sub-queries equals ceil(N/1000)").
struct CountingFactory {
    inner: MemFactory,
    counts: Mutex<std::collections::HashMap<String, usize>>,
}

impl CountingFactory {
    fn new(inner: MemFactory) -> Self {
        Self { inner, counts: Mutex::new(std::collections::HashMap::new()) }
    }

    fn count_for(&self, entity: &str) -> usize {
        *self.counts.lock().unwrap().get(entity).unwrap_or(&0)
    }
}

impl QueryBuilderFactory for CountingFactory {
    fn create_tuple_query(&self, root_entity: &str) -> Box<dyn Query> {
        *self.counts.lock().unwrap().entry(root_entity.to_string()).or_insert(0) += 1;
        self.inner.create_tuple_query(root_entity)
    }

    fn criteria_builder(&self) -> &dyn CriteriaBuilder {
        self.inner.criteria_builder()
    }
}

#[test]
fn s6_large_parent_set_batches_into_two_sub_queries() {
    const PARENT_COUNT: i64 = 1700;
    let store = InMemoryStore::new();
    for id in 0..PARENT_COUNT {
        store.insert("Author", Row::new().with("id", Value::Int(id)).with("name", Value::Str(format!("author-{id}"))));
        store.insert(
            "Book",
            Row::new().with("id", Value::Int(id)).with("title", Value::Str(format!("book-{id}"))).with("year", Value::Int(2000)).with("author", Value::Int(id)),
        );
    }
    let factory = CountingFactory::new(MemFactory::new(store));
    let resolver = NoBeanResolver::new();
    let config = FilterConfig::default();

    let registry = FixtureRegistry::new();
    let projection = vec!["id".to_string(), "name".to_string(), "books.title,year".to_string()];
    let plan = build_plan(&registry, "Author", Some(&projection)).unwrap();

    let engine = Engine::new(&factory, &resolver, &config);
    let pagination = Pagination::new(0, PARENT_COUNT as u32);
    let rows: Result<_> = engine.execute(&plan, None, &QueryExecutionParams::new(), &pagination, &CancellationToken::new());
    let rows = rows.unwrap();

    assert_eq!(rows.len(), PARENT_COUNT as usize);
    assert_eq!(factory.count_for("Author"), 1);
    assert_eq!(factory.count_for("Book"), 2, "1700 parent ids must batch into ceil(1700/1000) = 2 sub-queries");
    assert_eq!(rows[0].collections["books"].len(), 1);
}
