//! Tests for the selectivity-based cost model.

mod fixtures;

use fixtures::{approx_eq, by_user_and_done, round_trip_model, todo_builder};
use std::sync::Arc;
use tablesmith::cache::CostCache;
use tablesmith::model::{
    ClauseSpec, Direction, Distribution, DomainModel, FieldSpec, ModelBuilder, ModelError,
    Multiplicity, Selectivity, Sla,
};
use tablesmith::planner::cost::{sort_rows, CostModel, ROW_SCAN_COST};
use tablesmith::planner::logical::{Index, LogicalPlanner, Workload};
use tablesmith::planner::PlanError;

fn search(model: &DomainModel, cache: &CostCache) -> Workload {
    let cost = CostModel::new(model, cache);
    LogicalPlanner::new(model, &cost).search().unwrap()
}

fn find<'w>(model: &DomainModel, workload: &'w Workload, described: &str) -> &'w Index {
    workload
        .indexes()
        .iter()
        .find(|i| i.key.describe(model) == described)
        .unwrap_or_else(|| panic!("no candidate {}", described))
}

#[test]
fn test_round_trip_candidate_costs() {
    let model = round_trip_model();
    let cache = CostCache::new();
    let workload = search(&model, &cache);
    let cost = CostModel::new(&model, &cache);

    // Full scan of 1000 rows.
    let full = find(&model, &workload, "Todo{}[id DESC]");
    assert!(approx_eq(cost.cost(full).unwrap(), 1000.0 * ROW_SCAN_COST));

    // Residual `done` (2 values): 1.645 * 10 * 2 rows.
    let by_user = find(&model, &workload, "Todo{user_id}[id DESC]");
    assert!(approx_eq(cost.cost(by_user).unwrap(), 32.9 * ROW_SCAN_COST));

    // Residual `user_id` (100 values) would exceed the table, capped.
    let by_done = find(&model, &workload, "Todo{done}[id DESC]");
    assert!(approx_eq(cost.cost(by_done).unwrap(), 1000.0 * ROW_SCAN_COST));

    let exact = find(&model, &workload, "Todo{done, user_id}[id DESC]");
    assert_eq!(cost.cost(exact).unwrap(), 1.0);
}

#[test]
fn test_cost_at_least_one_and_one_only_without_residual() {
    let model = round_trip_model();
    let cache = CostCache::new();
    let workload = search(&model, &cache);
    let cost = CostModel::new(&model, &cache);

    for index in workload.indexes() {
        let c = cost.cost(index).unwrap();
        assert!(c >= 1.0, "{} cost {}", index.key.describe(&model), c);
        assert_eq!(c == 1.0, index.remaining.is_empty());
    }
}

#[test]
fn test_unsatisfied_order_costs_rows_per_partition() {
    // Both orders become clustering keys of Todo, so `recent` is also offered
    // tables clustered by `done`.
    let mut builder = todo_builder();
    builder.definition(
        "recent",
        "Todo",
        Multiplicity::List,
        ClauseSpec::new()
            .eq("user_id", "$u")
            .order_by("created_at", Direction::Desc),
    );
    builder.definition(
        "byStatus",
        "Todo",
        Multiplicity::List,
        ClauseSpec::new()
            .eq("user_id", "$u")
            .order_by("done", Direction::Asc),
    );
    builder.query("recent", Sla::default()).select("recent", 10);
    builder.query("byStatus", Sla::default()).select("byStatus", 10);
    let model = builder.build().unwrap();

    let cache = CostCache::new();
    let workload = search(&model, &cache);
    let cost = CostModel::new(&model, &cache);
    let recent = model.query_ids().next().unwrap();
    let candidate = |described: &str| {
        workload
            .indexes()
            .iter()
            .find(|i| i.query == recent && i.key.describe(&model) == described)
            .unwrap()
    };

    let misordered = candidate("Todo{user_id}[done ASC, id DESC]");
    let estimate = cost.breakdown(misordered).unwrap();
    assert_eq!(estimate.filter_rows, 1.0);
    // 1000 rows / 100 users
    assert!(approx_eq(estimate.sort_rows, 10.0));
    assert!(approx_eq(estimate.total, 10.0 * ROW_SCAN_COST));

    let ordered = candidate("Todo{user_id}[created_at DESC, id DESC]");
    assert_eq!(cost.cost(ordered).unwrap(), 1.0);
}

#[test]
fn test_any_direction_accepts_physical_order() {
    let mut builder = todo_builder();
    builder.definition(
        "anyOrder",
        "Todo",
        Multiplicity::List,
        ClauseSpec::new()
            .eq("user_id", "$u")
            .order_by("created_at", Direction::Any),
    );
    builder.query("q", Sla::default()).select("anyOrder", 10);
    let model = builder.build().unwrap();

    let cache = CostCache::new();
    let workload = search(&model, &cache);
    let index = find(&model, &workload, "Todo{user_id}[created_at ANY, id DESC]");
    assert_eq!(sort_rows(&model, index).unwrap(), 0.0);
}

#[test]
fn test_missing_statistic_is_fatal() {
    let mut builder = ModelBuilder::new();
    builder
        .entity("Todo")
        .max_rows(1000)
        .id("id")
        .field(FieldSpec::new("user_id", "String"))
        .field(FieldSpec::new("done", "Boolean"));
    builder.definition("todos", "Todo", Multiplicity::List, by_user_and_done());
    builder.query("q", Sla::default()).select("todos", 10);
    let model = builder.build().unwrap();

    let cache = CostCache::new();
    let cost = CostModel::new(&model, &cache);
    let err = LogicalPlanner::new(&model, &cost).search().unwrap_err();

    assert!(matches!(
        err,
        PlanError::SchemaResolution(ModelError::MissingSelectivity { .. })
    ));
    // Only the full scan, which needs no statistic, was priced.
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_costs_are_memoized() {
    let model = round_trip_model();
    let cache = CostCache::new();
    let workload = search(&model, &cache);

    let after_search = cache.stats();
    assert_eq!(after_search.entries, workload.indexes().len());
    assert_eq!(after_search.misses, workload.indexes().len());

    let cost = CostModel::new(&model, &cache);
    let costs = cost.price_workload(&workload).unwrap();
    assert_eq!(costs.len(), workload.indexes().len());

    let after_pricing = cache.stats();
    assert_eq!(after_pricing.entries, after_search.entries);
    assert_eq!(after_pricing.hits, after_search.hits + workload.indexes().len());
}

#[test]
fn test_row_scan_cost_override() {
    let model = round_trip_model();
    let cache = CostCache::new();
    let workload = search(&model, &cache);

    let fresh = CostCache::new();
    let cost = CostModel::with_row_scan_cost(&model, &fresh, 2.0);
    let full = find(&model, &workload, "Todo{}[id DESC]");
    assert_eq!(cost.cost(full).unwrap(), 2000.0);

    let exact = find(&model, &workload, "Todo{done, user_id}[id DESC]");
    assert_eq!(cost.cost(exact).unwrap(), 1.0);
}

/// Claims a page is found without reading anything.
#[derive(Debug)]
struct Vanishing;

impl Distribution for Vanishing {
    fn expected(&self, _page_size: u32, _distinct: u64) -> f64 {
        0.0
    }
}

#[test]
fn test_residual_scan_never_cheaper_than_direct_read() {
    let mut builder = ModelBuilder::new();
    builder
        .entity("Todo")
        .max_rows(1000)
        .id("id")
        .field(FieldSpec::new("user_id", "String"))
        .field(FieldSpec::new("done", "Boolean"))
        .selectivity_with(&["done"], Selectivity::with_distribution(2, Arc::new(Vanishing)))
        .selectivity(&["user_id"], 100)
        .selectivity(&["user_id", "done"], 200);
    builder.definition("todos", "Todo", Multiplicity::List, by_user_and_done());
    builder.query("q", Sla::default()).select("todos", 10);
    let model = builder.build().unwrap();

    let cache = CostCache::new();
    let workload = search(&model, &cache);
    let cost = CostModel::new(&model, &cache);

    let filtered = find(&model, &workload, "Todo{user_id}[id DESC]");
    let estimate = cost.breakdown(filtered).unwrap();
    assert_eq!(estimate.filter_rows, 1.0);
    assert!(approx_eq(estimate.total, ROW_SCAN_COST));

    let exact = find(&model, &workload, "Todo{done, user_id}[id DESC]");
    assert!(cost.cost(exact).unwrap() < estimate.total);
}
