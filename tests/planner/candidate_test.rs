//! Tests for candidate enumeration and plan tree assembly.

mod fixtures;

use fixtures::{round_trip_model, todo_builder};
use tablesmith::cache::CostCache;
use tablesmith::model::{
    ClauseSpec, DomainModel, FieldSpec, ModelBuilder, Multiplicity, PathSet, RelationSpec, Sla,
};
use tablesmith::planner::cost::CostModel;
use tablesmith::planner::logical::{has_root_id, partition_key_subsets, LogicalPlanner, Workload};

fn search(model: &DomainModel) -> Workload {
    let cache = CostCache::new();
    let cost = CostModel::new(model, &cache);
    LogicalPlanner::new(model, &cost).search().unwrap()
}

fn describe_all(model: &DomainModel, workload: &Workload) -> Vec<String> {
    workload
        .indexes()
        .iter()
        .map(|i| i.key.describe(model))
        .collect()
}

#[test]
fn test_power_set_of_sargable_predicates() {
    let mut builder = ModelBuilder::new();
    builder
        .entity("Event")
        .id("id")
        .field(FieldSpec::new("a", "String"))
        .field(FieldSpec::new("b", "String"))
        .field(FieldSpec::new("c", "String"))
        .field(FieldSpec::new("d", "String"));
    let model = builder.build().unwrap();
    let event = model.entity_id("Event").unwrap();

    for n in 0..=4 {
        let sargable: PathSet = ["a", "b", "c", "d"][..n]
            .iter()
            .map(|p| model.resolve_path(event, p).unwrap())
            .collect();
        let subsets = partition_key_subsets(&sargable);

        assert_eq!(subsets.len(), 1 << n);
        assert!(subsets.contains(&PathSet::new()));
        assert!(subsets.contains(&sargable));
        let distinct: std::collections::BTreeSet<_> = subsets.iter().collect();
        assert_eq!(distinct.len(), subsets.len());
    }
}

#[test]
fn test_round_trip_candidates() {
    let model = round_trip_model();
    let workload = search(&model);

    assert_eq!(
        describe_all(&model, &workload),
        vec![
            "Todo{}[id DESC]",
            "Todo{done}[id DESC]",
            "Todo{user_id}[id DESC]",
            "Todo{done, user_id}[id DESC]",
        ]
    );
    assert_eq!(workload.plans().len(), 1);
    assert_eq!(workload.sibling_sets().len(), 1);
    assert_eq!(workload.sibling_sets()[0].len(), 4);
}

#[test]
fn test_non_sargable_predicate_stays_residual() {
    let mut builder = ModelBuilder::new();
    builder
        .entity("User")
        .id("id")
        .field(FieldSpec::new("email", "String"));
    builder
        .entity("Todo")
        .max_rows(1000)
        .id("id")
        .field(FieldSpec::new("user_id", "String"))
        .field(FieldSpec::new("assignee", "User").mutable())
        .selectivity(&["assignee.email"], 50);
    builder.definition(
        "byAssignee",
        "Todo",
        Multiplicity::List,
        ClauseSpec::new().eq("user_id", "$u").eq("assignee.email", "$e"),
    );
    builder.query("q", Sla::default()).select("byAssignee", 10);
    let model = builder.build().unwrap();
    let workload = search(&model);

    // Only user_id may be keyed: {} and {user_id}.
    assert_eq!(workload.indexes().len(), 2);
    for index in workload.indexes() {
        assert!(index
            .remaining
            .iter()
            .any(|p| p.to_string() == "assignee.email"));
    }
}

#[test]
fn test_root_identifier_short_circuits_selection() {
    let mut builder = todo_builder();
    builder.definition(
        "todo",
        "Todo",
        Multiplicity::Single,
        ClauseSpec::new().eq("id", "$id").eq("done", "$d"),
    );
    builder.query("one", Sla::default()).select("todo", 1);
    let model = builder.build().unwrap();
    let workload = search(&model);

    assert!(workload.is_empty());
    assert!(workload.plans().is_empty());
    assert_eq!(workload.direct_lookups()[0].label, "one/todo");
}

/// Only the first segment is inspected: `user.id` names the User's
/// identifier, reached through a relationship, and does not make the Todo
/// query a point lookup. Kept narrow deliberately.
#[test]
fn test_related_identifier_is_not_a_point_lookup() {
    let mut builder = todo_builder();
    let mut direct = builder.clone();
    builder.definition(
        "byUser",
        "Todo",
        Multiplicity::List,
        ClauseSpec::new().eq("user.id", "$uid"),
    );
    builder.query("q", Sla::default()).select("byUser", 10);
    let model = builder.build().unwrap();

    let clause = &model.definitions()[0].clause;
    assert!(!has_root_id(&model, clause));

    let workload = search(&model);
    assert!(workload.direct_lookups().is_empty());
    // {} and {user.id}
    assert_eq!(workload.indexes().len(), 2);

    direct.definition(
        "byId",
        "Todo",
        Multiplicity::Single,
        ClauseSpec::new().eq("id", "$id"),
    );
    let model = direct.build().unwrap();
    assert!(has_root_id(&model, &model.definitions()[0].clause));
}

#[test]
fn test_nested_selection_under_point_lookup_becomes_own_plan() {
    let mut builder = ModelBuilder::new();
    builder
        .entity("User")
        .id("id")
        .field(FieldSpec::new("todos", "Todo").list());
    builder
        .entity("Todo")
        .max_rows(1000)
        .id("id")
        .field(FieldSpec::new("done", "Boolean"));
    builder.definition(
        "user",
        "User",
        Multiplicity::Single,
        ClauseSpec::new().eq("id", "$id"),
    );
    builder.query("profile", Sla::default()).select_with_relations(
        "user",
        1,
        vec![RelationSpec::new("todos", ClauseSpec::new().eq("done", "$d"))],
    );
    let model = builder.build().unwrap();
    let workload = search(&model);

    assert_eq!(workload.direct_lookups()[0].label, "profile/user");
    assert_eq!(workload.plans().len(), 1);
    assert_eq!(workload.plans()[0].label, "profile/user.todos");
    // {} and {done}
    assert_eq!(workload.plans()[0].plans.len(), 2);
    assert!(workload.plans()[0].plans.iter().all(|p| p.children.is_empty()));
}

#[test]
fn test_sibling_relations_chain_as_requirements() {
    let mut builder = ModelBuilder::new();
    builder
        .entity("User")
        .id("id")
        .field(FieldSpec::new("org", "String"))
        .field(FieldSpec::new("todos", "Todo").list())
        .field(FieldSpec::new("notes", "Note").list());
    builder
        .entity("Todo")
        .id("id")
        .field(FieldSpec::new("done", "Boolean"));
    builder
        .entity("Note")
        .id("id")
        .field(FieldSpec::new("pinned", "Boolean"));
    builder.definition(
        "users",
        "User",
        Multiplicity::List,
        ClauseSpec::new().eq("org", "$o"),
    );
    builder.query("dashboard", Sla::default()).select_with_relations(
        "users",
        10,
        vec![
            RelationSpec::new("todos", ClauseSpec::new().eq("done", "$d")),
            RelationSpec::new("notes", ClauseSpec::new().eq("pinned", "$p")),
        ],
    );
    let model = builder.build().unwrap();
    let workload = search(&model);

    let root = &workload.plans()[0].plans;
    assert_eq!(root.len(), 2);
    for user_plan in root {
        assert_eq!(user_plan.children.len(), 2);
        for todo_plan in &user_plan.children {
            assert_eq!(todo_plan.children.len(), 2);
        }
    }
    // One coverage set per level, however often it repeats in the tree.
    assert_eq!(workload.sibling_sets().len(), 3);
    assert_eq!(workload.indexes().len(), 6);
}
