//! Resolution of builder declarations into a DomainModel.

use tablesmith::model::{
    ClauseSpec, Direction, FieldSpec, ModelBuilder, ModelError, Multiplicity, MutationKind,
    MutationSpec, PathSet, RelationSpec, Sla,
};

fn base() -> ModelBuilder {
    let mut builder = ModelBuilder::new();
    builder
        .entity("User")
        .max_rows(50)
        .id("id")
        .field(FieldSpec::new("name", "String"))
        .field(FieldSpec::new("todos", "Todo").list());
    builder
        .entity("Todo")
        .max_rows(1000)
        .id("id")
        .field(FieldSpec::new("user", "User"))
        .field(FieldSpec::new("done", "Boolean"))
        .selectivity(&["done"], 2)
        .selectivity(&["user.name", "done"], 90);
    builder
}

#[test]
fn test_forward_references_resolve() {
    // User refers to Todo before Todo is declared.
    let model = base().build().unwrap();
    let user = model.entity_by_name("User").unwrap();
    let todos = user.field("todos").unwrap();

    assert!(todos.is_relationship());
    assert_eq!(todos.type_def.entity, model.entity_id("Todo"));
    assert_eq!(todos.type_def.multiplicity, Multiplicity::List);
}

#[test]
fn test_selectivity_keyed_by_resolved_paths() {
    let model = base().build().unwrap();
    let todo = model.entity_id("Todo").unwrap();

    let paths: PathSet = ["done", "user.name"]
        .iter()
        .map(|p| model.resolve_path(todo, p).unwrap())
        .collect();
    assert_eq!(model.selectivity(todo, &paths).unwrap().distinct, 90);
}

#[test]
fn test_missing_selectivity_names_paths() {
    let model = base().build().unwrap();
    let todo = model.entity_id("Todo").unwrap();
    let paths: PathSet = [model.resolve_path(todo, "user").unwrap()].into_iter().collect();

    let err = model.selectivity(todo, &paths).unwrap_err();
    assert_eq!(
        err,
        ModelError::MissingSelectivity {
            entity: "Todo".to_string(),
            paths: "{user}".to_string(),
        }
    );
}

#[test]
fn test_selectivity_on_unknown_path_rejected() {
    let mut builder = base();
    builder
        .entity("Tag")
        .id("id")
        .selectivity(&["label"], 10);

    assert!(matches!(
        builder.build().unwrap_err(),
        ModelError::UnknownField { ref field, .. } if field == "label"
    ));
}

#[test]
fn test_traversing_scalar_rejected() {
    let mut builder = base();
    builder.definition(
        "bad",
        "Todo",
        Multiplicity::List,
        ClauseSpec::new().eq("done.value", "$v"),
    );

    assert!(matches!(
        builder.build().unwrap_err(),
        ModelError::NotARelationship { ref field, .. } if field == "done"
    ));
}

#[test]
fn test_unknown_definition_rejected() {
    let mut builder = base();
    builder.query("q", Sla::default()).select("missing", 10);

    assert_eq!(
        builder.build().unwrap_err(),
        ModelError::UnknownDefinition("missing".to_string())
    );
}

#[test]
fn test_relation_clause_rooted_at_target() {
    let mut builder = base();
    builder.definition(
        "users",
        "User",
        Multiplicity::List,
        ClauseSpec::new().eq("name", "$n"),
    );
    builder.query("q", Sla::default()).select_with_relations(
        "users",
        10,
        vec![RelationSpec::new(
            "todos",
            ClauseSpec::new()
                .eq("done", "$d")
                .order_by("id", Direction::Desc),
        )
        .page_size(25)],
    );
    let model = builder.build().unwrap();

    let relation = &model.queries()[0].selections[0].relations[0];
    assert_eq!(relation.field, "todos");
    assert_eq!(relation.page_size, 25);
    assert_eq!(Some(relation.clause.root_entity), model.entity_id("Todo"));
    assert_eq!(relation.clause.to_string(), "where done = $d order by id DESC");

    let todo = model.entity_id("Todo").unwrap();
    assert_eq!(model.clauses_rooted_at(todo).len(), 1);
}

#[test]
fn test_relation_through_scalar_rejected() {
    let mut builder = base();
    builder.definition("users", "User", Multiplicity::List, ClauseSpec::new());
    builder.query("q", Sla::default()).select_with_relations(
        "users",
        10,
        vec![RelationSpec::new("name", ClauseSpec::new())],
    );

    assert!(matches!(
        builder.build().unwrap_err(),
        ModelError::NotARelationship { .. }
    ));
}

#[test]
fn test_mutation_filter_resolved() {
    let mut builder = base();
    builder.mutation(
        MutationSpec::new("closeTodos", "Todo", MutationKind::Update, 3)
            .filter(ClauseSpec::new().eq("user.name", "$n")),
    );
    builder.mutation(MutationSpec::insert("addTodo", "Todo", 2));
    let model = builder.build().unwrap();

    let update = &model.mutations()[0];
    assert_eq!(update.kind, MutationKind::Update);
    assert_eq!(update.sla.max_tables, 3);
    let filter = update.filter.as_ref().unwrap();
    assert_eq!(filter.conjunctions[0].path.to_string(), "user.name");

    assert!(model.mutations()[1].filter.is_none());
}

#[test]
fn test_mutation_filter_on_unknown_field_rejected() {
    let mut builder = base();
    builder.mutation(
        MutationSpec::new("purge", "Todo", MutationKind::Delete, 1)
            .filter(ClauseSpec::new().eq("archived", "true")),
    );

    assert!(matches!(
        builder.build().unwrap_err(),
        ModelError::UnknownField { .. }
    ));
}

#[test]
fn test_sla_defaults() {
    let sla = Sla::default();
    assert_eq!(sla.throughput_per_second, 1);
    assert_eq!(sla.latency_ms, 10_000);
}

#[test]
fn test_empty_entity_rejected() {
    let mut builder = base();
    builder.entity("Archive").max_rows(0).id("id");

    assert_eq!(
        builder.build().unwrap_err(),
        ModelError::ZeroMaxRows {
            entity: "Archive".to_string(),
        }
    );
}

#[test]
fn test_zero_page_size_rejected() {
    let mut builder = base();
    builder.definition(
        "todos",
        "Todo",
        Multiplicity::List,
        ClauseSpec::new().eq("done", "$d"),
    );
    builder.query("q", Sla::default()).select("todos", 0);

    assert_eq!(
        builder.build().unwrap_err(),
        ModelError::ZeroPageSize {
            query: "q".to_string(),
            selection: "todos".to_string(),
        }
    );
}

#[test]
fn test_zero_relation_page_size_rejected() {
    let mut builder = base();
    builder.definition("users", "User", Multiplicity::List, ClauseSpec::new());
    builder.query("q", Sla::default()).select_with_relations(
        "users",
        10,
        vec![RelationSpec::new("todos", ClauseSpec::new()).page_size(0)],
    );

    assert_eq!(
        builder.build().unwrap_err(),
        ModelError::ZeroPageSize {
            query: "q".to_string(),
            selection: "users.todos".to_string(),
        }
    );
}

#[test]
fn test_duplicate_field_rejected() {
    let mut builder = base();
    builder
        .entity("Tag")
        .id("id")
        .field(FieldSpec::new("label", "String"))
        .field(FieldSpec::new("label", "Int"));

    assert_eq!(
        builder.build().unwrap_err(),
        ModelError::DuplicateField {
            entity: "Tag".to_string(),
            field: "label".to_string(),
        }
    );
}

#[test]
fn test_duplicate_definition_rejected() {
    let mut builder = base();
    builder.definition("todos", "Todo", Multiplicity::List, ClauseSpec::new());
    builder.definition(
        "todos",
        "Todo",
        Multiplicity::List,
        ClauseSpec::new().eq("done", "$d"),
    );

    assert_eq!(
        builder.build().unwrap_err(),
        ModelError::DuplicateDefinition("todos".to_string())
    );
}
