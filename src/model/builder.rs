//! Programmatic construction of a resolved [`DomainModel`].
//!
//! Front ends describe entities, definitions, queries and mutations by name;
//! [`ModelBuilder::build`] resolves every name into the arena, derives path
//! sargability and rejects models that cannot be planned.
//!
//! ```
//! use tablesmith::model::{ClauseSpec, FieldSpec, ModelBuilder, Multiplicity, Sla};
//!
//! let mut builder = ModelBuilder::new();
//! builder
//!     .entity("Todo")
//!     .max_rows(1000)
//!     .id("id")
//!     .field(FieldSpec::new("user_id", "String"))
//!     .field(FieldSpec::new("done", "Boolean"))
//!     .selectivity(&["done"], 2);
//! builder.definition(
//!     "todos",
//!     "Todo",
//!     Multiplicity::List,
//!     ClauseSpec::new().eq("user_id", "$u").eq("done", "$d"),
//! );
//! builder.query("userTodos", Sla::new(5, 1000)).select("todos", 10);
//!
//! let model = builder.build().unwrap();
//! assert_eq!(model.queries().len(), 1);
//! ```

use crate::model::entity::{Entity, EntityId, Field, Multiplicity, TypeDef, ID_TYPE};
use crate::model::query::{
    Conjunction, DefinitionId, Direction, Mutation, MutationKind, MutationSla, OrderBy, Query,
    QueryDefinition, QueryDefinitionSelection, RelationSelection, Sla, SqlClause,
};
use crate::model::selectivity::Selectivity;
use crate::model::{DomainModel, ModelError, ModelResult, PathSet};
use std::collections::{BTreeMap, HashMap};

/// Scalar type names understood without an entity declaration.
pub const SCALAR_TYPES: &[&str] = &[
    ID_TYPE, "String", "Int", "Long", "Float", "Boolean", "Date", "DateTime",
];

const DEFAULT_MAX_ROWS: u64 = 999_999_999;
const DEFAULT_PAGE_SIZE: u32 = 10;

/// Field declaration. Fields are immutable, non-null and single-valued
/// unless told otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    name: String,
    type_name: String,
    multiplicity: Multiplicity,
    non_null: bool,
    immutable: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            multiplicity: Multiplicity::Single,
            non_null: true,
            immutable: true,
        }
    }

    pub fn id(name: impl Into<String>) -> Self {
        Self::new(name, ID_TYPE)
    }

    pub fn nullable(mut self) -> Self {
        self.non_null = false;
        self
    }

    pub fn mutable(mut self) -> Self {
        self.immutable = false;
        self
    }

    pub fn list(mut self) -> Self {
        self.multiplicity = Multiplicity::List;
        self
    }
}

#[derive(Debug, Clone)]
struct SelectivitySpec {
    paths: Vec<String>,
    selectivity: Selectivity,
}

/// Entity declaration.
#[derive(Debug, Clone)]
pub struct EntitySpec {
    name: String,
    max_rows: u64,
    fields: Vec<FieldSpec>,
    selectivity: Vec<SelectivitySpec>,
}

impl EntitySpec {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_rows: DEFAULT_MAX_ROWS,
            fields: Vec::new(),
            selectivity: Vec::new(),
        }
    }

    pub fn max_rows(&mut self, max_rows: u64) -> &mut Self {
        self.max_rows = max_rows;
        self
    }

    pub fn id(&mut self, name: &str) -> &mut Self {
        self.field(FieldSpec::id(name))
    }

    pub fn field(&mut self, field: FieldSpec) -> &mut Self {
        self.fields.push(field);
        self
    }

    /// Uniform selectivity for the exact set of dotted `paths`.
    pub fn selectivity(&mut self, paths: &[&str], distinct: u64) -> &mut Self {
        self.selectivity_with(paths, Selectivity::uniform(distinct))
    }

    pub fn selectivity_with(&mut self, paths: &[&str], selectivity: Selectivity) -> &mut Self {
        self.selectivity.push(SelectivitySpec {
            paths: paths.iter().map(|p| p.to_string()).collect(),
            selectivity,
        });
        self
    }
}

/// Unresolved WHERE / ORDER BY clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClauseSpec {
    conjunctions: Vec<(String, String)>,
    order_by: Vec<(String, Direction)>,
}

impl ClauseSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.conjunctions.push((path.into(), value.into()));
        self
    }

    pub fn order_by(mut self, path: impl Into<String>, direction: Direction) -> Self {
        self.order_by.push((path.into(), direction));
        self
    }
}

/// Nested selection through a relationship field.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSpec {
    field: String,
    clause: ClauseSpec,
    page_size: u32,
    relations: Vec<RelationSpec>,
}

impl RelationSpec {
    pub fn new(field: impl Into<String>, clause: ClauseSpec) -> Self {
        Self {
            field: field.into(),
            clause,
            page_size: DEFAULT_PAGE_SIZE,
            relations: Vec::new(),
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn relation(mut self, relation: RelationSpec) -> Self {
        self.relations.push(relation);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
struct SelectionSpec {
    definition: String,
    page_size: u32,
    relations: Vec<RelationSpec>,
}

/// Query declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    name: String,
    sla: Sla,
    selections: Vec<SelectionSpec>,
}

impl QuerySpec {
    pub fn select(&mut self, definition: &str, page_size: u32) -> &mut Self {
        self.select_with_relations(definition, page_size, Vec::new())
    }

    pub fn select_with_relations(
        &mut self,
        definition: &str,
        page_size: u32,
        relations: Vec<RelationSpec>,
    ) -> &mut Self {
        self.selections.push(SelectionSpec {
            definition: definition.to_string(),
            page_size,
            relations,
        });
        self
    }
}

/// Mutation declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationSpec {
    name: String,
    entity: String,
    kind: MutationKind,
    max_tables: u32,
    filter: Option<ClauseSpec>,
}

impl MutationSpec {
    pub fn new(
        name: impl Into<String>,
        entity: impl Into<String>,
        kind: MutationKind,
        max_tables: u32,
    ) -> Self {
        Self {
            name: name.into(),
            entity: entity.into(),
            kind,
            max_tables,
            filter: None,
        }
    }

    pub fn insert(name: impl Into<String>, entity: impl Into<String>, max_tables: u32) -> Self {
        Self::new(name, entity, MutationKind::Insert, max_tables)
    }

    pub fn filter(mut self, clause: ClauseSpec) -> Self {
        self.filter = Some(clause);
        self
    }
}

/// Collects declarations and resolves them into a [`DomainModel`].
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    entities: Vec<EntitySpec>,
    definitions: Vec<(String, String, Multiplicity, ClauseSpec)>,
    queries: Vec<QuerySpec>,
    mutations: Vec<MutationSpec>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(&mut self, name: &str) -> &mut EntitySpec {
        self.entities.push(EntitySpec::new(name));
        let last = self.entities.len() - 1;
        &mut self.entities[last]
    }

    pub fn definition(
        &mut self,
        name: &str,
        entity: &str,
        multiplicity: Multiplicity,
        clause: ClauseSpec,
    ) -> &mut Self {
        self.definitions.push((
            name.to_string(),
            entity.to_string(),
            multiplicity,
            clause,
        ));
        self
    }

    pub fn query(&mut self, name: &str, sla: Sla) -> &mut QuerySpec {
        self.queries.push(QuerySpec {
            name: name.to_string(),
            sla,
            selections: Vec::new(),
        });
        let last = self.queries.len() - 1;
        &mut self.queries[last]
    }

    pub fn mutation(&mut self, mutation: MutationSpec) -> &mut Self {
        self.mutations.push(mutation);
        self
    }

    /// Resolve all declarations.
    pub fn build(self) -> ModelResult<DomainModel> {
        let mut model = DomainModel::default();

        for (i, spec) in self.entities.iter().enumerate() {
            if model
                .entity_index
                .insert(spec.name.clone(), EntityId(i))
                .is_some()
            {
                return Err(ModelError::DuplicateEntity {
                    entity: spec.name.clone(),
                });
            }
        }

        for (i, spec) in self.entities.iter().enumerate() {
            if spec.max_rows == 0 {
                return Err(ModelError::ZeroMaxRows {
                    entity: spec.name.clone(),
                });
            }

            let mut fields = BTreeMap::new();
            for field in &spec.fields {
                let type_def = resolve_type(&model.entity_index, spec, field)?;
                let previous = fields.insert(
                    field.name.clone(),
                    Field {
                        name: field.name.clone(),
                        type_def,
                        immutable: field.immutable,
                    },
                );
                if previous.is_some() {
                    return Err(ModelError::DuplicateField {
                        entity: spec.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }
            let entity = Entity {
                id: EntityId(i),
                name: spec.name.clone(),
                fields,
                max_rows: spec.max_rows,
                selectivity: BTreeMap::new(),
            };
            entity.id_field()?;
            model.entities.push(entity);
        }

        // Statistics refer to paths, which need every entity in place first.
        for (i, spec) in self.entities.iter().enumerate() {
            let mut resolved = Vec::with_capacity(spec.selectivity.len());
            for stat in &spec.selectivity {
                let paths = stat
                    .paths
                    .iter()
                    .map(|p| model.resolve_path(EntityId(i), p))
                    .collect::<ModelResult<PathSet>>()?;
                resolved.push((paths, stat.selectivity.clone()));
            }
            model.entities[i].selectivity.extend(resolved);
        }

        let mut definition_index: HashMap<String, DefinitionId> = HashMap::new();
        for (name, entity, multiplicity, clause) in &self.definitions {
            let root = model
                .entity_id(entity)
                .ok_or_else(|| ModelError::UnknownEntity(entity.clone()))?;
            let clause = resolve_clause(&model, root, clause)?;
            if definition_index
                .insert(name.clone(), DefinitionId(model.definitions.len()))
                .is_some()
            {
                return Err(ModelError::DuplicateDefinition(name.clone()));
            }
            model.definitions.push(QueryDefinition {
                name: name.clone(),
                return_type: TypeDef {
                    type_name: entity.clone(),
                    entity: Some(root),
                    multiplicity: *multiplicity,
                    non_null: true,
                },
                clause,
            });
        }

        for spec in &self.queries {
            let mut selections = Vec::with_capacity(spec.selections.len());
            for selection in &spec.selections {
                let definition = *definition_index
                    .get(&selection.definition)
                    .ok_or_else(|| ModelError::UnknownDefinition(selection.definition.clone()))?;
                check_page_size(&spec.name, &selection.definition, selection.page_size)?;
                let root = model.definition(definition).clause.root_entity;
                selections.push(QueryDefinitionSelection {
                    definition,
                    page_size: selection.page_size,
                    relations: resolve_relations(
                        &model,
                        &spec.name,
                        &selection.definition,
                        root,
                        &selection.relations,
                    )?,
                });
            }
            model.queries.push(Query {
                name: spec.name.clone(),
                sla: spec.sla,
                selections,
            });
        }

        for spec in &self.mutations {
            let entity = model
                .entity_id(&spec.entity)
                .ok_or_else(|| ModelError::UnknownEntity(spec.entity.clone()))?;
            let filter = spec
                .filter
                .as_ref()
                .map(|clause| resolve_clause(&model, entity, clause))
                .transpose()?;
            model.mutations.push(Mutation {
                name: spec.name.clone(),
                entity,
                kind: spec.kind,
                sla: MutationSla {
                    max_tables: spec.max_tables,
                },
                filter,
            });
        }

        Ok(model)
    }
}

fn resolve_type(
    entity_index: &HashMap<String, EntityId>,
    owner: &EntitySpec,
    field: &FieldSpec,
) -> ModelResult<TypeDef> {
    let entity = if SCALAR_TYPES.contains(&field.type_name.as_str()) {
        None
    } else {
        let id = entity_index
            .get(&field.type_name)
            .ok_or_else(|| ModelError::UnresolvedType {
                entity: owner.name.clone(),
                field: field.name.clone(),
                type_name: field.type_name.clone(),
            })?;
        Some(*id)
    };

    Ok(TypeDef {
        type_name: field.type_name.clone(),
        entity,
        multiplicity: field.multiplicity,
        non_null: field.non_null,
    })
}

fn resolve_clause(model: &DomainModel, root: EntityId, spec: &ClauseSpec) -> ModelResult<SqlClause> {
    let conjunctions = spec
        .conjunctions
        .iter()
        .map(|(path, value)| {
            Ok(Conjunction {
                path: model.resolve_path(root, path)?,
                value: value.clone(),
            })
        })
        .collect::<ModelResult<Vec<_>>>()?;

    let order_by = spec
        .order_by
        .iter()
        .map(|(path, direction)| Ok(OrderBy::new(model.resolve_path(root, path)?, *direction)))
        .collect::<ModelResult<Vec<_>>>()?;

    Ok(SqlClause {
        root_entity: root,
        conjunctions,
        order_by,
    })
}

fn check_page_size(query: &str, selection: &str, page_size: u32) -> ModelResult<()> {
    if page_size == 0 {
        return Err(ModelError::ZeroPageSize {
            query: query.to_string(),
            selection: selection.to_string(),
        });
    }
    Ok(())
}

/// `selection` names the parent, e.g. `users.todos`, for error reporting.
fn resolve_relations(
    model: &DomainModel,
    query: &str,
    selection: &str,
    parent: EntityId,
    specs: &[RelationSpec],
) -> ModelResult<Vec<RelationSelection>> {
    specs
        .iter()
        .map(|spec| {
            let nested = format!("{}.{}", selection, spec.field);
            check_page_size(query, &nested, spec.page_size)?;
            let owner = model.entity(parent);
            let field = owner
                .field(&spec.field)
                .ok_or_else(|| ModelError::UnknownField {
                    entity: owner.name.clone(),
                    field: spec.field.clone(),
                })?;
            let target = field
                .type_def
                .entity
                .ok_or_else(|| ModelError::NotARelationship {
                    entity: owner.name.clone(),
                    field: spec.field.clone(),
                })?;

            Ok(RelationSelection {
                field: spec.field.clone(),
                clause: resolve_clause(model, target, &spec.clause)?,
                page_size: spec.page_size,
                relations: resolve_relations(model, query, &nested, target, &spec.relations)?,
            })
        })
        .collect()
}
