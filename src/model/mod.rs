//! Resolved domain model consumed by the planner.
//!
//! The model is an arena: entities, query definitions, queries and mutations
//! live in flat vectors and refer to each other through typed ids. It is
//! built once (usually through [`ModelBuilder`]) and never mutated while a
//! planning run is in progress.

pub mod builder;
pub mod entity;
pub mod path;
pub mod query;
pub mod selectivity;

pub use builder::{
    ClauseSpec, EntitySpec, FieldSpec, ModelBuilder, MutationSpec, QuerySpec, RelationSpec,
};
pub use entity::{Entity, EntityId, Field, Multiplicity, TypeDef, ID_TYPE};
pub use path::{FieldPath, PathSet};
pub use query::{
    Conjunction, DefinitionId, Direction, Mutation, MutationKind, MutationSla, OrderBy, Query,
    QueryDefinition, QueryDefinitionSelection, QueryId, RelationSelection, Sla, SqlClause,
};
pub use selectivity::{Distribution, Selectivity, UniformDistribution};

use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while resolving or consulting the domain model.
///
/// All of these mean the model is structurally unusable for planning.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Unknown field '{field}' on entity {entity}")]
    UnknownField { entity: String, field: String },

    #[error("Unknown query definition: {0}")]
    UnknownDefinition(String),

    #[error("Entity {entity} has already been declared")]
    DuplicateEntity { entity: String },

    #[error("Field {field} is declared twice on entity {entity}")]
    DuplicateField { entity: String, field: String },

    #[error("Query definition {0} has already been declared")]
    DuplicateDefinition(String),

    #[error("Entity {entity} must hold at least one row")]
    ZeroMaxRows { entity: String },

    #[error("Selection {selection} of query {query} has a page size of 0")]
    ZeroPageSize { query: String, selection: String },

    #[error("Entity {entity} must have exactly one ID field (found {count})")]
    MissingIdentifier { entity: String, count: usize },

    #[error("Field {entity}.{field} has unresolved type '{type_name}'")]
    UnresolvedType {
        entity: String,
        field: String,
        type_name: String,
    },

    #[error("Field {entity}.{field} is not a relationship and cannot be traversed")]
    NotARelationship { entity: String, field: String },

    #[error("Empty field path on entity {entity}")]
    EmptyPath { entity: String },

    #[error("No selectivity statistic on {entity} for {paths}")]
    MissingSelectivity { entity: String, paths: String },
}

pub type ModelResult<T> = Result<T, ModelError>;

/// The fully resolved, read-only input graph.
#[derive(Debug, Clone, Default)]
pub struct DomainModel {
    pub(crate) entities: Vec<Entity>,
    pub(crate) entity_index: HashMap<String, EntityId>,
    pub(crate) definitions: Vec<QueryDefinition>,
    pub(crate) queries: Vec<Query>,
    pub(crate) mutations: Vec<Mutation>,
}

impl DomainModel {
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn entity_id(&self, name: &str) -> Option<EntityId> {
        self.entity_index.get(name).copied()
    }

    pub fn entity_by_name(&self, name: &str) -> ModelResult<&Entity> {
        self.entity_id(name)
            .map(|id| self.entity(id))
            .ok_or_else(|| ModelError::UnknownEntity(name.to_string()))
    }

    pub fn definitions(&self) -> &[QueryDefinition] {
        &self.definitions
    }

    pub fn definition(&self, id: DefinitionId) -> &QueryDefinition {
        &self.definitions[id.0]
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn query(&self, id: QueryId) -> &Query {
        &self.queries[id.0]
    }

    pub fn query_ids(&self) -> impl Iterator<Item = QueryId> + '_ {
        (0..self.queries.len()).map(QueryId)
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Resolve a dotted path such as `user.name` starting at `root`.
    ///
    /// Every segment but the last must be a relationship field. Sargability
    /// is derived here and carried on the returned path.
    pub fn resolve_path(&self, root: EntityId, dotted: &str) -> ModelResult<FieldPath> {
        let segments: Vec<&str> = dotted
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            return Err(ModelError::EmptyPath {
                entity: self.entity(root).name.clone(),
            });
        }

        let mut current = self.entity(root);
        let mut sargable = true;
        let last = segments.len() - 1;

        for (i, segment) in segments.iter().enumerate() {
            let field = current
                .field(segment)
                .ok_or_else(|| ModelError::UnknownField {
                    entity: current.name.clone(),
                    field: segment.to_string(),
                })?;

            if i == last {
                break;
            }

            if !(field.immutable && field.type_def.non_null) {
                sargable = false;
            }
            let next = field
                .type_def
                .entity
                .ok_or_else(|| ModelError::NotARelationship {
                    entity: current.name.clone(),
                    field: field.name.clone(),
                })?;
            current = self.entity(next);
        }

        Ok(FieldPath::new(
            root,
            segments.into_iter().map(String::from).collect(),
            sargable,
        ))
    }

    /// The single-segment path to an entity's identifier field.
    pub fn id_path(&self, entity: EntityId) -> ModelResult<FieldPath> {
        let e = self.entity(entity);
        let id = e.id_field()?;
        Ok(FieldPath::new(entity, vec![id.name.clone()], true))
    }

    /// The first field a path walks through, looked up on its root entity.
    pub fn first_field(&self, path: &FieldPath) -> Option<&Field> {
        path.segments()
            .first()
            .and_then(|name| self.entity(path.root()).field(name))
    }

    /// Look up the selectivity statistic for an exact path set.
    pub fn selectivity(&self, entity: EntityId, paths: &PathSet) -> ModelResult<&Selectivity> {
        let e = self.entity(entity);
        e.selectivity
            .get(paths)
            .ok_or_else(|| ModelError::MissingSelectivity {
                entity: e.name.clone(),
                paths: path::display_set(paths),
            })
    }

    /// Every clause rooted at `entity`, including nested relation clauses.
    pub fn clauses_rooted_at(&self, entity: EntityId) -> Vec<&SqlClause> {
        fn walk<'m>(
            relations: &'m [RelationSelection],
            entity: EntityId,
            out: &mut Vec<&'m SqlClause>,
        ) {
            for relation in relations {
                if relation.clause.root_entity == entity {
                    out.push(&relation.clause);
                }
                walk(&relation.relations, entity, out);
            }
        }

        let mut clauses = Vec::new();
        for query in &self.queries {
            for selection in &query.selections {
                let clause = &self.definition(selection.definition).clause;
                if clause.root_entity == entity {
                    clauses.push(clause);
                }
                walk(&selection.relations, entity, &mut clauses);
            }
        }
        clauses
    }
}
