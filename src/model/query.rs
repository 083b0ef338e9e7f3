//! Queries, clauses, SLAs and mutations.

use crate::model::entity::{EntityId, TypeDef};
use crate::model::path::{FieldPath, PathSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefinitionId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(pub usize);

/// Sort direction. `Any` accepts either physical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Asc,
    Desc,
    Any,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
            Direction::Any => write!(f, "ANY"),
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderBy {
    pub path: FieldPath,
    pub direction: Direction,
}

impl OrderBy {
    pub fn new(path: FieldPath, direction: Direction) -> Self {
        Self { path, direction }
    }

    /// Does this physical term deliver the `requested` order?
    pub fn satisfies(&self, requested: &OrderBy) -> bool {
        self.path == requested.path
            && (requested.direction == Direction::Any
                || self.direction == Direction::Any
                || self.direction == requested.direction)
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.direction)
    }
}

/// An equality predicate `path = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Conjunction {
    pub path: FieldPath,
    /// The bound value, usually a variable reference such as `$user_id`.
    pub value: String,
}

/// A conjunctive WHERE clause with an optional ORDER BY.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlClause {
    pub root_entity: EntityId,
    pub conjunctions: Vec<Conjunction>,
    pub order_by: Vec<OrderBy>,
}

impl SqlClause {
    /// All predicate paths.
    pub fn predicate_paths(&self) -> PathSet {
        self.conjunctions.iter().map(|c| c.path.clone()).collect()
    }

    /// Predicate paths that may be embedded in a key.
    pub fn sargable_paths(&self) -> PathSet {
        self.conjunctions
            .iter()
            .filter(|c| c.path.is_sargable())
            .map(|c| c.path.clone())
            .collect()
    }
}

impl fmt::Display for SqlClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preds: Vec<String> = self
            .conjunctions
            .iter()
            .map(|c| format!("{} = {}", c.path, c.value))
            .collect();
        write!(f, "where {}", preds.join(" AND "))?;
        if !self.order_by.is_empty() {
            let orders: Vec<String> = self.order_by.iter().map(ToString::to_string).collect();
            write!(f, " order by {}", orders.join(", "))?;
        }
        Ok(())
    }
}

/// An abstract root query shape.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDefinition {
    pub name: String,
    pub return_type: TypeDef,
    pub clause: SqlClause,
}

/// Per-query service level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sla {
    pub throughput_per_second: u32,
    pub latency_ms: u32,
}

impl Sla {
    pub fn new(throughput_per_second: u32, latency_ms: u32) -> Self {
        Self {
            throughput_per_second,
            latency_ms,
        }
    }
}

impl Default for Sla {
    fn default() -> Self {
        Self {
            throughput_per_second: 1,
            latency_ms: 10_000,
        }
    }
}

/// A nested selection through a relationship field.
///
/// The clause is rooted at the field's target entity and must be satisfied
/// by its own index, independent of how the parent rows were found.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSelection {
    pub field: String,
    pub clause: SqlClause,
    pub page_size: u32,
    pub relations: Vec<RelationSelection>,
}

/// A query's use of a root definition.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDefinitionSelection {
    pub definition: DefinitionId,
    pub page_size: u32,
    pub relations: Vec<RelationSelection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub name: String,
    pub sla: Sla,
    pub selections: Vec<QueryDefinitionSelection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

/// Write-fanout bound for a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationSla {
    pub max_tables: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub name: String,
    pub entity: EntityId,
    pub kind: MutationKind,
    pub sla: MutationSla,
    /// Row filter for UPDATE and DELETE.
    pub filter: Option<SqlClause>,
}
