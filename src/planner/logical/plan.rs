//! Candidate index and plan tree types.

use crate::model::path::display_set;
use crate::model::{DomainModel, EntityId, OrderBy, PathSet, QueryId, SqlClause};
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Physical identity of a table: partition key, clustering key and root
/// entity. Nothing else participates in equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey {
    pub partition_key: PathSet,
    pub clustering_key: Vec<OrderBy>,
    pub root_entity: EntityId,
}

impl IndexKey {
    /// `Todo{user_id}[created_at DESC, id DESC]`
    pub fn describe(&self, model: &DomainModel) -> String {
        format!(
            "{}{}{}",
            model.entity(self.root_entity).name,
            display_set(&self.partition_key),
            display_order(&self.clustering_key)
        )
    }
}

fn display_order(order: &[OrderBy]) -> String {
    let terms: Vec<String> = order.iter().map(ToString::to_string).collect();
    format!("[{}]", terms.join(", "))
}

/// Position of a candidate in the workload arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexId(pub usize);

/// A candidate index for one query selection.
///
/// Equality and hashing are by [`IndexKey`] only: two candidates from
/// different queries with the same key describe the same physical table.
/// The query, clause, residual set and page size ride along for costing and
/// reporting.
#[derive(Debug, Clone)]
pub struct Index {
    pub key: IndexKey,
    pub query: QueryId,
    /// Predicates the key does not cover; must be filtered by scanning.
    pub remaining: PathSet,
    pub clause: Arc<SqlClause>,
    pub page_size: u32,
}

impl Index {
    pub fn partition_key(&self) -> &PathSet {
        &self.key.partition_key
    }

    pub fn clustering_key(&self) -> &[OrderBy] {
        &self.key.clustering_key
    }

    pub fn root_entity(&self) -> EntityId {
        self.key.root_entity
    }

    /// Partition key plus predicates promoted from the clustering prefix.
    pub fn effective_partition_key(&self) -> PathSet {
        self.clause
            .predicate_paths()
            .difference(&self.remaining)
            .cloned()
            .collect()
    }
}

impl PartialEq for Index {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Index {}

impl Hash for Index {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// A plan tree node. Siblings are interchangeable alternatives; children are
/// the alternatives for a nested selection that must also be satisfied.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub index: IndexId,
    pub children: Vec<Plan>,
}

impl Plan {
    pub fn leaf(index: IndexId) -> Self {
        Self {
            index,
            children: Vec::new(),
        }
    }
}

/// All alternatives for one query selection.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub query: QueryId,
    /// `query/definition` or `query/definition.relation` for nested levels.
    pub label: String,
    pub plans: Vec<Plan>,
}

/// A selection answered by reading the root entity by identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectLookup {
    pub query: QueryId,
    pub label: String,
}

/// Output of candidate generation: the candidate arena plus per-query trees.
#[derive(Debug, Clone, Default)]
pub struct Workload {
    pub(crate) indexes: Vec<Index>,
    pub(crate) plans: Vec<QueryPlan>,
    pub(crate) direct_lookups: Vec<DirectLookup>,
}

impl Workload {
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn index(&self, id: IndexId) -> &Index {
        &self.indexes[id.0]
    }

    pub fn index_ids(&self) -> impl Iterator<Item = IndexId> {
        (0..self.indexes.len()).map(IndexId)
    }

    pub fn plans(&self) -> &[QueryPlan] {
        &self.plans
    }

    /// Selections served by a primary-key lookup.
    pub fn direct_lookups(&self) -> &[DirectLookup] {
        &self.direct_lookups
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Candidates reachable from the plans of `query`.
    pub fn indexes_for(&self, query: QueryId) -> Vec<IndexId> {
        let mut ids = BTreeSet::new();
        for plan in self.plans.iter().filter(|p| p.query == query) {
            collect_ids(&plan.plans, &mut ids);
        }
        ids.into_iter().collect()
    }

    /// Every distinct set of sibling alternatives in every plan tree.
    ///
    /// At least one member of each set must be chosen. Identical sibling
    /// lists repeated under several parents are reported once.
    pub fn sibling_sets(&self) -> Vec<Vec<IndexId>> {
        let mut seen = BTreeSet::new();
        let mut sets = Vec::new();
        for query_plan in &self.plans {
            collect_sibling_sets(&query_plan.plans, &mut seen, &mut sets);
        }
        sets
    }
}

fn collect_ids(plans: &[Plan], out: &mut BTreeSet<IndexId>) {
    for plan in plans {
        out.insert(plan.index);
        collect_ids(&plan.children, out);
    }
}

fn collect_sibling_sets(
    plans: &[Plan],
    seen: &mut BTreeSet<Vec<IndexId>>,
    out: &mut Vec<Vec<IndexId>>,
) {
    if plans.is_empty() {
        return;
    }

    let mut ids: Vec<IndexId> = plans.iter().map(|p| p.index).collect();
    ids.sort();
    if seen.insert(ids.clone()) {
        out.push(ids);
    }

    for plan in plans {
        collect_sibling_sets(&plan.children, seen, out);
    }
}
