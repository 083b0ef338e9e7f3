//! Enumerate candidate indexes and assemble plan trees.

use crate::model::{
    DomainModel, Direction, EntityId, FieldPath, OrderBy, PathSet, QueryId, RelationSelection,
    SqlClause, ID_TYPE,
};
use crate::planner::cost::CostModel;
use crate::planner::logical::{
    DirectLookup, Index, IndexId, IndexKey, Plan, QueryPlan, Workload,
};
use crate::planner::{PlanError, PlanResult};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// Every subset of `sargable`, smallest first, including the empty set.
pub fn partition_key_subsets(sargable: &PathSet) -> Vec<PathSet> {
    let paths: Vec<&FieldPath> = sargable.iter().collect();
    let mut subsets = Vec::with_capacity(1usize << paths.len().min(20));
    for size in 0..=paths.len() {
        let mut current = Vec::with_capacity(size);
        subsets_helper(&paths, size, 0, &mut current, &mut subsets);
    }
    subsets
}

fn subsets_helper<'p>(
    paths: &[&'p FieldPath],
    size: usize,
    start: usize,
    current: &mut Vec<&'p FieldPath>,
    result: &mut Vec<PathSet>,
) {
    if current.len() == size {
        result.push(current.iter().map(|p| (*p).clone()).collect());
        return;
    }

    for i in start..paths.len() {
        current.push(paths[i]);
        subsets_helper(paths, size, i + 1, current, result);
        current.pop();
    }
}

/// Clustering keys available to tables rooted at `entity`.
///
/// Every sargable prefix of every ORDER BY declared against the entity,
/// terminated by the identifier so rows are totally ordered. With no usable
/// ORDER BY the only clustering key is the identifier alone.
pub fn clustering_keys(model: &DomainModel, entity: EntityId) -> PlanResult<Vec<Vec<OrderBy>>> {
    let id = OrderBy::new(model.id_path(entity)?, Direction::Desc);
    let mut keys = BTreeSet::new();

    for clause in model.clauses_rooted_at(entity) {
        let mut prefix = Vec::with_capacity(clause.order_by.len() + 1);
        for term in &clause.order_by {
            if !term.path.is_sargable() {
                break;
            }
            prefix.push(term.clone());

            let mut key = prefix.clone();
            if !key.iter().any(|o| o.path == id.path) {
                key.push(id.clone());
            }
            keys.insert(key);
        }
    }

    if keys.is_empty() {
        keys.insert(vec![id]);
    }
    Ok(keys.into_iter().collect())
}

/// Move residual predicates that lead the clustering key into the key.
///
/// Stops at the first clustering term that is not residual, since only a
/// contiguous prefix can narrow the scan.
pub fn promote_clustering_prefix(remaining: &mut PathSet, clustering_key: &[OrderBy]) {
    for term in clustering_key {
        if !remaining.remove(&term.path) {
            break;
        }
    }
}

/// True when a conjunction's first segment is the root entity's identifier.
///
/// Only the first segment is inspected: an identifier reached through a
/// relationship does not make the query a point lookup.
pub fn has_root_id(model: &DomainModel, clause: &SqlClause) -> bool {
    clause.conjunctions.iter().any(|c| {
        model
            .first_field(&c.path)
            .is_some_and(|f| f.type_def.type_name == ID_TYPE)
    })
}

/// One level of required alternatives.
struct Level {
    label: String,
    alternatives: Vec<IndexId>,
}

pub(crate) struct WorkloadBuilder<'a> {
    model: &'a DomainModel,
    cost: &'a CostModel<'a>,
    prune_over_latency: bool,
    clustering: HashMap<EntityId, Vec<Vec<OrderBy>>>,
    workload: Workload,
}

impl<'a> WorkloadBuilder<'a> {
    pub(crate) fn new(
        model: &'a DomainModel,
        cost: &'a CostModel<'a>,
        prune_over_latency: bool,
    ) -> Self {
        Self {
            model,
            cost,
            prune_over_latency,
            clustering: HashMap::new(),
            workload: Workload::default(),
        }
    }

    pub(crate) fn build(mut self) -> PlanResult<Workload> {
        let model = self.model;
        for query_id in model.query_ids() {
            let query = model.query(query_id);
            for selection in &query.selections {
                let definition = model.definition(selection.definition);
                let label = format!("{}/{}", query.name, definition.name);

                let mut levels = Vec::new();
                self.plan_level(
                    query_id,
                    &label,
                    &definition.clause,
                    selection.page_size,
                    &selection.relations,
                    &mut levels,
                )?;

                if let Some((label, plans)) = assemble(&levels) {
                    self.workload.plans.push(QueryPlan {
                        query: query_id,
                        label,
                        plans,
                    });
                }
            }
        }

        debug!(
            candidates = self.workload.indexes.len(),
            query_plans = self.workload.plans.len(),
            direct_lookups = self.workload.direct_lookups.len(),
            "candidate generation finished"
        );
        Ok(self.workload)
    }

    /// Generate this clause's level and, depth first, its nested levels.
    fn plan_level(
        &mut self,
        query: QueryId,
        label: &str,
        clause: &SqlClause,
        page_size: u32,
        relations: &[RelationSelection],
        levels: &mut Vec<Level>,
    ) -> PlanResult<()> {
        if has_root_id(self.model, clause) {
            debug!(selection = label, "served by primary key lookup");
            self.workload.direct_lookups.push(DirectLookup {
                query,
                label: label.to_string(),
            });
        } else {
            let alternatives = self.candidates(query, label, clause, page_size)?;
            levels.push(Level {
                label: label.to_string(),
                alternatives,
            });
        }

        for relation in relations {
            let nested = format!("{}.{}", label, relation.field);
            self.plan_level(
                query,
                &nested,
                &relation.clause,
                relation.page_size,
                &relation.relations,
                levels,
            )?;
        }
        Ok(())
    }

    fn candidates(
        &mut self,
        query: QueryId,
        label: &str,
        clause: &SqlClause,
        page_size: u32,
    ) -> PlanResult<Vec<IndexId>> {
        let root = clause.root_entity;
        let clustering = self.clustering_for(root)?;
        let predicates = clause.predicate_paths();
        let sargable = clause.sargable_paths();
        let clause = Arc::new(clause.clone());
        let latency = f64::from(self.model.query(query).sla.latency_ms);

        let mut ids = Vec::new();
        let mut pruned = 0usize;
        for partition_key in partition_key_subsets(&sargable) {
            for clustering_key in &clustering {
                let mut remaining: PathSet =
                    predicates.difference(&partition_key).cloned().collect();
                promote_clustering_prefix(&mut remaining, clustering_key);

                let index = Index {
                    key: IndexKey {
                        partition_key: partition_key.clone(),
                        clustering_key: clustering_key.clone(),
                        root_entity: root,
                    },
                    query,
                    remaining,
                    clause: Arc::clone(&clause),
                    page_size,
                };

                let cost = self.cost.cost(&index)?;
                if self.prune_over_latency && cost >= latency {
                    pruned += 1;
                    continue;
                }

                ids.push(IndexId(self.workload.indexes.len()));
                self.workload.indexes.push(index);
            }
        }

        debug!(
            selection = label,
            sargable = sargable.len(),
            clustering_keys = clustering.len(),
            candidates = ids.len(),
            pruned,
            "enumerated candidates"
        );

        if ids.is_empty() {
            return Err(PlanError::NoCandidates {
                query: self.model.query(query).name.clone(),
                selection: label.to_string(),
            });
        }
        Ok(ids)
    }

    fn clustering_for(&mut self, entity: EntityId) -> PlanResult<Vec<Vec<OrderBy>>> {
        if let Some(keys) = self.clustering.get(&entity) {
            return Ok(keys.clone());
        }
        let keys = clustering_keys(self.model, entity)?;
        self.clustering.insert(entity, keys.clone());
        Ok(keys)
    }
}

/// Nest levels into a tree: each level's alternatives become the children
/// of every alternative one level up. The tree takes the first planned
/// level's label.
fn assemble(levels: &[Level]) -> Option<(String, Vec<Plan>)> {
    let first = levels.first()?;

    let mut children: Vec<Plan> = Vec::new();
    for level in levels.iter().rev() {
        children = level
            .alternatives
            .iter()
            .map(|&index| Plan {
                index,
                children: children.clone(),
            })
            .collect();
    }
    Some((first.label.clone(), children))
}
