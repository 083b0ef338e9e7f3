//! Candidate generation - turns query selections into a workload of
//! candidate indexes arranged in per-query plan trees.
//!
//! For every selection level the generator crosses every subset of the
//! clause's sargable predicates (as partition key) with every clustering key
//! the root entity supports. Selections that bind the root identifier skip
//! this entirely and are recorded as direct lookups.

mod builder;
mod plan;

pub use builder::{clustering_keys, has_root_id, partition_key_subsets, promote_clustering_prefix};
pub use plan::*;

use crate::model::DomainModel;
use crate::planner::cost::CostModel;
use crate::planner::PlanResult;

/// Candidate generator.
pub struct LogicalPlanner<'a> {
    model: &'a DomainModel,
    cost: &'a CostModel<'a>,
    prune_over_latency: bool,
}

impl<'a> LogicalPlanner<'a> {
    pub fn new(model: &'a DomainModel, cost: &'a CostModel<'a>) -> Self {
        Self {
            model,
            cost,
            prune_over_latency: false,
        }
    }

    /// Drop candidates whose cost reaches the query's latency budget.
    pub fn with_latency_pruning(mut self, enabled: bool) -> Self {
        self.prune_over_latency = enabled;
        self
    }

    /// Enumerate and price every candidate for every query.
    pub fn search(&self) -> PlanResult<Workload> {
        builder::WorkloadBuilder::new(self.model, self.cost, self.prune_over_latency).build()
    }
}
