//! Selectivity-based cost model.
//!
//! A candidate's cost is the expected number of rows scanned to answer one
//! invocation of its query. Costs are pure functions of the candidate's
//! structure and are memoized in the run's [`CostCache`].

mod estimator;

pub use estimator::{estimate, filter_rows, sort_rows, CostEstimate};

use crate::cache::CostCache;
use crate::model::{DomainModel, OrderBy, PathSet};
use crate::planner::logical::{Index, IndexKey, Workload};
use crate::planner::PlanResult;
use tracing::trace;

/// Default per-row overhead multiplier for scans.
pub const ROW_SCAN_COST: f64 = 1.005;

/// Everything a candidate's cost depends on.
///
/// Wider than [`IndexKey`]: the same physical table costs differently for
/// queries with different predicates, page sizes or orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CostKey {
    pub key: IndexKey,
    pub predicates: PathSet,
    pub remaining: PathSet,
    pub order_by: Vec<OrderBy>,
    pub page_size: u32,
}

impl CostKey {
    pub fn of(index: &Index) -> Self {
        Self {
            key: index.key.clone(),
            predicates: index.clause.predicate_paths(),
            remaining: index.remaining.clone(),
            order_by: index.clause.order_by.clone(),
            page_size: index.page_size,
        }
    }
}

/// Prices candidates against the domain model's statistics.
pub struct CostModel<'a> {
    model: &'a DomainModel,
    cache: &'a CostCache,
    row_scan_cost: f64,
}

impl<'a> CostModel<'a> {
    pub fn new(model: &'a DomainModel, cache: &'a CostCache) -> Self {
        Self::with_row_scan_cost(model, cache, ROW_SCAN_COST)
    }

    pub fn with_row_scan_cost(
        model: &'a DomainModel,
        cache: &'a CostCache,
        row_scan_cost: f64,
    ) -> Self {
        Self {
            model,
            cache,
            row_scan_cost,
        }
    }

    /// Memoized cost of `index`.
    ///
    /// Fails when the model lacks a selectivity statistic the estimate needs.
    pub fn cost(&self, index: &Index) -> PlanResult<f64> {
        self.cache
            .get_or_try_insert(CostKey::of(index), |_| -> PlanResult<f64> {
                let priced = estimate(self.model, index, self.row_scan_cost)?;
                trace!(
                    candidate = %index.key.describe(self.model),
                    filter_rows = priced.filter_rows,
                    sort_rows = priced.sort_rows,
                    cost = priced.total,
                    "priced candidate"
                );
                Ok(priced.total)
            })
    }

    /// Uncached filter/sort breakdown, for explain output.
    pub fn breakdown(&self, index: &Index) -> PlanResult<CostEstimate> {
        Ok(estimate(self.model, index, self.row_scan_cost)?)
    }

    /// Cost of every candidate in the workload, indexed by `IndexId`.
    pub fn price_workload(&self, workload: &Workload) -> PlanResult<Vec<f64>> {
        workload.indexes().iter().map(|i| self.cost(i)).collect()
    }

    pub fn cache(&self) -> &CostCache {
        self.cache
    }
}
