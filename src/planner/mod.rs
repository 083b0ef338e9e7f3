//! Physical schema planner - selects the tables a workload needs.
//!
//! Three-phase architecture:
//! 1. Candidate Generation: queries → Workload (candidate indexes + plan trees)
//! 2. Cost Estimation: Workload → per-candidate scanned-row costs
//! 3. Optimization: two integer programs → selected tables (see [`optimizer`])

pub mod cost;
pub mod logical;
pub mod optimizer;
pub mod report;

pub use optimizer::Phase;
pub use report::{explain_workload, PlanReport};

use crate::cache::CostCache;
use crate::config::{PlannerSettings, SettingsError};
use crate::model::{DomainModel, ModelError};
use optimizer::{ConstraintViolation, MicroLpSolver, MipSolver, Optimizer};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during planning.
///
/// Every variant is fatal for the run; inputs are static, so the caller has
/// to fix them and plan again.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Schema resolution failed: {0}")]
    SchemaResolution(#[from] ModelError),

    #[error("{phase} is infeasible ({constraints} constraints over {variables} variables)")]
    Infeasible {
        phase: Phase,
        constraints: usize,
        variables: usize,
    },

    #[error("{phase} returned a solution that fails verification: {violation}")]
    SolutionIntegrity {
        phase: Phase,
        violation: ConstraintViolation,
    },

    #[error("{phase} solver error: {message}")]
    Solver { phase: Phase, message: String },

    #[error("No candidate for {selection} of query {query} fits its latency budget")]
    NoCandidates { query: String, selection: String },

    #[error("Invalid planner settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

pub type PlanResult<T> = Result<T, PlanError>;

/// Main entry point for schema planning.
pub struct SchemaPlanner<'a> {
    model: &'a DomainModel,
    settings: PlannerSettings,
}

impl<'a> SchemaPlanner<'a> {
    pub fn new(model: &'a DomainModel) -> Self {
        Self::with_settings(model, PlannerSettings::default())
    }

    pub fn with_settings(model: &'a DomainModel, settings: PlannerSettings) -> Self {
        Self { model, settings }
    }

    /// Plan with the bundled solver.
    pub fn plan(&self) -> PlanResult<PlanReport> {
        self.plan_with_solver(&mut MicroLpSolver::new())
    }

    /// Plan with a caller-supplied solver.
    ///
    /// This orchestrates all three phases:
    /// 1. Enumerate candidates, pricing each as it is generated
    /// 2. Solve for minimum cost, then minimum table count
    /// 3. Assemble the report
    pub fn plan_with_solver<S: MipSolver>(&self, solver: &mut S) -> PlanResult<PlanReport> {
        self.settings.validate()?;

        let cache = CostCache::new();
        let cost_model = cost::CostModel::with_row_scan_cost(
            self.model,
            &cache,
            self.settings.cost.row_scan_cost,
        );

        // Phase 1: Candidate generation
        let workload = logical::LogicalPlanner::new(self.model, &cost_model)
            .with_latency_pruning(self.settings.candidates.prune_over_latency)
            .search()?;

        // Phase 2: Cost estimation
        let costs = cost_model.price_workload(&workload)?;
        let stats = cache.stats();
        info!(
            candidates = workload.indexes().len(),
            query_plans = workload.plans().len(),
            cost_cache_entries = stats.entries,
            cost_cache_hits = stats.hits,
            "workload priced"
        );
        debug!(
            "cost tree:\n{}",
            explain_workload(self.model, &workload, &costs)
        );

        // Phase 3: Optimization
        let outcome = Optimizer::new(self.model, &workload, &costs)
            .with_settings(self.settings.optimizer)
            .solve(solver)?;

        PlanReport::build(self.model, &workload, &costs, &outcome)
    }
}
