//! Two-phase integer program over the candidate workload.
//!
//! Variables: one binary per physical table (`t*`) and one per candidate
//! (`i*`). Constraints:
//!
//! - linking: a candidate may only be used if its table is built
//! - coverage: every sibling set of every plan tree has a chosen member
//! - write fanout: an INSERT on `E` touches between 1 and `max_tables`
//!   tables rooted at `E`
//!
//! Phase 1 minimizes throughput-weighted read cost. Phase 2 keeps the same
//! variables, caps cost at `phase1 * cost_margin` and minimizes table count.

mod formulation;
mod solver;
mod unique;

pub use formulation::{
    ConstraintViolation, LinearConstraint, MipModel, MipSolution, Sense, VarId,
};
pub use solver::{MicroLpSolver, MipSolver, SolveError};
pub use unique::{UniqueIndex, UniqueIndexId, UniqueIndexes};

use crate::config::OptimizerSettings;
use crate::model::{DomainModel, MutationKind};
use crate::planner::logical::{IndexId, Workload};
use crate::planner::{PlanError, PlanResult};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, trace};

/// Which solve of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Minimize read cost.
    Cost,
    /// Minimize table count within the cost envelope.
    TableCount,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Cost => write!(f, "phase 1 (cost)"),
            Phase::TableCount => write!(f, "phase 2 (table count)"),
        }
    }
}

/// Size and timing of one solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveStats {
    pub phase: Phase,
    pub variables: usize,
    pub constraints: usize,
    pub objective: f64,
    pub elapsed_ms: f64,
}

/// The program before solving, with the registry mapping candidates and
/// tables to their variables.
#[derive(Debug, Clone)]
pub struct Formulation {
    pub mip: MipModel,
    pub tables: UniqueIndexes,
    /// Indexed by `IndexId`.
    pub index_vars: Vec<VarId>,
    /// Indexed by `UniqueIndexId`.
    pub table_vars: Vec<VarId>,
    /// `cost * throughput` per candidate variable.
    pub cost_terms: Vec<(VarId, f64)>,
}

/// Final assignment after both phases.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    pub tables: UniqueIndexes,
    pub selected_tables: BTreeSet<UniqueIndexId>,
    /// The cheapest set candidate of each sibling set. The table-count
    /// objective leaves other candidates on built tables free to be set,
    /// so the raw assignment may hold alternatives no query needs.
    pub selected_indexes: BTreeSet<IndexId>,
    /// Optimal phase-1 objective.
    pub phase1_cost: f64,
    /// Weighted cost of `selected_indexes`.
    pub phase2_cost: f64,
    pub table_count: usize,
    pub stats: Vec<SolveStats>,
}

impl OptimizationOutcome {
    fn empty() -> Self {
        Self {
            tables: UniqueIndexes::default(),
            selected_tables: BTreeSet::new(),
            selected_indexes: BTreeSet::new(),
            phase1_cost: 0.0,
            phase2_cost: 0.0,
            table_count: 0,
            stats: Vec::new(),
        }
    }
}

pub struct Optimizer<'a> {
    model: &'a DomainModel,
    workload: &'a Workload,
    costs: &'a [f64],
    settings: OptimizerSettings,
}

impl<'a> Optimizer<'a> {
    /// `costs` holds one unweighted cost per candidate, indexed by `IndexId`.
    pub fn new(model: &'a DomainModel, workload: &'a Workload, costs: &'a [f64]) -> Self {
        Self {
            model,
            workload,
            costs,
            settings: OptimizerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: OptimizerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Build the phase-1 program.
    pub fn formulate(&self) -> Formulation {
        let workload = self.workload;
        let tables = UniqueIndexes::collapse(workload);
        let mut mip = MipModel::new();

        let table_vars: Vec<VarId> = tables
            .iter()
            .map(|t| mip.add_binary(format!("t{}", t.id.0)))
            .collect();
        let index_vars: Vec<VarId> = workload
            .index_ids()
            .map(|id| mip.add_binary(format!("i{}", id.0)))
            .collect();

        for id in workload.index_ids() {
            let table = table_vars[tables.of(id).0];
            mip.add_constraint(LinearConstraint::geq(
                format!("link_i{}", id.0),
                vec![(table, 1.0), (index_vars[id.0], -1.0)],
                0.0,
            ));
        }

        for (k, siblings) in workload.sibling_sets().iter().enumerate() {
            let terms = siblings.iter().map(|id| (index_vars[id.0], 1.0)).collect();
            mip.add_constraint(LinearConstraint::geq(format!("cover_{}", k), terms, 1.0));
        }

        for (k, mutation) in self.model.mutations().iter().enumerate() {
            if mutation.kind != MutationKind::Insert {
                continue;
            }
            let terms: Vec<(VarId, f64)> = tables
                .rooted_at(mutation.entity)
                .map(|t| (table_vars[t.id.0], 1.0))
                .collect();
            if terms.is_empty() {
                continue;
            }
            mip.add_constraint(LinearConstraint::geq(
                format!("fanout_min_{}", k),
                terms.clone(),
                1.0,
            ));
            mip.add_constraint(LinearConstraint::leq(
                format!("fanout_max_{}", k),
                terms,
                f64::from(mutation.sla.max_tables),
            ));
        }

        let cost_terms: Vec<(VarId, f64)> = workload
            .index_ids()
            .map(|id| {
                let query = self.model.query(workload.index(id).query);
                let weight = f64::from(query.sla.throughput_per_second);
                (index_vars[id.0], self.costs[id.0] * weight)
            })
            .collect();
        mip.set_objective(cost_terms.clone());

        Formulation {
            mip,
            tables,
            index_vars,
            table_vars,
            cost_terms,
        }
    }

    /// Run both phases with `solver`.
    pub fn solve<S: MipSolver>(&self, solver: &mut S) -> PlanResult<OptimizationOutcome> {
        if self.workload.is_empty() {
            info!("no candidates to optimize");
            return Ok(OptimizationOutcome::empty());
        }

        let mut formulation = self.formulate();
        info!(
            solver = solver.name(),
            candidates = formulation.index_vars.len(),
            tables = formulation.table_vars.len(),
            constraints = formulation.mip.num_constraints(),
            "formulated schema program"
        );

        let (phase1, phase1_stats) = self.run_phase(solver, &formulation.mip, Phase::Cost)?;
        let optimal = phase1.objective;
        info!(cost = optimal, "{} solved", Phase::Cost);

        formulation.mip.add_constraint(LinearConstraint::leq(
            "cost_envelope",
            formulation.cost_terms.clone(),
            optimal * self.settings.cost_margin,
        ));
        formulation.mip.clear_objective();
        formulation
            .mip
            .set_objective(formulation.table_vars.iter().map(|&v| (v, 1.0)).collect());

        let (phase2, phase2_stats) =
            self.run_phase(solver, &formulation.mip, Phase::TableCount)?;

        let selected_tables: BTreeSet<UniqueIndexId> = formulation
            .tables
            .iter()
            .filter(|t| phase2.is_set(formulation.table_vars[t.id.0]))
            .map(|t| t.id)
            .collect();
        let mut selected_indexes = BTreeSet::new();
        for siblings in self.workload.sibling_sets() {
            let cheapest = siblings
                .into_iter()
                .filter(|id| phase2.is_set(formulation.index_vars[id.0]))
                .min_by(|a, b| self.costs[a.0].total_cmp(&self.costs[b.0]));
            selected_indexes.extend(cheapest);
        }
        let phase2_cost: f64 = selected_indexes
            .iter()
            .map(|id| formulation.cost_terms[id.0].1)
            .sum();

        info!(
            tables = selected_tables.len(),
            cost = phase2_cost,
            "{} solved",
            Phase::TableCount
        );

        Ok(OptimizationOutcome {
            table_count: selected_tables.len(),
            tables: formulation.tables,
            selected_tables,
            selected_indexes,
            phase1_cost: optimal,
            phase2_cost,
            stats: vec![phase1_stats, phase2_stats],
        })
    }

    fn run_phase<S: MipSolver>(
        &self,
        solver: &mut S,
        mip: &MipModel,
        phase: Phase,
    ) -> PlanResult<(MipSolution, SolveStats)> {
        trace!(%phase, lp = %mip.to_lp_format(), "solver input");

        let started = Instant::now();
        let solution = solver.solve(mip).map_err(|e| match e {
            SolveError::Infeasible => PlanError::Infeasible {
                phase,
                constraints: mip.num_constraints(),
                variables: mip.num_variables(),
            },
            other => PlanError::Solver {
                phase,
                message: other.to_string(),
            },
        })?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        mip.verify(&solution, self.settings.verify_tolerance)
            .map_err(|violation| PlanError::SolutionIntegrity { phase, violation })?;

        let stats = SolveStats {
            phase,
            variables: mip.num_variables(),
            constraints: mip.num_constraints(),
            objective: solution.objective,
            elapsed_ms,
        };
        debug!(
            %phase,
            variables = stats.variables,
            constraints = stats.constraints,
            objective = stats.objective,
            elapsed_ms,
            "solve finished"
        );
        Ok((solution, stats))
    }
}
