//! Solver seam.
//!
//! The optimizer only talks to [`MipSolver`]. The default backend rebuilds
//! the program in `good_lp` on every call and solves it with the pure-Rust
//! `microlp` branch and bound.

use crate::planner::optimizer::formulation::{MipModel, MipSolution, Sense, VarId};
use good_lp::solvers::microlp::microlp;
use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("model is infeasible")]
    Infeasible,

    #[error("model is unbounded")]
    Unbounded,

    #[error("solver failed: {0}")]
    Failed(String),
}

/// A mixed-integer backend. Instances are not shared between runs.
pub trait MipSolver {
    fn name(&self) -> &str;

    /// Solve `model` to optimality.
    fn solve(&mut self, model: &MipModel) -> Result<MipSolution, SolveError>;
}

/// `good_lp` + `microlp` backend.
#[derive(Debug, Default)]
pub struct MicroLpSolver {
    solves: usize,
}

impl MicroLpSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed `solve` calls.
    pub fn solves(&self) -> usize {
        self.solves
    }
}

fn linear(handles: &[Variable], terms: &[(VarId, f64)]) -> Expression {
    terms.iter().map(|&(var, coef)| coef * handles[var.0]).sum()
}

impl MipSolver for MicroLpSolver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&mut self, model: &MipModel) -> Result<MipSolution, SolveError> {
        if model.num_variables() == 0 {
            return Ok(MipSolution {
                values: Vec::new(),
                objective: 0.0,
            });
        }

        let mut vars = ProblemVariables::new();
        let handles: Vec<Variable> = model
            .variables()
            .iter()
            .map(|name| vars.add(variable().binary().name(name.clone())))
            .collect();

        let objective = linear(&handles, model.objective());
        let mut problem = vars.minimise(objective).using(microlp);

        for c in model.constraints() {
            let lhs = linear(&handles, &c.terms);
            let built = match c.sense {
                Sense::Geq => constraint::geq(lhs, c.rhs),
                Sense::Leq => constraint::leq(lhs, c.rhs),
                Sense::Eq => constraint::eq(lhs, c.rhs),
            };
            problem = problem.with(built);
        }

        let solution = problem.solve().map_err(|e| match e {
            ResolutionError::Infeasible => SolveError::Infeasible,
            ResolutionError::Unbounded => SolveError::Unbounded,
            other => SolveError::Failed(other.to_string()),
        })?;
        self.solves += 1;

        let values: Vec<f64> = handles.iter().map(|&v| solution.value(v)).collect();
        let objective = model.evaluate(&values);
        Ok(MipSolution { values, objective })
    }
}
