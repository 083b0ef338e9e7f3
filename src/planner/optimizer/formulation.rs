//! Solver-independent mixed-integer model.
//!
//! The optimizer describes its program here and hands it to a
//! [`MipSolver`](super::MipSolver). Keeping the formulation as plain data
//! lets both phases share one variable registry, lets solutions be
//! re-verified independently of the backend, and gives tests something to
//! inspect without solving.

use std::fmt::{self, Write as _};
use thiserror::Error;

/// Handle to a binary decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Geq,
    Leq,
    Eq,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sense::Geq => write!(f, ">="),
            Sense::Leq => write!(f, "<="),
            Sense::Eq => write!(f, "="),
        }
    }
}

/// `Σ coef * var  <sense>  rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn geq(name: impl Into<String>, terms: Vec<(VarId, f64)>, rhs: f64) -> Self {
        Self::new(name, terms, Sense::Geq, rhs)
    }

    pub fn leq(name: impl Into<String>, terms: Vec<(VarId, f64)>, rhs: f64) -> Self {
        Self::new(name, terms, Sense::Leq, rhs)
    }

    pub fn new(name: impl Into<String>, terms: Vec<(VarId, f64)>, sense: Sense, rhs: f64) -> Self {
        Self {
            name: name.into(),
            terms,
            sense,
            rhs,
        }
    }

    /// Left-hand side under an assignment.
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(v, c)| c * values[v.0]).sum()
    }

    fn holds(&self, lhs: f64, tolerance: f64) -> bool {
        match self.sense {
            Sense::Geq => lhs >= self.rhs - tolerance,
            Sense::Leq => lhs <= self.rhs + tolerance,
            Sense::Eq => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// A solution failing re-verification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintViolation {
    #[error("variable {variable} = {value} is not binary")]
    NotBinary { variable: String, value: f64 },

    #[error("constraint {constraint}: {lhs} {sense} {rhs} does not hold")]
    Unsatisfied {
        constraint: String,
        lhs: f64,
        sense: Sense,
        rhs: f64,
    },

    #[error("solution has {actual} values for {expected} variables")]
    Arity { expected: usize, actual: usize },
}

/// Variable values returned by a solver, indexed by [`VarId`].
#[derive(Debug, Clone, PartialEq)]
pub struct MipSolution {
    pub values: Vec<f64>,
    pub objective: f64,
}

impl MipSolution {
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.0]
    }

    /// Binary variables are read as set above one half.
    pub fn is_set(&self, var: VarId) -> bool {
        self.value(var) > 0.5
    }
}

/// Minimization program over binary variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MipModel {
    variables: Vec<String>,
    constraints: Vec<LinearConstraint>,
    objective: Vec<(VarId, f64)>,
}

impl MipModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.variables.push(name.into());
        VarId(self.variables.len() - 1)
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    /// Replace the objective; always minimized.
    pub fn set_objective(&mut self, terms: Vec<(VarId, f64)>) {
        self.objective = terms;
    }

    pub fn clear_objective(&mut self) {
        self.objective.clear();
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn variable_name(&self, var: VarId) -> &str {
        &self.variables[var.0]
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value under an assignment.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.objective.iter().map(|&(v, c)| c * values[v.0]).sum()
    }

    /// Check that `solution` is binary and satisfies every constraint within
    /// `tolerance`.
    pub fn verify(&self, solution: &MipSolution, tolerance: f64) -> Result<(), ConstraintViolation> {
        if solution.values.len() != self.variables.len() {
            return Err(ConstraintViolation::Arity {
                expected: self.variables.len(),
                actual: solution.values.len(),
            });
        }

        for (name, &value) in self.variables.iter().zip(&solution.values) {
            if value.abs() > tolerance && (value - 1.0).abs() > tolerance {
                return Err(ConstraintViolation::NotBinary {
                    variable: name.clone(),
                    value,
                });
            }
        }

        for constraint in &self.constraints {
            let lhs = constraint.lhs(&solution.values);
            if !constraint.holds(lhs, tolerance) {
                return Err(ConstraintViolation::Unsatisfied {
                    constraint: constraint.name.clone(),
                    lhs,
                    sense: constraint.sense,
                    rhs: constraint.rhs,
                });
            }
        }
        Ok(())
    }

    /// Render in CPLEX LP format.
    pub fn to_lp_format(&self) -> String {
        let mut out = String::new();
        out.push_str("Minimize\n obj:");
        write_terms(&mut out, self, &self.objective);
        out.push_str("\nSubject To\n");
        for constraint in &self.constraints {
            let _ = write!(out, " {}:", constraint.name);
            write_terms(&mut out, self, &constraint.terms);
            let _ = writeln!(out, " {} {}", constraint.sense, constraint.rhs);
        }
        out.push_str("Binary\n");
        for name in &self.variables {
            let _ = writeln!(out, " {}", name);
        }
        out.push_str("End\n");
        out
    }
}

fn write_terms(out: &mut String, model: &MipModel, terms: &[(VarId, f64)]) {
    if terms.is_empty() {
        out.push_str(" 0");
        return;
    }
    for (i, &(var, coef)) in terms.iter().enumerate() {
        let name = model.variable_name(var);
        let sign = if coef < 0.0 { "-" } else { "+" };
        let magnitude = coef.abs();
        if i == 0 && sign == "+" {
            out.push(' ');
        } else {
            let _ = write!(out, " {} ", sign);
        }
        if magnitude == 1.0 {
            out.push_str(name);
        } else {
            let _ = write!(out, "{} {}", magnitude, name);
        }
    }
}
