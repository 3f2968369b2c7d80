//! Pluggable local optimizers.
//!
//! The engine treats its optimizers as narrow, substitutable capabilities:
//!
//! - the gradient-based refiners (Gauss-Newton, Levenberg-Marquardt) consume
//!   the residual/Jacobian view of the objective and a stopping predicate
//! - the derivative-free simplex consumes the scalar view and an evaluation
//!   budget
//!
//! Any conforming optimizer can be swapped in without touching the driver.

pub mod gauss_newton;
pub mod levenberg;
pub mod nelder_mead;

pub use gauss_newton::*;
pub use levenberg::*;
pub use nelder_mead::*;

use nalgebra::{DMatrix, DVector};

use crate::error::FitError;
use crate::fit::ConvergenceChecker;

/// One full evaluation of the residual objective at a point.
///
/// `jacobian` is the Jacobian of the *model prediction*, not of the residual;
/// the refiners account for the sign themselves.
pub struct ResidualEvaluation {
    pub residuals: DVector<f64>,
    pub jacobian: DMatrix<f64>,
    pub rms: f64,
}

/// Residual/Jacobian view of the objective, consumed by least-squares refiners.
pub trait ResidualObjective {
    fn evaluate(&mut self, params: &[f64]) -> ResidualEvaluation;
}

/// Scalar view of the objective, consumed by derivative-free search.
pub trait ScalarObjective {
    fn cost(&mut self, params: &[f64]) -> f64;
}

/// Terminal point of one optimizer run and the objective value it reached.
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub point: Vec<f64>,
    pub rms: f64,
}

/// A gradient-based local optimizer over the residual objective.
pub trait LeastSquaresSolver {
    fn minimize(
        &self,
        objective: &mut dyn ResidualObjective,
        start: &[f64],
        checker: &ConvergenceChecker,
    ) -> Result<SolverOutcome, FitError>;
}

/// A derivative-free local optimizer over the scalar objective.
pub trait DirectSolver {
    fn minimize(
        &self,
        objective: &mut dyn ScalarObjective,
        start: &[f64],
        max_evaluations: usize,
    ) -> Result<SolverOutcome, FitError>;
}
