//! Gauss-Newton refinement.
//!
//! Each iteration linearizes the model around the current point and steps by
//! the solution of `min ‖J δ − r‖` (see `math::solve_least_squares`). Fast
//! near a minimum with a well-conditioned Jacobian; the driver pairs it with
//! the damped variant for the cases where it is not.

use nalgebra::DVector;

use crate::error::FitError;
use crate::fit::ConvergenceChecker;
use crate::math::solve_least_squares;
use crate::solvers::{LeastSquaresSolver, ResidualObjective, SolverOutcome};

/// Undamped least-squares refiner.
#[derive(Debug, Clone)]
pub struct GaussNewton {
    max_evaluations: usize,
}

impl GaussNewton {
    pub fn new(max_evaluations: usize) -> Self {
        Self { max_evaluations }
    }
}

impl LeastSquaresSolver for GaussNewton {
    fn minimize(
        &self,
        objective: &mut dyn ResidualObjective,
        start: &[f64],
        checker: &ConvergenceChecker,
    ) -> Result<SolverOutcome, FitError> {
        let mut current = DVector::from_column_slice(start);
        let mut evaluation = objective.evaluate(current.as_slice());
        let mut evaluations = 1usize;
        if !evaluation.rms.is_finite() {
            return Err(FitError::new(
                "Gauss-Newton started outside the numerically valid region.",
            ));
        }

        for iteration in 1.. {
            let Some(step) = solve_least_squares(&evaluation.jacobian, &evaluation.residuals)
            else {
                return Err(FitError::new("Gauss-Newton step is singular."));
            };
            let next = &current + &step;
            evaluation = objective.evaluate(next.as_slice());
            evaluations += 1;
            if !evaluation.rms.is_finite() {
                return Err(FitError::new(
                    "Gauss-Newton left the numerically valid region.",
                ));
            }

            let done = checker.converged(iteration, current.as_slice(), next.as_slice());
            current = next;
            if done || evaluations >= self.max_evaluations {
                break;
            }
        }

        Ok(SolverOutcome {
            point: current.as_slice().to_vec(),
            rms: evaluation.rms,
        })
    }
}
