//! Levenberg-Marquardt refinement.
//!
//! Damped normal equations `(JᵀJ + λ·diag(JᵀJ)) δ = Jᵀ r` with multiplicative
//! λ adaptation: decrease on an accepted step, increase on a rejected one.
//! Interpolates between Gauss-Newton (small λ) and scaled gradient descent
//! (large λ), which keeps it usable far from a minimum where the undamped
//! variant diverges.

use nalgebra::DVector;

use crate::error::FitError;
use crate::fit::ConvergenceChecker;
use crate::solvers::{LeastSquaresSolver, ResidualObjective, SolverOutcome};

/// Damped least-squares refiner.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    max_evaluations: usize,
    initial_damping: f64,
    damping_up: f64,
    damping_down: f64,
    min_damping: f64,
    max_damping: f64,
}

impl LevenbergMarquardt {
    pub fn new(max_evaluations: usize) -> Self {
        Self {
            max_evaluations,
            initial_damping: 1e-3,
            damping_up: 10.0,
            damping_down: 0.1,
            min_damping: 1e-12,
            max_damping: 1e12,
        }
    }
}

impl LeastSquaresSolver for LevenbergMarquardt {
    fn minimize(
        &self,
        objective: &mut dyn ResidualObjective,
        start: &[f64],
        checker: &ConvergenceChecker,
    ) -> Result<SolverOutcome, FitError> {
        let mut current = DVector::from_column_slice(start);
        let mut evaluation = objective.evaluate(current.as_slice());
        let mut evaluations = 1usize;
        let mut damping = self.initial_damping;
        let mut iteration = 0usize;

        'linearize: while evaluations < self.max_evaluations {
            let jt = evaluation.jacobian.transpose();
            let normal = &jt * &evaluation.jacobian;
            let gradient = &jt * &evaluation.residuals;
            let k = normal.nrows();

            // Inflate λ until a step is accepted or damping runs out.
            while evaluations < self.max_evaluations {
                let mut damped = normal.clone();
                for j in 0..k {
                    damped[(j, j)] += damping * normal[(j, j)];
                }
                let Some(factor) = damped.cholesky() else {
                    damping *= self.damping_up;
                    if damping > self.max_damping {
                        break 'linearize;
                    }
                    continue;
                };
                let step = factor.solve(&gradient);
                let trial = &current + &step;
                let trial_evaluation = objective.evaluate(trial.as_slice());
                evaluations += 1;

                if trial_evaluation.rms.is_finite() && trial_evaluation.rms < evaluation.rms {
                    damping = (damping * self.damping_down).max(self.min_damping);
                    iteration += 1;
                    let previous = std::mem::replace(&mut current, trial);
                    evaluation = trial_evaluation;
                    if checker.converged(iteration, previous.as_slice(), current.as_slice()) {
                        break 'linearize;
                    }
                    // Re-linearize around the accepted point.
                    continue 'linearize;
                }

                damping *= self.damping_up;
                if damping > self.max_damping {
                    break 'linearize;
                }
            }
        }

        if evaluation.rms.is_finite() {
            Ok(SolverOutcome {
                point: current.as_slice().to_vec(),
                rms: evaluation.rms,
            })
        } else {
            Err(FitError::new(
                "Levenberg-Marquardt never reached a numerically valid point.",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::ResidualEvaluation;
    use nalgebra::DMatrix;

    /// Rosenbrock in least-squares form: residuals `10(p1 - p0²)` and
    /// `1 - p0`, minimum at `(1, 1)` with zero residual.
    struct RosenbrockObjective;

    impl ResidualObjective for RosenbrockObjective {
        fn evaluate(&mut self, params: &[f64]) -> ResidualEvaluation {
            let residuals =
                DVector::from_row_slice(&[10.0 * (params[1] - params[0] * params[0]), 1.0 - params[0]]);
            let jacobian =
                DMatrix::from_row_slice(2, 2, &[20.0 * params[0], -10.0, 1.0, 0.0]);
            let rms = (residuals.norm_squared() / 2.0).sqrt();
            ResidualEvaluation {
                residuals,
                jacobian,
                rms,
            }
        }
    }

    #[test]
    fn descends_the_rosenbrock_valley() {
        let solver = LevenbergMarquardt::new(500);
        let checker = ConvergenceChecker::new(768, 1e-12);
        let outcome = solver
            .minimize(&mut RosenbrockObjective, &[-1.2, 1.0], &checker)
            .unwrap();
        assert!(
            (outcome.point[0] - 1.0).abs() < 1e-3 && (outcome.point[1] - 1.0).abs() < 1e-3,
            "ended at ({}, {})",
            outcome.point[0],
            outcome.point[1]
        );
        assert!(outcome.rms < 1e-3, "rms: {}", outcome.rms);
    }

    #[test]
    fn returns_the_start_when_no_step_improves() {
        // Already at the minimum: every trial step is rejected and the
        // terminal point must be the start itself.
        let solver = LevenbergMarquardt::new(50);
        let checker = ConvergenceChecker::new(768, 1e-12);
        let outcome = solver
            .minimize(&mut RosenbrockObjective, &[1.0, 1.0], &checker)
            .unwrap();
        assert_eq!(outcome.point, vec![1.0, 1.0]);
        assert!(outcome.rms < 1e-12);
    }
}
