//! Nelder-Mead simplex search.
//!
//! Derivative-free refinement over the scalar objective. The simplex is
//! seeded around the start point with per-component relative offsets and
//! walked with the standard reflection/expansion/contraction/shrink moves.
//! Stops when the cost spread across the simplex collapses or the evaluation
//! budget is exhausted.
//!
//! Non-finite costs are ordered as `+inf` so the simplex can still walk out
//! of a numerically unusable region.

use crate::error::FitError;
use crate::solvers::{DirectSolver, ScalarObjective, SolverOutcome};

/// Simplex optimizer with the standard coefficient set.
#[derive(Debug, Clone)]
pub struct NelderMead {
    reflection: f64,
    expansion: f64,
    contraction: f64,
    shrink: f64,
    /// Relative offset used to seed each simplex vertex.
    initial_step: f64,
    /// Absolute offset used when a start component is exactly zero.
    zero_step: f64,
    /// Relative cost spread below which the simplex counts as collapsed.
    spread_tolerance: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
            initial_step: 0.05,
            zero_step: 0.00025,
            spread_tolerance: 1e-12,
        }
    }
}

fn ordered_cost(objective: &mut dyn ScalarObjective, point: &[f64]) -> f64 {
    let cost = objective.cost(point);
    if cost.is_finite() { cost } else { f64::INFINITY }
}

impl DirectSolver for NelderMead {
    fn minimize(
        &self,
        objective: &mut dyn ScalarObjective,
        start: &[f64],
        max_evaluations: usize,
    ) -> Result<SolverOutcome, FitError> {
        let dimensions = start.len();
        if dimensions == 0 {
            return Err(FitError::new("Cannot run a simplex over zero parameters."));
        }

        // Seed: the start point plus one offset vertex per component.
        let mut simplex: Vec<(f64, Vec<f64>)> = Vec::with_capacity(dimensions + 1);
        simplex.push((ordered_cost(objective, start), start.to_vec()));
        for j in 0..dimensions {
            let mut vertex = start.to_vec();
            vertex[j] = if vertex[j] != 0.0 {
                vertex[j] * (1.0 + self.initial_step)
            } else {
                self.zero_step
            };
            let cost = ordered_cost(objective, &vertex);
            simplex.push((cost, vertex));
        }
        let mut evaluations = simplex.len();

        loop {
            simplex.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
            let best = simplex[0].0;
            let worst = simplex[dimensions].0;
            if evaluations >= max_evaluations
                || worst - best <= self.spread_tolerance * (1.0 + best.abs())
            {
                break;
            }

            // Centroid of every vertex but the worst.
            let mut centroid = vec![0.0; dimensions];
            for (_, vertex) in &simplex[..dimensions] {
                for (c, v) in centroid.iter_mut().zip(vertex) {
                    *c += v;
                }
            }
            for c in centroid.iter_mut() {
                *c /= dimensions as f64;
            }

            let worst_point = simplex[dimensions].1.clone();
            let reflected: Vec<f64> = centroid
                .iter()
                .zip(&worst_point)
                .map(|(c, w)| c + self.reflection * (c - w))
                .collect();
            let reflected_cost = ordered_cost(objective, &reflected);
            evaluations += 1;

            if reflected_cost < best {
                // The reflected direction pays off; try doubling down.
                let expanded: Vec<f64> = centroid
                    .iter()
                    .zip(&reflected)
                    .map(|(c, r)| c + self.expansion * (r - c))
                    .collect();
                let expanded_cost = ordered_cost(objective, &expanded);
                evaluations += 1;
                simplex[dimensions] = if expanded_cost < reflected_cost {
                    (expanded_cost, expanded)
                } else {
                    (reflected_cost, reflected)
                };
                continue;
            }

            let second_worst = simplex[dimensions - 1].0;
            if reflected_cost < second_worst {
                simplex[dimensions] = (reflected_cost, reflected);
                continue;
            }

            // Contract: outside if reflection at least beat the worst vertex,
            // inside otherwise.
            let contracted: Vec<f64> = if reflected_cost < worst {
                centroid
                    .iter()
                    .zip(&reflected)
                    .map(|(c, r)| c + self.contraction * (r - c))
                    .collect()
            } else {
                centroid
                    .iter()
                    .zip(&worst_point)
                    .map(|(c, w)| c + self.contraction * (w - c))
                    .collect()
            };
            let contracted_cost = ordered_cost(objective, &contracted);
            evaluations += 1;
            if contracted_cost < reflected_cost.min(worst) {
                simplex[dimensions] = (contracted_cost, contracted);
                continue;
            }

            // Shrink every vertex toward the best one.
            let best_point = simplex[0].1.clone();
            for (cost, vertex) in simplex.iter_mut().skip(1) {
                for (v, b) in vertex.iter_mut().zip(&best_point) {
                    *v = b + self.shrink * (*v - b);
                }
                *cost = ordered_cost(objective, vertex);
                evaluations += 1;
            }
        }

        simplex.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let (best_cost, best_point) = simplex.swap_remove(0);
        if best_cost.is_finite() {
            Ok(SolverOutcome {
                point: best_point,
                rms: best_cost,
            })
        } else {
            Err(FitError::new(
                "Simplex search never reached a numerically valid point.",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Paraboloid;

    impl ScalarObjective for Paraboloid {
        fn cost(&mut self, params: &[f64]) -> f64 {
            (params[0] - 1.0).powi(2) + (params[1] + 2.0).powi(2)
        }
    }

    #[test]
    fn walks_to_the_paraboloid_minimum() {
        let solver = NelderMead::default();
        let outcome = solver.minimize(&mut Paraboloid, &[0.0, 0.0], 500).unwrap();
        assert!(
            (outcome.point[0] - 1.0).abs() < 1e-3 && (outcome.point[1] + 2.0).abs() < 1e-3,
            "ended at ({}, {})",
            outcome.point[0],
            outcome.point[1]
        );
    }

    struct NanValley;

    impl ScalarObjective for NanValley {
        fn cost(&mut self, params: &[f64]) -> f64 {
            // Unusable for negative inputs; finite above.
            if params[0] < 0.0 {
                f64::NAN
            } else {
                (params[0] - 2.0).powi(2)
            }
        }
    }

    #[test]
    fn walks_along_the_edge_of_a_non_finite_region() {
        let solver = NelderMead::default();
        let outcome = solver.minimize(&mut NanValley, &[0.0], 500).unwrap();
        assert!((outcome.point[0] - 2.0).abs() < 1e-3, "ended at {}", outcome.point[0]);
    }

    struct AlwaysNan;

    impl ScalarObjective for AlwaysNan {
        fn cost(&mut self, _params: &[f64]) -> f64 {
            f64::NAN
        }
    }

    #[test]
    fn reports_failure_when_every_point_is_unusable() {
        let solver = NelderMead::default();
        assert!(solver.minimize(&mut AlwaysNan, &[0.0, 0.0], 100).is_err());
    }
}
