//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported by surrounding tooling and reloaded for later comparisons

use serde::{Deserialize, Serialize};

use crate::error::FitError;

/// Immutable table of `(x, y)` observations.
///
/// Owned by the caller; the engine only reads it for the lifetime of a fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleMatrix {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl SampleMatrix {
    /// Build a sample table from `(x, y)` pairs.
    ///
    /// Requires at least two rows and finite values throughout; anything else
    /// is a caller bug we surface before any numeric work starts.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self, FitError> {
        if pairs.len() < 2 {
            return Err(FitError::new(format!(
                "Need at least 2 sample rows, got {}.",
                pairs.len()
            )));
        }
        if pairs.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(FitError::new("Sample rows must be finite."));
        }
        Ok(Self {
            xs: pairs.iter().map(|(x, _)| *x).collect(),
            ys: pairs.iter().map(|(_, y)| *y).collect(),
        })
    }

    /// Number of sample rows.
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    pub fn x(&self, row: usize) -> f64 {
        self.xs[row]
    }

    pub fn y(&self, row: usize) -> f64 {
        self.ys[row]
    }

    /// `(min, max)` over the x column. Used by domain-aware guessers.
    pub fn x_bounds(&self) -> (f64, f64) {
        bounds(&self.xs)
    }

    /// `(min, max)` over the y column.
    pub fn y_bounds(&self) -> (f64, f64) {
        bounds(&self.ys)
    }
}

fn bounds(values: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    (lo, hi)
}

/// Tunable knobs for one fitting job.
///
/// Every field has a workable default; `validate` runs in the job constructor
/// so the fit itself never has to fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitConfig {
    /// Floor for the per-row inverse weight `max(|y_i|, floor)`. Keeps rows
    /// with `y_i` near zero from dominating the objective.
    pub min_inverse_weight: f64,
    /// Random-restart passes of the driver loop.
    pub outer_iterations: usize,
    /// Iteration cap handed to the least-squares convergence test.
    pub max_solver_iterations: usize,
    /// Evaluation cap for one gradient-based solver run.
    pub max_solver_evaluations: usize,
    /// Evaluation cap for one simplex run.
    pub max_direct_evaluations: usize,
    /// Per-component relative tolerance of the convergence test.
    pub relative_tolerance: f64,
    /// Representable-step tolerance used when coalescing near-identical
    /// candidates.
    pub coalesce_ulps: u32,
    /// Normalized squared-distance limit below which a trial starting point
    /// counts as a duplicate of a pooled candidate.
    pub distance_limit: f64,
    /// Lower clamp for the per-iteration random sampling budget.
    pub sample_budget_min: usize,
    /// Upper clamp for the per-iteration random sampling budget.
    pub sample_budget_max: usize,
    /// Seed for the job's random source.
    pub seed: u64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            min_inverse_weight: 1e-6,
            outer_iterations: 10,
            max_solver_iterations: 768,
            max_solver_evaluations: 1024,
            max_direct_evaluations: 1000,
            relative_tolerance: 1e-10,
            coalesce_ulps: 2,
            distance_limit: 1e-8,
            sample_budget_min: 33,
            sample_budget_max: 3333,
            seed: 0,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.min_inverse_weight.is_finite() && self.min_inverse_weight > 0.0) {
            return Err(FitError::new("min_inverse_weight must be finite and > 0."));
        }
        if self.outer_iterations == 0 {
            return Err(FitError::new("outer_iterations must be >= 1."));
        }
        if self.max_solver_iterations == 0
            || self.max_solver_evaluations == 0
            || self.max_direct_evaluations == 0
        {
            return Err(FitError::new("Solver iteration and evaluation caps must be >= 1."));
        }
        if !(self.relative_tolerance.is_finite() && self.relative_tolerance > 0.0) {
            return Err(FitError::new("relative_tolerance must be finite and > 0."));
        }
        if !(self.distance_limit.is_finite() && self.distance_limit >= 0.0) {
            return Err(FitError::new("distance_limit must be finite and >= 0."));
        }
        if self.sample_budget_min == 0 || self.sample_budget_max < self.sample_budget_min {
            return Err(FitError::new("Sample budget clamp bounds are inverted or zero."));
        }
        Ok(())
    }

    /// Random starts tried per outer iteration.
    ///
    /// Grows as `3^k`: more parameters need proportionally more random starts
    /// to have a chance of bracketing the optimum. Clamped to the configured
    /// bounds.
    pub fn sample_budget(&self, parameter_count: usize) -> usize {
        3usize
            .saturating_pow(parameter_count as u32)
            .clamp(self.sample_budget_min, self.sample_budget_max)
    }
}

/// Best point observed across a whole fitting job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittingResult {
    /// Parameter vector of the best candidate.
    pub parameters: Vec<f64>,
    /// Root-mean-square of the weighted residuals at `parameters`.
    pub rms: f64,
    /// Sum of squared weighted residuals (not divided by the row count).
    pub sum_sq: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_matrix_rejects_short_and_non_finite_input() {
        assert!(SampleMatrix::from_pairs(&[(0.0, 1.0)]).is_err());
        assert!(SampleMatrix::from_pairs(&[(0.0, 1.0), (1.0, f64::NAN)]).is_err());
        assert!(SampleMatrix::from_pairs(&[(f64::INFINITY, 1.0), (1.0, 2.0)]).is_err());
    }

    #[test]
    fn sample_matrix_bounds_cover_both_columns() {
        let samples = SampleMatrix::from_pairs(&[(0.0, -3.0), (2.0, 5.0), (1.0, 1.0)]).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples.x_bounds(), (0.0, 2.0));
        assert_eq!(samples.y_bounds(), (-3.0, 5.0));
    }

    #[test]
    fn sample_budget_scales_with_parameter_count_and_clamps() {
        let config = FitConfig::default();
        // 3^2 = 9 sits below the lower clamp.
        assert_eq!(config.sample_budget(2), 33);
        // 3^5 = 243 sits between the clamps.
        assert_eq!(config.sample_budget(5), 243);
        // 3^9 = 19683 exceeds the upper clamp.
        assert_eq!(config.sample_budget(9), 3333);
    }

    #[test]
    fn config_validation_catches_bad_knobs() {
        let mut config = FitConfig::default();
        config.min_inverse_weight = 0.0;
        assert!(config.validate().is_err());

        let mut config = FitConfig::default();
        config.outer_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = FitConfig::default();
        config.sample_budget_max = config.sample_budget_min - 1;
        assert!(config.validate().is_err());

        assert!(FitConfig::default().validate().is_ok());
    }
}
