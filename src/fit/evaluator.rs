//! Weighted residual evaluation and best-point tracking.
//!
//! Each sample row is scaled by the inverse weight `max(|y_i|, floor)`, so
//! large observations do not drown out small ones and rows with `y_i` near
//! zero do not blow up the objective. The sum of squared residuals is
//! accumulated with compensated summation: residual counts can run into the
//! thousands, and the optimizers steer by small differences between nearby
//! objective values that naive accumulation would wash out.
//!
//! Every evaluation, full or value-only, feeds the best-point tracker. That
//! tracker is the job's safety net: whichever refinement stage happens to be
//! running, the best point ever evaluated is never lost.

use nalgebra::{DMatrix, DVector};

use crate::domain::{FittingResult, SampleMatrix};
use crate::math::CompensatedSum;
use crate::models::ParametricFunction;
use crate::solvers::{ResidualEvaluation, ResidualObjective, ScalarObjective};

/// One full evaluation: weighted residuals, model Jacobian, and quality.
pub struct Evaluation {
    pub residuals: DVector<f64>,
    pub jacobian: DMatrix<f64>,
    pub rms: f64,
    pub sum_sq: f64,
}

/// Computes weighted residuals and quality for candidate parameter vectors.
pub struct Evaluator<'a> {
    samples: &'a SampleMatrix,
    function: &'a dyn ParametricFunction,
    min_inverse_weight: f64,
    gradient: Vec<f64>,
    best: Option<FittingResult>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        samples: &'a SampleMatrix,
        function: &'a dyn ParametricFunction,
        min_inverse_weight: f64,
    ) -> Self {
        Self {
            samples,
            function,
            min_inverse_weight,
            gradient: vec![0.0; function.parameter_count()],
            best: None,
        }
    }

    /// Weighted residuals, Jacobian, and quality at `params`.
    ///
    /// Non-finite outputs are valid results describing a numerically unusable
    /// point; comparison logic downstream ignores them via IEEE semantics.
    pub fn evaluate(&mut self, params: &[f64]) -> Evaluation {
        let m = self.samples.len();
        let k = self.gradient.len();
        let mut residuals = DVector::zeros(m);
        let mut jacobian = DMatrix::zeros(m, k);
        let mut sum = CompensatedSum::default();

        for i in 0..m {
            let x = self.samples.x(i);
            let inverse_weight = self.samples.y(i).abs().max(self.min_inverse_weight);
            let residual = (self.samples.y(i) - self.function.value(x, params)) / inverse_weight;
            residuals[i] = residual;
            sum.add(residual * residual);

            self.function.gradient(x, params, &mut self.gradient);
            for j in 0..k {
                jacobian[(i, j)] = self.gradient[j] / inverse_weight;
            }
        }

        let sum_sq = sum.value();
        let rms = (sum_sq / m as f64).sqrt();
        self.track(params, rms, sum_sq);
        Evaluation {
            residuals,
            jacobian,
            rms,
            sum_sq,
        }
    }

    /// Quality only, no Jacobian. Used by random sampling and the simplex.
    pub fn quality(&mut self, params: &[f64]) -> f64 {
        let m = self.samples.len();
        let mut sum = CompensatedSum::default();
        for i in 0..m {
            let x = self.samples.x(i);
            let inverse_weight = self.samples.y(i).abs().max(self.min_inverse_weight);
            let residual = (self.samples.y(i) - self.function.value(x, params)) / inverse_weight;
            sum.add(residual * residual);
        }
        let sum_sq = sum.value();
        let rms = (sum_sq / m as f64).sqrt();
        self.track(params, rms, sum_sq);
        rms
    }

    fn track(&mut self, params: &[f64], rms: f64, sum_sq: f64) {
        let adopt = match &self.best {
            // Adopt the first evaluation unconditionally so a result always
            // exists, even if every point turns out numerically unusable.
            None => true,
            Some(best) => rms < best.rms || (rms.is_finite() && !best.rms.is_finite()),
        };
        if adopt {
            self.best = Some(FittingResult {
                parameters: params.to_vec(),
                rms,
                sum_sq,
            });
        }
    }

    /// Best point seen so far across all evaluations.
    pub fn best(&self) -> Option<&FittingResult> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<FittingResult> {
        self.best
    }
}

impl ResidualObjective for Evaluator<'_> {
    fn evaluate(&mut self, params: &[f64]) -> ResidualEvaluation {
        let evaluation = Evaluator::evaluate(self, params);
        ResidualEvaluation {
            residuals: evaluation.residuals,
            jacobian: evaluation.jacobian,
            rms: evaluation.rms,
        }
    }
}

impl ScalarObjective for Evaluator<'_> {
    fn cost(&mut self, params: &[f64]) -> f64 {
        self.quality(params)
    }
}
