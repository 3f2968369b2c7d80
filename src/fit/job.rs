//! The fitting job driver.
//!
//! One job owns everything mutable about a fit: the candidate pool, the
//! evaluator's scratch buffers and best-point tracker, and the random source.
//! A job is strictly single-threaded; run many independent jobs for
//! parallelism (see `fit_many`).
//!
//! Each outer iteration:
//!
//! - draws a randomized starting point and screens a budget of further draws,
//!   keeping the best one that is distinct from everything already pooled
//! - pushes the winner through the refinement pipeline: least squares, then
//!   direct search, then least squares once more (a simplex can land in a
//!   region where the gradient-based solvers converge further)
//! - coalesces every retained candidate so independently-found duplicates
//!   share one record

use rand::prelude::*;
use rand::rngs::StdRng;

use crate::domain::{FitConfig, FittingResult, SampleMatrix};
use crate::error::FitError;
use crate::fit::convergence::ConvergenceChecker;
use crate::fit::evaluator::Evaluator;
use crate::fit::pool::CandidatePool;
use crate::fit::stages::{DirectSearchStage, LeastSquaresStage, RefinementStage, StageContext};
use crate::models::ParametricFunction;

/// A single fitting task over one sample table and one function family.
pub struct FitJob<'a> {
    samples: &'a SampleMatrix,
    function: &'a dyn ParametricFunction,
    config: FitConfig,
    rng: StdRng,
}

impl<'a> FitJob<'a> {
    /// Validates the configuration up front so `fit` itself cannot fail.
    pub fn new(
        samples: &'a SampleMatrix,
        function: &'a dyn ParametricFunction,
        config: FitConfig,
    ) -> Result<Self, FitError> {
        config.validate()?;
        if function.parameter_count() == 0 {
            return Err(FitError::new("Function must expose at least one parameter."));
        }
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            samples,
            function,
            config,
            rng,
        })
    }

    /// Run the whole multi-start search and return the best point observed.
    ///
    /// Always produces a result: if every refinement stage fails, the best
    /// point found during pure random sampling is returned.
    pub fn fit(&mut self) -> FittingResult {
        let k = self.function.parameter_count();
        let mut evaluator =
            Evaluator::new(self.samples, self.function, self.config.min_inverse_weight);
        let checker = ConvergenceChecker::new(
            self.config.max_solver_iterations,
            self.config.relative_tolerance,
        );
        // Worst case each outer iteration retains the initial candidate plus
        // one output per pipeline stage: four distinct records.
        let mut pool = CandidatePool::new(
            4 * self.config.outer_iterations,
            k,
            self.config.coalesce_ulps,
        );
        let guesser = self.function.guesser(self.samples);
        let least_squares = LeastSquaresStage::standard(&self.config);
        let direct_search = DirectSearchStage::standard(&self.config);
        let budget = self.config.sample_budget(k);
        let mut scratch = vec![0.0; k];

        for _ in 0..self.config.outer_iterations {
            let mut current = pool.create();
            guesser.fill(&mut self.rng, pool.get_mut(current).solution_mut());
            let quality = evaluator.quality(pool.get(current).solution());
            pool.get_mut(current).set_quality(quality);

            // Cheap screening: keep the best-scoring random start that is
            // sufficiently distinct from everything already pooled.
            for _ in 0..budget {
                guesser.fill(&mut self.rng, &mut scratch);
                let quality = evaluator.quality(&scratch);
                if quality < pool.get(current).quality()
                    && pool.is_unique(&scratch, self.config.distance_limit)
                {
                    let record = pool.get_mut(current);
                    record.solution_mut().copy_from_slice(&scratch);
                    record.set_quality(quality);
                }
            }
            current = pool.try_coalesce(current);

            let mut next = pool.create();
            if least_squares.refine(
                &mut StageContext {
                    pool: &mut pool,
                    evaluator: &mut evaluator,
                    checker: &checker,
                },
                current,
                next,
            ) {
                current = pool.try_coalesce(next);
                next = pool.create();
            }
            if direct_search.refine(
                &mut StageContext {
                    pool: &mut pool,
                    evaluator: &mut evaluator,
                    checker: &checker,
                },
                current,
                next,
            ) {
                current = pool.try_coalesce(next);
                next = pool.create();
            }
            if least_squares.refine(
                &mut StageContext {
                    pool: &mut pool,
                    evaluator: &mut evaluator,
                    checker: &checker,
                },
                current,
                next,
            ) {
                pool.try_coalesce(next);
            } else {
                pool.dispose();
            }
        }

        // At least one random start was evaluated per outer iteration, so the
        // tracker is populated for any validated configuration.
        evaluator.into_best().unwrap_or_else(|| FittingResult {
            parameters: vec![0.0; k],
            rms: f64::INFINITY,
            sum_sq: f64::INFINITY,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gaussian, ParametricFunction, Polynomial};

    #[test]
    fn recovers_an_exact_linear_fit() {
        // y = x through the first ten integers; the multi-start search plus a
        // gradient-based pass must land on the exact line.
        let pairs: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, i as f64)).collect();
        let samples = SampleMatrix::from_pairs(&pairs).unwrap();
        let line = Polynomial::linear();
        let config = FitConfig {
            seed: 42,
            ..FitConfig::default()
        };
        let mut job = FitJob::new(&samples, &line, config).unwrap();
        let result = job.fit();

        assert!(result.rms <= 1e-6, "rms: {}", result.rms);
        assert!(
            (result.parameters[0]).abs() < 1e-4,
            "intercept: {}",
            result.parameters[0]
        );
        assert!(
            (result.parameters[1] - 1.0).abs() < 1e-4,
            "slope: {}",
            result.parameters[1]
        );
    }

    #[test]
    fn recovers_a_gaussian_bump() {
        let true_params = [3.0, 0.5, 0.8];
        let pairs: Vec<(f64, f64)> = (0..30)
            .map(|i| {
                let x = -2.0 + i as f64 * 0.17;
                (x, Gaussian.value(x, &true_params))
            })
            .collect();
        let samples = SampleMatrix::from_pairs(&pairs).unwrap();
        let config = FitConfig {
            seed: 7,
            ..FitConfig::default()
        };
        let mut job = FitJob::new(&samples, &Gaussian, config).unwrap();
        let result = job.fit();
        assert!(result.rms < 1e-4, "rms: {}", result.rms);
    }

    #[test]
    fn identical_seeds_give_identical_results() {
        let pairs: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 2.0 + 0.5 * i as f64)).collect();
        let samples = SampleMatrix::from_pairs(&pairs).unwrap();
        let line = Polynomial::linear();
        let config = FitConfig {
            seed: 99,
            ..FitConfig::default()
        };

        let first = FitJob::new(&samples, &line, config.clone()).unwrap().fit();
        let second = FitJob::new(&samples, &line, config).unwrap().fit();
        assert_eq!(first.parameters, second.parameters);
        assert_eq!(first.rms.to_bits(), second.rms.to_bits());
    }

    struct AlwaysNan;

    impl ParametricFunction for AlwaysNan {
        fn parameter_count(&self) -> usize {
            2
        }
        fn value(&self, _x: f64, _params: &[f64]) -> f64 {
            f64::NAN
        }
        fn gradient(&self, _x: f64, _params: &[f64], out: &mut [f64]) {
            out.fill(f64::NAN);
        }
    }

    #[test]
    fn a_fully_unusable_function_still_yields_a_result() {
        let samples = SampleMatrix::from_pairs(&[(0.0, 1.0), (1.0, 2.0)]).unwrap();
        let config = FitConfig {
            // Keep the run short; every evaluation is NaN anyway.
            outer_iterations: 2,
            ..FitConfig::default()
        };
        let mut job = FitJob::new(&samples, &AlwaysNan, config).unwrap();
        let result = job.fit();
        assert_eq!(result.parameters.len(), 2);
        assert!(!result.rms.is_finite());
    }

    #[test]
    fn rejects_a_zero_parameter_function() {
        struct Empty;
        impl ParametricFunction for Empty {
            fn parameter_count(&self) -> usize {
                0
            }
            fn value(&self, _x: f64, _params: &[f64]) -> f64 {
                0.0
            }
            fn gradient(&self, _x: f64, _params: &[f64], _out: &mut [f64]) {}
        }
        let samples = SampleMatrix::from_pairs(&[(0.0, 1.0), (1.0, 2.0)]).unwrap();
        assert!(FitJob::new(&samples, &Empty, FitConfig::default()).is_err());
    }
}
