//! The multi-start fitting engine.
//!
//! Responsibilities:
//!
//! - evaluate weighted residuals and track the best point seen (`evaluator`)
//! - pool, deduplicate, and coalesce retained candidates (`pool`)
//! - refine candidates through pluggable local searches (`stages`)
//! - drive random restarts over the whole pipeline (`job`)
//! - run independent jobs in parallel (`fit_many`)

pub mod convergence;
pub mod evaluator;
pub mod job;
pub mod pool;
pub mod stages;

pub use convergence::*;
pub use evaluator::*;
pub use job::*;
pub use pool::*;
pub use stages::*;

use rayon::prelude::*;

use crate::domain::{FitConfig, FittingResult, SampleMatrix};
use crate::error::FitError;
use crate::models::ParametricFunction;

/// Fit several function families against the same samples, one independent
/// job per family on the rayon pool.
///
/// Each job gets its own random source derived from the configured seed and
/// the task index, so results are deterministic regardless of scheduling and
/// no mutable state crosses job boundaries.
pub fn fit_many(
    samples: &SampleMatrix,
    functions: &[Box<dyn ParametricFunction>],
    config: &FitConfig,
) -> Vec<Result<FittingResult, FitError>> {
    functions
        .par_iter()
        .enumerate()
        .map(|(index, function)| {
            let mut task_config = config.clone();
            task_config.seed = config.seed.wrapping_add(index as u64);
            FitJob::new(samples, function.as_ref(), task_config).map(|mut job| job.fit())
        })
        .collect()
}
