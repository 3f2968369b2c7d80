//! Refinement stages.
//!
//! Every stage has the same narrow shape: read a source candidate, attempt
//! one local-search procedure, and write a destination candidate only when
//! the result strictly improves quality. The driver composes stages without
//! knowing what runs inside them, so stages can be added, removed, or
//! reordered without touching the loop.
//!
//! Stages record which candidates they have already consumed through the
//! pool's bitmasks, and any numerical distress inside a solver is contained
//! here as "no improvement" rather than aborting the whole search.

use crate::domain::FitConfig;
use crate::fit::convergence::ConvergenceChecker;
use crate::fit::evaluator::Evaluator;
use crate::fit::pool::{
    CandidatePool, STAGE_GAUSS_NEWTON, STAGE_LEAST_SQUARES, STAGE_LEVENBERG, STAGE_SIMPLEX,
};
use crate::solvers::{
    DirectSolver, GaussNewton, LeastSquaresSolver, LevenbergMarquardt, NelderMead,
};

/// Everything a stage needs for one refinement attempt.
pub struct StageContext<'a, 'data> {
    pub pool: &'a mut CandidatePool,
    pub evaluator: &'a mut Evaluator<'data>,
    pub checker: &'a ConvergenceChecker,
}

/// Uniform capability implemented by every refinement procedure.
pub trait RefinementStage {
    /// Attempt to improve `source` into `dest`. Returns `true` only when
    /// `dest` now holds a strictly better candidate; on failure `dest` is
    /// left untouched.
    fn refine(&self, ctx: &mut StageContext<'_, '_>, source: usize, dest: usize) -> bool;
}

/// Gradient-based refinement: solver variants tried in order, each tagged
/// with its own stage bit.
pub struct LeastSquaresStage {
    variants: Vec<(u32, Box<dyn LeastSquaresSolver>)>,
}

impl LeastSquaresStage {
    pub fn new(variants: Vec<(u32, Box<dyn LeastSquaresSolver>)>) -> Self {
        Self { variants }
    }

    /// The standard pairing: Gauss-Newton first, Levenberg-Marquardt second.
    pub fn standard(config: &FitConfig) -> Self {
        Self::new(vec![
            (
                STAGE_GAUSS_NEWTON,
                Box::new(GaussNewton::new(config.max_solver_evaluations)),
            ),
            (
                STAGE_LEVENBERG,
                Box::new(LevenbergMarquardt::new(config.max_solver_evaluations)),
            ),
        ])
    }
}

impl RefinementStage for LeastSquaresStage {
    fn refine(&self, ctx: &mut StageContext<'_, '_>, source: usize, dest: usize) -> bool {
        for (bit, solver) in &self.variants {
            let record = ctx.pool.get_mut(source);
            if record.is_processed(*bit) {
                continue;
            }
            record.mark_processed(*bit);
            let start = record.solution().to_vec();
            let source_quality = record.quality();

            // One solver's numerical distress must not abort the search.
            let Ok(outcome) = solver.minimize(&mut *ctx.evaluator, &start, ctx.checker) else {
                continue;
            };

            if outcome.rms.is_finite() && outcome.rms < source_quality {
                let dest_record = ctx.pool.get_mut(dest);
                dest_record.solution_mut().copy_from_slice(&outcome.point);
                dest_record.set_quality(outcome.rms);
                // The output is already a least-squares fixed point; neither
                // gradient-based variant needs to see it again.
                dest_record.mark_processed(STAGE_LEAST_SQUARES);
                return true;
            }
        }
        false
    }
}

/// Derivative-free refinement via simplex search.
pub struct DirectSearchStage {
    solver: Box<dyn DirectSolver>,
    max_evaluations: usize,
}

impl DirectSearchStage {
    pub fn new(solver: Box<dyn DirectSolver>, max_evaluations: usize) -> Self {
        Self {
            solver,
            max_evaluations,
        }
    }

    pub fn standard(config: &FitConfig) -> Self {
        Self::new(
            Box::new(NelderMead::default()),
            config.max_direct_evaluations,
        )
    }
}

impl RefinementStage for DirectSearchStage {
    fn refine(&self, ctx: &mut StageContext<'_, '_>, source: usize, dest: usize) -> bool {
        let record = ctx.pool.get_mut(source);
        if record.is_processed(STAGE_SIMPLEX) {
            return false;
        }
        record.mark_processed(STAGE_SIMPLEX);
        let start = record.solution().to_vec();
        let source_quality = record.quality();

        let Ok(outcome) =
            self.solver
                .minimize(&mut *ctx.evaluator, &start, self.max_evaluations)
        else {
            return false;
        };

        if outcome.rms.is_finite() && outcome.rms < source_quality {
            let dest_record = ctx.pool.get_mut(dest);
            dest_record.solution_mut().copy_from_slice(&outcome.point);
            dest_record.set_quality(outcome.rms);
            // A simplex output is a fresh target for the gradient-based
            // variants, so its mask stays clear.
            return true;
        }
        false
    }
}
