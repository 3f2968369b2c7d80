//! The capabilities a function family exposes to the fitting engine.

use rand::{Rng, RngCore};

use crate::domain::SampleMatrix;

/// A family of unary functions parameterized by a fixed-length vector.
///
/// Value and gradient must be pure; all state that varies during a fit lives
/// in the parameter vector the engine owns.
pub trait ParametricFunction: Sync {
    /// Length `k` of the parameter vector.
    fn parameter_count(&self) -> usize;

    /// `f(x; params)`.
    fn value(&self, x: f64, params: &[f64]) -> f64;

    /// Fill `out` (length `k`) with `∂f/∂p_j` at `x`.
    fn gradient(&self, x: f64, params: &[f64], out: &mut [f64]);

    /// Initial-guess strategy for this family over the given samples.
    ///
    /// Families with exploitable structure override this; the default scales
    /// uniform draws to the magnitude of the observed values.
    fn guesser(&self, samples: &SampleMatrix) -> Box<dyn ParameterGuesser> {
        Box::new(MagnitudeGuesser::new(samples))
    }
}

/// Fills a caller-provided buffer with a plausible initial parameter vector.
pub trait ParameterGuesser {
    fn fill(&self, rng: &mut dyn RngCore, out: &mut [f64]);
}

/// Fallback guesser: uniform draws in `[-scale, scale]` where `scale` is the
/// largest observed `|y|` (floored at 1 so flat data still gets spread).
pub struct MagnitudeGuesser {
    scale: f64,
}

impl MagnitudeGuesser {
    pub fn new(samples: &SampleMatrix) -> Self {
        let (y_min, y_max) = samples.y_bounds();
        Self {
            scale: y_min.abs().max(y_max.abs()).max(1.0),
        }
    }
}

impl ParameterGuesser for MagnitudeGuesser {
    fn fill(&self, rng: &mut dyn RngCore, out: &mut [f64]) {
        for slot in out.iter_mut() {
            *slot = rng.gen_range(-self.scale..=self.scale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    #[test]
    fn magnitude_guesser_stays_within_observed_scale() {
        let samples = SampleMatrix::from_pairs(&[(0.0, -40.0), (1.0, 25.0)]).unwrap();
        let guesser = MagnitudeGuesser::new(&samples);
        let mut rng = StdRng::seed_from_u64(7);
        let mut out = [0.0; 4];
        for _ in 0..100 {
            guesser.fill(&mut rng, &mut out);
            for v in out {
                assert!(v.is_finite() && v.abs() <= 40.0, "guess out of range: {v}");
            }
        }
    }
}
