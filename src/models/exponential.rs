//! Exponential family `f(x) = a·exp(b·x) + c`.

use rand::{Rng, RngCore};

use crate::domain::SampleMatrix;
use crate::models::{ParameterGuesser, ParametricFunction};

/// Three parameters: amplitude `a`, rate `b`, offset `c`.
#[derive(Debug, Clone, Copy)]
pub struct Exponential;

impl ParametricFunction for Exponential {
    fn parameter_count(&self) -> usize {
        3
    }

    fn value(&self, x: f64, params: &[f64]) -> f64 {
        params[0] * (params[1] * x).exp() + params[2]
    }

    fn gradient(&self, x: f64, params: &[f64], out: &mut [f64]) {
        let growth = (params[1] * x).exp();
        out[0] = growth;
        out[1] = params[0] * x * growth;
        out[2] = 1.0;
    }

    fn guesser(&self, samples: &SampleMatrix) -> Box<dyn ParameterGuesser> {
        Box::new(ExponentialGuesser::new(samples))
    }
}

/// Brackets the rate by the observed x-span so `exp(b·x)` stays within a few
/// decades over the data, and the amplitude/offset by the y-bounds.
pub struct ExponentialGuesser {
    rate_bound: f64,
    amplitude_scale: f64,
    y_min: f64,
    y_max: f64,
}

impl ExponentialGuesser {
    pub fn new(samples: &SampleMatrix) -> Self {
        let (x_min, x_max) = samples.x_bounds();
        let span = (x_max - x_min).max(1e-3);
        let (y_min, y_max) = samples.y_bounds();
        Self {
            rate_bound: 3.0 / span,
            amplitude_scale: y_min.abs().max(y_max.abs()).max(1.0),
            y_min,
            y_max,
        }
    }
}

impl ParameterGuesser for ExponentialGuesser {
    fn fill(&self, rng: &mut dyn RngCore, out: &mut [f64]) {
        out[0] = rng.gen_range(-self.amplitude_scale..=self.amplitude_scale);
        out[1] = rng.gen_range(-self.rate_bound..=self.rate_bound);
        out[2] = rng.gen_range(self.y_min..=self.y_max);
    }
}
