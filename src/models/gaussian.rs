//! Gaussian bump `f(x) = a·exp(-(x - b)² / (2c²))`.

use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

use crate::domain::SampleMatrix;
use crate::models::{ParameterGuesser, ParametricFunction};

/// Three parameters: amplitude `a`, center `b`, width `c`.
///
/// A zero width produces non-finite values; the engine treats those as
/// numerically unusable points rather than errors.
#[derive(Debug, Clone, Copy)]
pub struct Gaussian;

impl ParametricFunction for Gaussian {
    fn parameter_count(&self) -> usize {
        3
    }

    fn value(&self, x: f64, params: &[f64]) -> f64 {
        let offset = x - params[1];
        let width = params[2];
        params[0] * (-(offset * offset) / (2.0 * width * width)).exp()
    }

    fn gradient(&self, x: f64, params: &[f64], out: &mut [f64]) {
        let amplitude = params[0];
        let offset = x - params[1];
        let width = params[2];
        let bump = (-(offset * offset) / (2.0 * width * width)).exp();
        out[0] = bump;
        out[1] = amplitude * bump * offset / (width * width);
        out[2] = amplitude * bump * offset * offset / (width * width * width);
    }

    fn guesser(&self, samples: &SampleMatrix) -> Box<dyn ParameterGuesser> {
        Box::new(GaussianGuesser::new(samples))
    }
}

/// Centers the bump inside the observed x-range, takes the width as a fraction
/// of the x-span, and jitters the amplitude around the extreme observation.
pub struct GaussianGuesser {
    x_min: f64,
    x_max: f64,
    span: f64,
    peak: f64,
}

impl GaussianGuesser {
    pub fn new(samples: &SampleMatrix) -> Self {
        let (x_min, x_max) = samples.x_bounds();
        let mut peak = samples.y(0);
        for i in 1..samples.len() {
            if samples.y(i).abs() > peak.abs() {
                peak = samples.y(i);
            }
        }
        Self {
            x_min,
            x_max,
            span: (x_max - x_min).max(1e-3),
            peak,
        }
    }
}

impl ParameterGuesser for GaussianGuesser {
    fn fill(&self, rng: &mut dyn RngCore, out: &mut [f64]) {
        let jitter: f64 = rng.sample(StandardNormal);
        out[0] = self.peak * (1.0 + 0.25 * jitter);
        out[1] = rng.gen_range(self.x_min..=self.x_max);
        out[2] = self.span * rng.gen_range(0.05..=0.5);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;

    #[test]
    fn gradient_matches_finite_differences() {
        let params = [3.0, 1.2, 0.6];
        let x = 1.5;
        let mut analytic = [0.0; 3];
        Gaussian.gradient(x, &params, &mut analytic);
        for j in 0..3 {
            let h = 1e-6;
            let mut up = params;
            let mut down = params;
            up[j] += h;
            down[j] -= h;
            let numeric = (Gaussian.value(x, &up) - Gaussian.value(x, &down)) / (2.0 * h);
            assert!(
                (analytic[j] - numeric).abs() < 1e-5,
                "parameter {j}: analytic {} vs numeric {numeric}",
                analytic[j]
            );
        }
    }

    #[test]
    fn guesser_centers_inside_x_range_with_positive_width() {
        let samples =
            SampleMatrix::from_pairs(&[(-2.0, 0.1), (0.0, 4.0), (2.0, 0.2)]).unwrap();
        let guesser = GaussianGuesser::new(&samples);
        let mut rng = StdRng::seed_from_u64(3);
        let mut out = [0.0; 3];
        for _ in 0..100 {
            guesser.fill(&mut rng, &mut out);
            assert!(out[1] >= -2.0 && out[1] <= 2.0, "center drifted: {}", out[1]);
            assert!(out[2] > 0.0, "width must be positive: {}", out[2]);
        }
    }
}
