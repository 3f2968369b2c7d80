//! Compensated (Kahan) accumulation for sums of squared residuals.
//!
//! Residual counts can run into the thousands, and the optimizers steer by
//! small differences between nearby objective values. Naive accumulation
//! loses low-order bits on every add; the compensated form carries the
//! rounding error forward and re-applies it.

/// Running sum with error compensation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    /// Add one term to the running sum.
    pub fn add(&mut self, value: f64) {
        let corrected = value - self.compensation;
        let next = self.sum + corrected;
        self.compensation = (next - self.sum) - corrected;
        self.sum = next;
    }

    /// Current value of the sum.
    pub fn value(&self) -> f64 {
        self.sum
    }
}
