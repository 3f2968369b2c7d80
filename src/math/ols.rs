//! Linear least-squares sub-solves for the gradient-based refiners.
//!
//! Each Gauss-Newton iteration reduces to the linear problem:
//!
//! ```text
//! minimize ‖J δ − r‖
//! ```
//!
//! for the step `δ`, where `J` is the weighted model Jacobian and `r` the
//! weighted residual vector at the current point.
//!
//! Implementation choices:
//! - SVD rather than QR, because the system is tall (many more residuals than
//!   parameters) and nalgebra's `QR::solve` is intended for square systems.
//! - Near a flat region of the parameter space the gradient columns become
//!   nearly collinear, so we retry with progressively looser tolerances
//!   before declaring the step unsolvable.
//! - Parameter counts are tiny (usually 2–5 columns), so SVD cost is
//!   negligible next to the residual evaluations around it.

use nalgebra::{DMatrix, DVector};

/// Solve `min ‖A δ − b‖` via SVD.
///
/// Returns `None` if the inputs are not finite or the system is too
/// ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    // A non-finite residual or Jacobian entry means the current point is
    // numerically unusable; there is no step worth taking from it.
    if !b.iter().all(|v| v.is_finite()) || !a.iter().all(|v| v.is_finite()) {
        return None;
    }

    let svd = a.clone().svd(true, true);
    for &tolerance in &[1e-10, 1e-8, 1e-6] {
        if let Ok(step) = svd.solve(b, tolerance) {
            if step.iter().all(|v| v.is_finite()) {
                return Some(step);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_a_tall_linear_system() {
        // Fit delta for residuals of y = 2 + 3x at delta = (2, 3) from zero.
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let b = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let step = solve_least_squares(&a, &b).unwrap();
        assert!((step[0] - 2.0).abs() < 1e-10);
        assert!((step[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn rejects_non_finite_input() {
        let a = DMatrix::from_row_slice(2, 1, &[1.0, f64::NAN]);
        let b = DVector::from_row_slice(&[1.0, 2.0]);
        assert!(solve_least_squares(&a, &b).is_none());

        let a = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let b = DVector::from_row_slice(&[1.0, f64::INFINITY]);
        assert!(solve_least_squares(&a, &b).is_none());
    }
}
