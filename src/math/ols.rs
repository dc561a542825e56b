//! Least squares solver and the straight-line fit used by the uncertainty encoder.
//!
//! The encoder approximates a non-linear default-probability angle curve with a
//! degree-1 polynomial, so we solve a tiny `n x 2` least squares problem:
//!
//! ```text
//! minimize Σ (y_j - (b + a·x_j))^2
//! ```
//!
//! SVD is used so that the tall design matrix is handled robustly
//! (nalgebra's `QR::solve` expects square systems).

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Slope and intercept of an ordinary least squares line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    pub fn eval(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit `y ≈ intercept + slope·x`.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<LineFit, AppError> {
    if x.len() != y.len() {
        return Err(AppError::invalid(
            "regression samples",
            format!("x has {} points but y has {}", x.len(), y.len()),
        ));
    }
    if x.len() < 2 {
        return Err(AppError::invalid("regression samples", "need at least 2 points"));
    }

    let design = DMatrix::from_fn(x.len(), 2, |i, j| if j == 0 { 1.0 } else { x[i] });
    let rhs = DVector::from_column_slice(y);
    let beta = solve_least_squares(&design, &rhs)
        .ok_or_else(|| AppError::invalid("regression samples", "design matrix is singular"))?;

    Ok(LineFit {
        intercept: beta[0],
        slope: beta[1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn regression_matches_closed_form_on_noisy_points() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 2.9, 5.2, 6.9];
        let fit = linear_regression(&x, &y).unwrap();

        let mx = x.iter().sum::<f64>() / 4.0;
        let my = y.iter().sum::<f64>() / 4.0;
        let cov: f64 = x.iter().zip(&y).map(|(a, b)| (a - mx) * (b - my)).sum();
        let var: f64 = x.iter().map(|a| (a - mx) * (a - mx)).sum();
        assert!((fit.slope - cov / var).abs() < 1e-10);
        assert!((fit.intercept - (my - cov / var * mx)).abs() < 1e-10);
        assert!((fit.eval(1.5) - (fit.intercept + 1.5 * fit.slope)).abs() < 1e-15);
    }

    #[test]
    fn regression_rejects_length_mismatch() {
        let err = linear_regression(&[0.0, 1.0], &[1.0]).unwrap_err();
        assert!(err.is_validation());
    }
}
