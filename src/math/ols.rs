//! Least squares solver.
//!
//! The linear estimator solves
//!
//! ```text
//! minimize Σ (y_i - b - x_i^T β)^2
//! ```
//!
//! by prepending an intercept column and solving with SVD. One-hot blocks
//! plus an intercept are rank-deficient by construction (each block sums to
//! 1), so a plain normal-equations solve is not an option; SVD with a
//! singular-value tolerance returns the minimum-norm solution instead.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if no tolerance yields a finite solution.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if the strict solve fails.
    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// `[1 | x]`: the design matrix with an intercept column in front.
pub fn with_intercept(x: &DMatrix<f64>) -> DMatrix<f64> {
    x.clone().insert_column(0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = with_intercept(&DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 2.0]));
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn rank_deficient_one_hot_design_still_fits() {
        // Two one-hot slots that always sum to 1, plus the intercept.
        let x = with_intercept(&DMatrix::from_row_slice(
            4,
            2,
            &[1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0],
        ));
        let y = DVector::from_row_slice(&[10.0, 10.0, 20.0, 20.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        let fitted = &x * &beta;
        for (f, t) in fitted.iter().zip(y.iter()) {
            assert!((f - t).abs() < 1e-8, "fitted {f} vs {t}");
        }
    }
}
