//! Ordinary least squares regressor (intercept + one coefficient per feature).

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::math::{solve_least_squares, with_intercept};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn fit(x: &DMatrix<f64>, y: &[f64]) -> PipelineResult<Self> {
        if x.nrows() == 0 {
            return Err(PipelineError::training("Cannot fit a linear model on an empty feature matrix"));
        }
        if y.len() != x.nrows() {
            return Err(PipelineError::training(format!(
                "Target has {} values for {} feature rows",
                y.len(),
                x.nrows()
            )));
        }

        let design = with_intercept(x);
        let target = DVector::from_column_slice(y);
        let beta = solve_least_squares(&design, &target)
            .ok_or_else(|| PipelineError::training("Least squares solve failed (ill-conditioned design)"))?;

        Ok(Self {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
        })
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        self.intercept.is_finite() && self.coefficients.iter().all(|c| c.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_linear_relationship() {
        // y = 1 + 2a - b
        let rows = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [2.0, 3.0], [4.0, 1.0]];
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        let x = DMatrix::from_row_slice(rows.len(), 2, &flat);
        let y: Vec<f64> = rows.iter().map(|r| 1.0 + 2.0 * r[0] - r[1]).collect();

        let model = LinearModel::fit(&x, &y).unwrap();
        assert!((model.intercept() - 1.0).abs() < 1e-9);
        assert!((model.coefficients()[0] - 2.0).abs() < 1e-9);
        assert!((model.predict_row(&[3.0, 2.0]) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn mismatched_target_is_a_training_error() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        assert!(matches!(LinearModel::fit(&x, &[1.0]), Err(PipelineError::Training(_))));
    }
}
