//! The persisted estimator.
//!
//! Callers only ever need `predict`; which estimator sits behind it is chosen
//! at training time by `ModelKind` and dispatched with a `match`, the same way
//! for fitting and for prediction.

use serde::{Deserialize, Serialize};

use crate::domain::FeatureMatrix;
use crate::error::{PipelineError, PipelineResult};
use crate::models::forest::{ForestParams, RandomForest};
use crate::models::linear::LinearModel;

/// Which estimator to train.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Forest,
    Linear,
}

impl ModelKind {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Forest => "random forest",
            ModelKind::Linear => "linear least squares",
        }
    }
}

/// Estimator choice plus its hyperparameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub kind: ModelKind,
    pub forest: ForestParams,
}

/// A fitted estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    RandomForest(RandomForest),
    Linear(LinearModel),
}

impl ModelArtifact {
    /// Fit the configured estimator on `features` / `target`.
    pub fn fit(features: &FeatureMatrix, target: &[f64], config: &EstimatorConfig) -> PipelineResult<Self> {
        match config.kind {
            ModelKind::Forest => Ok(ModelArtifact::RandomForest(RandomForest::fit(
                features.values(),
                target,
                &config.forest,
            )?)),
            ModelKind::Linear => Ok(ModelArtifact::Linear(LinearModel::fit(features.values(), target)?)),
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ModelArtifact::RandomForest(_) => ModelKind::Forest,
            ModelArtifact::Linear(_) => ModelKind::Linear,
        }
    }

    /// Number of input features the estimator was fitted on.
    pub fn n_features(&self) -> usize {
        match self {
            ModelArtifact::RandomForest(m) => m.n_features(),
            ModelArtifact::Linear(m) => m.n_features(),
        }
    }

    /// Predict a single feature vector.
    ///
    /// # Panics
    /// Panics if `row` is shorter than `n_features()`. `predict` checks widths
    /// before calling this.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            ModelArtifact::RandomForest(m) => m.predict_row(row),
            ModelArtifact::Linear(m) => m.predict_row(row),
        }
    }

    /// Predict every row of a feature matrix.
    pub fn predict(&self, features: &FeatureMatrix) -> PipelineResult<Vec<f64>> {
        if features.n_features() != self.n_features() {
            return Err(PipelineError::internal(format!(
                "Model expects {} features, got {}",
                self.n_features(),
                features.n_features()
            )));
        }

        (0..features.n_rows())
            .map(|i| {
                let y = self.predict_row(&features.row(i));
                if y.is_finite() {
                    Ok(y)
                } else {
                    Err(PipelineError::internal(format!("Non-finite prediction for row {i}")))
                }
            })
            .collect()
    }

    /// Structural sanity check used when loading a bundle.
    pub(crate) fn is_well_formed(&self) -> bool {
        match self {
            ModelArtifact::RandomForest(m) => m.is_well_formed(),
            ModelArtifact::Linear(m) => m.is_well_formed(),
        }
    }
}
