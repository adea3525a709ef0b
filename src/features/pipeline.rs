//! The composed feature pipeline.
//!
//! `Validator -> Imputer -> Encoder` as one ordered, stateful transform:
//!
//! - `FeaturePipeline::fit` runs the validator, fits the imputer, applies it,
//!   and only then fits the encoder on the imputed data
//! - `FittedPipeline::transform` runs the same three steps using fitted state
//!   only; no statistic is recomputed
//!
//! Training and serving both go through `transform`, which is what keeps the
//! two contexts' feature representations identical.

use serde::{Deserialize, Serialize};

use crate::domain::{ColumnRoles, Dataset, FeatureMatrix, Value};
use crate::error::{PipelineError, PipelineResult};
use crate::features::encoder::FittedEncoder;
use crate::features::imputer::{FittedImputer, ImputeStrategy};
use crate::features::validator::{Mode, ValidationReport, validate};

/// Unfitted pipeline: role configuration plus fit options.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    roles: ColumnRoles,
    impute_strategy: ImputeStrategy,
}

/// Fitted pipeline state, ready to be bundled with a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub roles: ColumnRoles,
    pub imputer: FittedImputer,
    pub encoder: FittedEncoder,
}

/// Output of `FittedPipeline::transform`.
#[derive(Debug, Clone)]
pub struct Transformed {
    pub features: FeatureMatrix,
    /// Target values aligned with `features` rows (`Mode::Fit` only).
    pub target: Option<Vec<f64>>,
    pub report: ValidationReport,
}

impl FeaturePipeline {
    /// Build a pipeline, validating the role mapping up front.
    pub fn new(roles: ColumnRoles, impute_strategy: ImputeStrategy) -> PipelineResult<Self> {
        roles.validate()?;
        Ok(Self {
            roles,
            impute_strategy,
        })
    }

    pub fn roles(&self) -> &ColumnRoles {
        &self.roles
    }

    /// Fit imputer and encoder state on a training dataset.
    pub fn fit(&self, dataset: &Dataset) -> PipelineResult<FittedPipeline> {
        let (validated, report) = validate(dataset, &self.roles, Mode::Fit)?;
        if validated.is_empty() {
            return Err(PipelineError::InsufficientData(format!(
                "No rows left to fit on after validation ({} dropped)",
                report.rows_dropped
            )));
        }

        let imputer = FittedImputer::fit(&validated, &self.roles.impute, self.impute_strategy)?;
        let imputed = imputer.apply(&validated)?;

        let mut excluded = self.roles.ignore.clone();
        excluded.push(self.roles.target.clone());
        let encoder = FittedEncoder::fit(&imputed, &self.roles.categorical, &excluded)?;

        tracing::info!(
            rows = imputed.len(),
            features = encoder.feature_names().len(),
            "feature pipeline fitted"
        );

        Ok(FittedPipeline {
            roles: self.roles.clone(),
            imputer,
            encoder,
        })
    }
}

impl FittedPipeline {
    /// Ordered feature names this pipeline guarantees to produce.
    pub fn feature_names(&self) -> &[String] {
        self.encoder.feature_names()
    }

    /// Validate, impute and encode using fitted state only.
    pub fn transform(&self, dataset: &Dataset, mode: Mode) -> PipelineResult<Transformed> {
        let (validated, report) = validate(dataset, &self.roles, mode)?;
        let imputed = self.imputer.apply(&validated)?;
        let features = self.encoder.apply(&imputed)?;

        let target = match mode {
            Mode::Fit => Some(target_values(&imputed, &self.roles.target)?),
            Mode::Serve => None,
        };

        Ok(Transformed {
            features,
            target,
            report,
        })
    }
}

fn target_values(dataset: &Dataset, target: &str) -> PipelineResult<Vec<f64>> {
    dataset
        .column(target)?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Value::Number(y) => Ok(*y),
            other => Err(PipelineError::validation(format!(
                "Row {row}: target `{target}` must be numeric, got {other:?}"
            ))),
        })
        .collect()
}
