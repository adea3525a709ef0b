//! Shared training workflow used by the `train` command and integration tests.
//!
//! CSV ingest -> pipeline fit -> transform -> train/evaluate -> bundle -> save
//!
//! The front-end only has to turn arguments into a `TrainingConfig` and print
//! the resulting `TrainingRun`.

use std::path::PathBuf;

use chrono::Utc;

use crate::artifact::{self, ArtifactBundle};
use crate::domain::{ColumnRoles, Dataset};
use crate::error::{AppError, PipelineError, PipelineResult};
use crate::features::{FeaturePipeline, ImputeStrategy, Mode, ValidationReport};
use crate::io::{RunReport, load_dataset, write_run_report};
use crate::training::{TrainerConfig, train};

/// Everything `run_training` needs.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub data: PathBuf,
    pub artifact: PathBuf,
    pub report: Option<PathBuf>,
    pub roles: ColumnRoles,
    pub impute_strategy: ImputeStrategy,
    pub trainer: TrainerConfig,
}

/// All outputs of one `whcap train` run.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub bundle: ArtifactBundle,
    pub report: RunReport,
}

/// Fit the pipeline and model on an in-memory dataset and assemble a bundle.
///
/// Returns the bundle plus the validation report of the training transform.
pub fn fit_bundle(
    dataset: &Dataset,
    pipeline: &FeaturePipeline,
    trainer: &TrainerConfig,
) -> PipelineResult<(ArtifactBundle, ValidationReport)> {
    let fitted = pipeline.fit(dataset)?;
    let transformed = fitted.transform(dataset, Mode::Fit)?;
    let target = transformed
        .target
        .ok_or_else(|| PipelineError::internal("Fit-mode transform produced no target"))?;

    let outcome = train(&transformed.features, &target, trainer)?;
    let bundle = ArtifactBundle::new(fitted, outcome.model, outcome.metrics)?;
    Ok((bundle, transformed.report))
}

/// Execute the full training workflow and persist the bundle.
pub fn run_training(config: &TrainingConfig) -> Result<TrainingRun, AppError> {
    let pipeline = FeaturePipeline::new(config.roles.clone(), config.impute_strategy)?;

    let ingest = load_dataset(&config.data, pipeline.roles())?;
    let (bundle, validation) = fit_bundle(&ingest.dataset, &pipeline, &config.trainer)?;
    artifact::save(&bundle, &config.artifact)?;

    let report = RunReport {
        data: config.data.clone(),
        artifact: config.artifact.clone(),
        created_at: Utc::now(),
        rows_read: ingest.rows_read,
        rows_rejected_at_ingest: ingest.row_errors.len(),
        rows_dropped_by_validation: validation.rows_dropped,
        rows_used: validation.rows_kept(),
        model: bundle.model.kind(),
        impute_strategy: config.impute_strategy,
        features: bundle.schema_fingerprint.clone(),
        metrics: bundle.metrics.clone(),
    };
    if let Some(path) = &config.report {
        write_run_report(path, &report)?;
    }

    tracing::info!(
        artifact = %config.artifact.display(),
        mape = bundle.metrics.mape,
        rows_used = report.rows_used,
        "training run complete"
    );

    Ok(TrainingRun { bundle, report })
}
