//! The inference service.
//!
//! `InferenceService` owns one loaded bundle and is shared by reference
//! between workers (it is `Send + Sync` and never mutated after construction).
//! Each request runs the fitted pipeline in serve mode, checks the produced
//! feature names against the bundle fingerprint and predicts.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value as Json, json};

use crate::artifact::{self, ArtifactBundle};
use crate::error::{PipelineError, PipelineResult};
use crate::features::Mode;
use crate::io::dataset_from_json;
use crate::models::ModelKind;

/// Response class, mirroring the HTTP status families a host would map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    ClientError,
    ServerError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: Status,
    pub body: Json,
}

/// Liveness summary of the loaded bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub format_version: u32,
    pub model: ModelKind,
    pub features: usize,
    pub created_at: DateTime<Utc>,
    pub mape: f64,
}

#[derive(Debug)]
pub struct InferenceService {
    bundle: ArtifactBundle,
}

impl InferenceService {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self { bundle }
    }

    /// Load the bundle at `path`. Any failure here is fatal to startup.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        Ok(Self::new(artifact::load(path)?))
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    /// Predict for one record (JSON object) or a batch (array of objects).
    ///
    /// Records missing a required value are dropped, as in training, so a
    /// batch can get back fewer predictions than it sent. The result holds one
    /// prediction per kept record, in request order; the positions of dropped
    /// records are logged at `warn`.
    pub fn predict(&self, payload: &Json) -> PipelineResult<Vec<f64>> {
        let pipeline = &self.bundle.pipeline;
        let dataset = dataset_from_json(payload, &pipeline.roles)?;
        let transformed = pipeline.transform(&dataset, Mode::Serve)?;

        if !transformed.report.dropped_rows.is_empty() {
            tracing::warn!(
                dropped = ?transformed.report.dropped_rows,
                kept = transformed.report.rows_kept(),
                "records dropped for missing required fields"
            );
        }

        if transformed.report.rows_kept() == 0 {
            return Err(PipelineError::validation(format!(
                "All {} records lack a required field ({})",
                transformed.report.rows_in,
                pipeline.roles.required.join(", ")
            )));
        }
        if transformed.features.names() != self.bundle.schema_fingerprint.as_slice() {
            return Err(PipelineError::internal(
                "Transformed features do not match the bundle's schema fingerprint",
            ));
        }

        self.bundle.model.predict(&transformed.features)
    }

    /// Framework-facing entry point: never panics, never returns `Err`.
    pub fn handle(&self, payload: &Json) -> Response {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.predict(payload)));

        match outcome {
            Ok(Ok(prediction)) => {
                tracing::info!(rows = prediction.len(), "prediction served");
                Response {
                    status: Status::Ok,
                    body: json!({ "prediction": prediction }),
                }
            }
            Ok(Err(err)) if err.is_client_error() => {
                tracing::warn!(error = %err, "rejected request");
                Response {
                    status: Status::ClientError,
                    body: json!({ "error": err.to_string() }),
                }
            }
            Ok(Err(err)) => {
                tracing::error!(error = %err, "prediction failed");
                server_error()
            }
            Err(_) => {
                tracing::error!("prediction panicked");
                server_error()
            }
        }
    }

    pub fn health(&self) -> Health {
        Health {
            status: "live",
            format_version: self.bundle.format_version,
            model: self.bundle.model.kind(),
            features: self.bundle.schema_fingerprint.len(),
            created_at: self.bundle.created_at,
            mape: self.bundle.metrics.mape,
        }
    }
}

fn server_error() -> Response {
    Response {
        status: Status::ServerError,
        body: json!({ "error": "internal error while predicting" }),
    }
}
