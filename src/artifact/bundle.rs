//! The unit of persistence and deployment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::features::FittedPipeline;
use crate::models::ModelArtifact;
use crate::training::TrainMetrics;

/// Current bundle format version. Bump on any incompatible layout change.
pub const FORMAT_VERSION: u32 = 1;

/// Everything serving needs: role tagging, fitted transforms, the model and
/// the feature schema they were fitted against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub pipeline: FittedPipeline,
    pub model: ModelArtifact,
    /// Ordered feature names the model was fitted on.
    pub schema_fingerprint: Vec<String>,
    pub metrics: TrainMetrics,
}

impl ArtifactBundle {
    /// Assemble a bundle from one training run; the fingerprint is taken
    /// from the fitted encoder.
    pub fn new(pipeline: FittedPipeline, model: ModelArtifact, metrics: TrainMetrics) -> PipelineResult<Self> {
        let bundle = Self {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            schema_fingerprint: pipeline.feature_names().to_vec(),
            pipeline,
            model,
            metrics,
        };
        bundle.check_consistency().map_err(PipelineError::internal)?;
        Ok(bundle)
    }

    /// Internal consistency between components. Returns the first problem.
    pub(crate) fn check_consistency(&self) -> Result<(), String> {
        self.pipeline.roles.validate().map_err(|e| e.to_string())?;

        if !self.pipeline.encoder.is_consistent() {
            return Err("encoder state does not match its feature names".into());
        }
        if self.pipeline.imputer.fills().iter().any(|f| !f.value.is_finite()) {
            return Err("imputer holds a non-finite fill value".into());
        }
        if self.schema_fingerprint != self.pipeline.feature_names() {
            return Err(format!(
                "schema fingerprint ({} names) differs from the encoder output ({} names)",
                self.schema_fingerprint.len(),
                self.pipeline.feature_names().len()
            ));
        }
        if self.model.n_features() != self.schema_fingerprint.len() {
            return Err(format!(
                "model expects {} features but the fingerprint has {}",
                self.model.n_features(),
                self.schema_fingerprint.len()
            ));
        }
        if !self.model.is_well_formed() {
            return Err("model parameters are malformed".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil;

    #[test]
    fn new_bundle_fingerprint_is_the_encoder_schema() {
        let bundle = testutil::bundle();
        assert_eq!(bundle.schema_fingerprint, bundle.pipeline.feature_names());
        assert_eq!(
            bundle.schema_fingerprint,
            vec!["zone=E", "zone=N", "zone=S", "year", "workers"]
        );
        assert!(bundle.check_consistency().is_ok());
    }

    #[test]
    fn inconsistent_fingerprint_is_detected() {
        let mut bundle = testutil::bundle();
        bundle.schema_fingerprint.swap(0, 1);
        assert!(bundle.check_consistency().is_err());

        let mut bundle = testutil::bundle();
        bundle.schema_fingerprint.pop();
        assert!(bundle.check_consistency().is_err());
    }
}
