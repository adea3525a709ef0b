//! Error types.
//!
//! Two layers:
//!
//! - `PipelineError` is the library taxonomy. Every fallible transform,
//!   training step, artifact operation and inference call returns it.
//! - `AppError` is the binary boundary: a message plus the process exit code.
//!
//! Exit codes used by `whcap`:
//! - `2`: bad input (schema, validation, CLI/config problems)
//! - `3`: the data cannot support a fit (insufficient data, training failure)
//! - `4`: artifact or internal failures

use thiserror::Error;

/// Failure taxonomy for the feature pipeline, trainer, artifact store and
/// inference service.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or unexpected columns. Always a caller or configuration defect.
    #[error("schema error: {0}")]
    Schema(String),

    /// A fit-time statistic cannot be computed (e.g. all values null).
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Malformed input values or request payloads.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    /// The estimator cannot be fitted on the given matrix/target.
    #[error("training error: {0}")]
    Training(String),

    /// Unexpected failure during transform or prediction.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::ArtifactCorrupt(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the failure is the caller's fault (4xx-equivalent).
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Schema(_) | PipelineError::Validation(_))
    }

    /// Process exit code used when this error reaches the binary boundary.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Schema(_) | PipelineError::Validation(_) => 2,
            PipelineError::InsufficientData(_) | PipelineError::Training(_) => 3,
            PipelineError::ArtifactNotFound(_)
            | PipelineError::ArtifactCorrupt(_)
            | PipelineError::Internal(_)
            | PipelineError::Io { .. } => 4,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_schema_and_validation_only() {
        assert!(PipelineError::schema("x").is_client_error());
        assert!(PipelineError::validation("x").is_client_error());
        assert!(!PipelineError::internal("x").is_client_error());
        assert!(!PipelineError::training("x").is_client_error());
        assert!(!PipelineError::corrupt("x").is_client_error());
    }

    #[test]
    fn exit_codes_follow_failure_class() {
        let app: AppError = PipelineError::schema("missing `zone`").into();
        assert_eq!(app.exit_code(), 2);
        assert!(app.to_string().contains("missing `zone`"));

        let app: AppError = PipelineError::InsufficientData("all null".into()).into();
        assert_eq!(app.exit_code(), 3);

        let app: AppError = PipelineError::ArtifactNotFound("x".into()).into();
        assert_eq!(app.exit_code(), 4);
    }
}
