//! Error taxonomy for the model lifecycle and prediction pipeline

use crate::models::InsuranceRequest;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the model bundle lifecycle and prediction service.
///
/// Artifact errors are recovered locally by the lifecycle manager via
/// retrain-and-retry; the remaining variants surface to callers as
/// structured responses. None of these abort the process.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No persisted artifact exists at the configured path.
    #[error("model artifact not found at {path}")]
    ArtifactMissing { path: PathBuf },

    /// The artifact exists but cannot be deserialized, or is missing
    /// one of its required parts.
    #[error("model artifact is corrupted: {reason}")]
    ArtifactCorrupted { reason: String },

    /// The trainer failed to produce a bundle.
    #[error("model training failed: {0}")]
    TrainingFailed(String),

    /// A categorical value was not in the codec's fitted vocabulary.
    #[error("unknown {field} category: {value:?}")]
    UnknownCategory { field: String, value: String },

    /// A prediction was requested while no bundle is loaded.
    #[error("no model is currently loaded")]
    ModelUnavailable,

    /// Any failure during encode/assemble/infer, carrying the
    /// original request and the underlying cause.
    #[error("prediction failed for request: {source}")]
    PredictionFailed {
        input: InsuranceRequest,
        #[source]
        source: Box<ModelError>,
    },
}

impl ModelError {
    /// True when the lifecycle manager should respond by retraining.
    pub fn is_recoverable_by_retrain(&self) -> bool {
        matches!(
            self,
            ModelError::ArtifactMissing { .. } | ModelError::ArtifactCorrupted { .. }
        )
    }

    /// Corrupted-artifact constructor used by the store and validator.
    pub fn corrupted(reason: impl Into<String>) -> Self {
        ModelError::ArtifactCorrupted {
            reason: reason.into(),
        }
    }
}
