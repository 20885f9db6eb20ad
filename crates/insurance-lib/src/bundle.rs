//! Model bundle: the persisted unit of {regressor, codecs, metadata}
//!
//! The artifact on disk is a bincode-encoded [`ArtifactRecord`] in which
//! every part is optional, so a structurally incomplete artifact is
//! detectable at load time instead of surfacing as a runtime miss. The
//! validated in-memory form is [`ModelBundle`], whose four required parts
//! (regressor + three codecs) are always present.

use crate::codec::{LabelCodec, FEATURE_NAMES};
use crate::error::ModelError;
use crate::forest::RandomForestRegressor;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Metadata carried alongside the fitted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub version: String,
    pub created_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_score: Option<f64>,
}

impl BundleMetadata {
    /// Metadata for an artifact that carried none of the optional fields.
    pub fn unknown() -> Self {
        Self {
            version: "unknown".to_string(),
            created_date: "unknown".to_string(),
            training_score: None,
            test_score: None,
        }
    }
}

/// A validated, ready-for-inference model bundle.
///
/// Immutable once constructed; the lifecycle manager publishes it behind
/// an `Arc` and replaces the whole handle on reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub model: RandomForestRegressor,
    pub sex_encoder: LabelCodec,
    pub smoker_encoder: LabelCodec,
    pub region_encoder: LabelCodec,
    pub feature_names: Vec<String>,
    pub metadata: BundleMetadata,
}

impl ModelBundle {
    /// Convert to the optional-field persisted form.
    pub fn to_record(&self) -> ArtifactRecord {
        ArtifactRecord {
            model: Some(self.model.clone()),
            sex_encoder: Some(self.sex_encoder.clone()),
            smoker_encoder: Some(self.smoker_encoder.clone()),
            region_encoder: Some(self.region_encoder.clone()),
            feature_names: Some(self.feature_names.clone()),
            training_score: self.metadata.training_score,
            test_score: self.metadata.test_score,
            version: Some(self.metadata.version.clone()),
            created_date: Some(self.metadata.created_date.clone()),
        }
    }
}

/// The serialized artifact shape. Field names mirror the keys of the
/// persisted mapping: required parts `model`, `sex_encoder`,
/// `smoker_encoder`, `region_encoder`; the rest optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub model: Option<RandomForestRegressor>,
    pub sex_encoder: Option<LabelCodec>,
    pub smoker_encoder: Option<LabelCodec>,
    pub region_encoder: Option<LabelCodec>,
    pub feature_names: Option<Vec<String>>,
    pub training_score: Option<f64>,
    pub test_score: Option<f64>,
    pub version: Option<String>,
    pub created_date: Option<String>,
}

impl ArtifactRecord {
    /// Names of required parts absent from this record.
    pub fn missing_parts(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.model.is_none() {
            missing.push("model");
        }
        if self.sex_encoder.is_none() {
            missing.push("sex_encoder");
        }
        if self.smoker_encoder.is_none() {
            missing.push("smoker_encoder");
        }
        if self.region_encoder.is_none() {
            missing.push("region_encoder");
        }
        missing
    }

    /// Validate required parts and produce a usable bundle. A record
    /// missing any of the four required parts, or whose regressor holds
    /// no fitted trees, is corrupted and must not serve predictions.
    /// Optional fields fall back to unknown-value defaults.
    pub fn validate(self) -> Result<ModelBundle, ModelError> {
        let missing = self.missing_parts();
        if !missing.is_empty() {
            return Err(ModelError::corrupted(format!(
                "missing required parts: {}",
                missing.join(", ")
            )));
        }

        let (Some(model), Some(sex_encoder), Some(smoker_encoder), Some(region_encoder)) = (
            self.model,
            self.sex_encoder,
            self.smoker_encoder,
            self.region_encoder,
        ) else {
            return Err(ModelError::corrupted("missing required parts"));
        };
        if !model.is_fitted() {
            return Err(ModelError::corrupted("regressor holds no fitted trees"));
        }

        Ok(ModelBundle {
            model,
            sex_encoder,
            smoker_encoder,
            region_encoder,
            feature_names: self
                .feature_names
                .unwrap_or_else(|| FEATURE_NAMES.iter().map(|s| s.to_string()).collect()),
            metadata: BundleMetadata {
                version: self.version.unwrap_or_else(|| "unknown".to_string()),
                created_date: self.created_date.unwrap_or_else(|| "unknown".to_string()),
                training_score: self.training_score,
                test_score: self.test_score,
            },
        })
    }
}

/// Bincode-backed artifact storage at a fixed path.
#[derive(Debug, Clone)]
pub struct BundleStore {
    path: PathBuf,
}

impl BundleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and validate the persisted bundle. A missing file maps to
    /// `ArtifactMissing`; an unreadable record or one failing validation
    /// maps to `ArtifactCorrupted`.
    pub fn load(&self) -> Result<ModelBundle, ModelError> {
        if !self.path.exists() {
            return Err(ModelError::ArtifactMissing {
                path: self.path.clone(),
            });
        }

        let bytes = fs::read(&self.path).map_err(|e| {
            ModelError::corrupted(format!("failed to read {}: {e}", self.path.display()))
        })?;

        let record: ArtifactRecord = bincode::deserialize(&bytes).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "Artifact failed to deserialize");
            ModelError::corrupted(format!("deserialization failed: {e}"))
        })?;

        let bundle = record.validate()?;
        info!(
            path = %self.path.display(),
            version = %bundle.metadata.version,
            checksum = %checksum(&bytes),
            "Model bundle loaded"
        );
        Ok(bundle)
    }

    /// Persist the bundle as a single unit: serialize, write to a temp
    /// file, fsync, then rename over the final path.
    pub fn save(&self, bundle: &ModelBundle) -> Result<(), ModelError> {
        let bytes = bincode::serialize(&bundle.to_record())
            .map_err(|e| ModelError::TrainingFailed(format!("serialization failed: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ModelError::TrainingFailed(format!(
                        "failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(|e| {
            ModelError::TrainingFailed(format!("failed to create {}: {e}", temp_path.display()))
        })?;
        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| ModelError::TrainingFailed(format!("failed to write artifact: {e}")))?;
        fs::rename(&temp_path, &self.path).map_err(|e| {
            ModelError::TrainingFailed(format!(
                "failed to rename {} to {}: {e}",
                temp_path.display(),
                self.path.display()
            ))
        })?;

        info!(
            path = %self.path.display(),
            size_bytes = bytes.len(),
            checksum = %checksum(&bytes),
            version = %bundle.metadata.version,
            "Model bundle saved"
        );
        Ok(())
    }
}

/// SHA-256 checksum of the serialized artifact, hex encoded.
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainer::{Trainer, TrainerConfig};
    use tempfile::TempDir;

    fn small_bundle() -> ModelBundle {
        Trainer::new(TrainerConfig {
            n_samples: 80,
            n_trees: 3,
            seed: 42,
            ..Default::default()
        })
        .train()
        .unwrap()
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = BundleStore::new(dir.path().join("model.bin"));
        let bundle = small_bundle();
        store.save(&bundle).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.metadata.version, bundle.metadata.version);
        assert_eq!(loaded.feature_names, bundle.feature_names);
        let row = [30.0, 1.0, 25.0, 1.0, 0.0, 0.0];
        assert_eq!(
            loaded.model.predict_row(&row).unwrap(),
            bundle.model.predict_row(&row).unwrap()
        );
    }

    #[test]
    fn missing_file_is_artifact_missing() {
        let dir = TempDir::new().unwrap();
        let store = BundleStore::new(dir.path().join("absent.bin"));
        assert!(matches!(
            store.load().unwrap_err(),
            ModelError::ArtifactMissing { .. }
        ));
    }

    #[test]
    fn garbage_bytes_are_corrupted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        fs::write(&path, b"not a model artifact").unwrap();
        let store = BundleStore::new(&path);
        assert!(matches!(
            store.load().unwrap_err(),
            ModelError::ArtifactCorrupted { .. }
        ));
    }

    #[test]
    fn record_missing_each_required_part_is_rejected() {
        let complete = small_bundle().to_record();

        for part in ["model", "sex_encoder", "smoker_encoder", "region_encoder"] {
            let mut record = complete.clone();
            match part {
                "model" => record.model = None,
                "sex_encoder" => record.sex_encoder = None,
                "smoker_encoder" => record.smoker_encoder = None,
                "region_encoder" => record.region_encoder = None,
                _ => unreachable!(),
            }
            assert_eq!(record.missing_parts(), vec![part]);
            let err = record.validate().unwrap_err();
            assert!(matches!(err, ModelError::ArtifactCorrupted { .. }), "{part}");
        }
    }

    #[test]
    fn persisted_incomplete_record_fails_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.bin");
        let mut record = small_bundle().to_record();
        record.smoker_encoder = None;
        fs::write(&path, bincode::serialize(&record).unwrap()).unwrap();

        let err = BundleStore::new(&path).load().unwrap_err();
        assert!(matches!(err, ModelError::ArtifactCorrupted { .. }));
    }

    #[test]
    fn optional_fields_fall_back_to_unknown() {
        let mut record = small_bundle().to_record();
        record.version = None;
        record.created_date = None;
        record.training_score = None;
        record.test_score = None;
        record.feature_names = None;

        let bundle = record.validate().unwrap();
        assert_eq!(bundle.metadata.version, "unknown");
        assert_eq!(bundle.metadata.created_date, "unknown");
        assert!(bundle.metadata.training_score.is_none());
        let default_names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        assert_eq!(bundle.feature_names, default_names);
    }

    #[test]
    fn unfitted_regressor_is_corrupted() {
        let mut record = small_bundle().to_record();
        record.model = Some(crate::forest::RandomForestRegressor::new(5, 42));
        assert!(matches!(
            record.validate().unwrap_err(),
            ModelError::ArtifactCorrupted { .. }
        ));
    }

    #[test]
    fn checksum_is_stable() {
        assert_eq!(checksum(b"abc"), checksum(b"abc"));
        assert_eq!(checksum(b"abc").len(), 64);
        assert_ne!(checksum(b"abc"), checksum(b"abd"));
    }
}
