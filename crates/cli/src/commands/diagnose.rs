//! Offline artifact diagnosis
//!
//! Reads a persisted model artifact directly from disk, checks its
//! structure, and runs one known-good prediction through it. Useful when
//! the server refuses to load a model and the logs alone don't say why.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use insurance_lib::bundle::checksum;
use insurance_lib::codec::assemble_features;
use insurance_lib::ArtifactRecord;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::output::{format_score, print_info, print_success, OutputFormat};

/// Everything the diagnosis learned about one artifact.
#[derive(Debug, Serialize)]
pub struct DiagnosisReport {
    pub path: String,
    pub size_bytes: u64,
    pub checksum: String,
    pub model_type: String,
    pub n_estimators: usize,
    pub version: String,
    pub created_date: String,
    pub training_score: Option<f64>,
    pub test_score: Option<f64>,
    pub sex_categories: Vec<String>,
    pub smoker_categories: Vec<String>,
    pub region_categories: Vec<String>,
    pub sample_prediction: f64,
}

/// Inspect the artifact at `path` and exercise one prediction.
fn inspect(path: &Path) -> Result<DiagnosisReport> {
    if !path.exists() {
        bail!("artifact not found at {}", path.display());
    }

    let bytes = fs::read(path)
        .with_context(|| format!("failed to read artifact at {}", path.display()))?;
    let digest = checksum(&bytes);

    let record: ArtifactRecord =
        bincode::deserialize(&bytes).context("artifact is not a valid model record")?;

    let missing = record.missing_parts();
    if !missing.is_empty() {
        bail!("artifact is incomplete, missing parts: {}", missing.join(", "));
    }

    let bundle = record
        .validate()
        .context("artifact failed structural validation")?;

    // Known-good request: 30 year old male non-smoker, bmi 25, one child
    let sex = bundle.sex_encoder.encode("male")?;
    let smoker = bundle.smoker_encoder.encode("no")?;
    let region = bundle.region_encoder.encode("northeast")?;
    let features = assemble_features(30, sex, 25.0, 1, smoker, region);
    let sample_prediction = bundle.model.predict_row(&features)?;

    Ok(DiagnosisReport {
        path: path.display().to_string(),
        size_bytes: bytes.len() as u64,
        checksum: digest,
        model_type: bundle.model.model_type().to_string(),
        n_estimators: bundle.model.n_estimators(),
        version: bundle.metadata.version.clone(),
        created_date: bundle.metadata.created_date.clone(),
        training_score: bundle.metadata.training_score,
        test_score: bundle.metadata.test_score,
        sex_categories: bundle.sex_encoder.labels().to_vec(),
        smoker_categories: bundle.smoker_encoder.labels().to_vec(),
        region_categories: bundle.region_encoder.labels().to_vec(),
        sample_prediction,
    })
}

/// Run the diagnosis and print the report.
pub fn run(model_path: &str, format: OutputFormat) -> Result<()> {
    let report = inspect(Path::new(model_path))?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("{}", "Model Artifact Diagnosis".bold());
            println!("{}", "=".repeat(60));
            println!("Path:       {}", report.path.cyan());
            println!("Size:       {} bytes", report.size_bytes);
            println!("Checksum:   {}", report.checksum);
            println!();
            println!("Model:      {} ({} trees)", report.model_type, report.n_estimators);
            println!("Version:    {}", report.version);
            println!("Created:    {}", report.created_date);
            if let Some(score) = report.training_score {
                println!("Train R²:   {}", format_score(score));
            }
            if let Some(score) = report.test_score {
                println!("Test R²:    {}", format_score(score));
            }
            println!();
            print_info(&format!("sex categories:    {:?}", report.sex_categories));
            print_info(&format!("smoker categories: {:?}", report.smoker_categories));
            print_info(&format!("region categories: {:?}", report.region_categories));
            println!();
            print_success(&format!(
                "sample prediction OK: ${:.2} for a 30yo male non-smoker",
                report.sample_prediction
            ));
        }
    }

    Ok(())
}
