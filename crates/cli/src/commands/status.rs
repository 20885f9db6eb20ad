//! Commands against a running prediction API

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthInfo, ModelInfo, ReloadOutcome};
use crate::output::{
    color_status, format_score, print_error, print_success, print_table, OutputFormat,
};

/// Field/value row for the status table
#[derive(Tabled, Serialize)]
struct StatusRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(field: &str, value: String) -> StatusRow {
    StatusRow {
        field: field.to_string(),
        value,
    }
}

/// Show health and model info for a running server
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: HealthInfo = client.get("/health").await?;
    let info: ModelInfo = client.get("/model-info").await?;

    if let OutputFormat::Json = format {
        let combined = serde_json::json!({
            "health": health,
            "model": info,
        });
        println!("{}", serde_json::to_string_pretty(&combined)?);
        return Ok(());
    }

    println!("{}", "Service Status".bold());

    let mut rows = vec![
        row("Status", color_status(&health.status)),
        row("Model loaded", health.model_loaded.to_string()),
    ];
    if let Some(version) = &health.model_version {
        rows.push(row("Model version", version.clone()));
    }
    if let Some(error) = &info.error {
        rows.push(row("Model error", error.red().to_string()));
    }
    if let Some(model_type) = &info.model_type {
        rows.push(row("Model type", model_type.clone()));
    }
    if let Some(n) = info.n_estimators {
        rows.push(row("Trees", n.to_string()));
    }
    if let Some(created) = &info.created_date {
        rows.push(row("Created", created.clone()));
    }
    if let Some(score) = info.training_score {
        rows.push(row("Train R²", format_score(score)));
    }
    if let Some(score) = info.test_score {
        rows.push(row("Test R²", format_score(score)));
    }

    print_table(&rows, format);
    Ok(())
}

/// Trigger a model reload and report the outcome
pub async fn reload_model(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let outcome: ReloadOutcome = client.post("/reload-model", &serde_json::json!({})).await?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        OutputFormat::Table => {
            if outcome.success {
                print_success(&outcome.message);
            } else {
                print_error(&outcome.message);
                anyhow::bail!("reload failed");
            }
        }
    }

    Ok(())
}
