//! Insurance Prediction CLI
//!
//! A command-line tool for inspecting persisted model artifacts and
//! querying a running prediction API.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{diagnose, status};

/// Insurance Prediction CLI
#[derive(Parser)]
#[command(name = "insurectl")]
#[command(author, version, about = "CLI for the insurance cost prediction service", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via INSURANCE_API_URL env var)
    #[arg(long, env = "INSURANCE_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect a persisted model artifact without starting the server
    Diagnose {
        /// Path to the model artifact
        #[arg(long, default_value = "model.bin")]
        model_path: String,
    },

    /// Show health and model info from a running API
    Status,

    /// Ask a running API to reload its model from storage
    Reload,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Diagnose { model_path } => {
            diagnose::run(&model_path, cli.format)?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&cli.api_url)?;
            status::show_status(&client, cli.format).await?;
        }
        Commands::Reload => {
            let client = client::ApiClient::new(&cli.api_url)?;
            status::reload_model(&client, cli.format).await?;
        }
    }

    Ok(())
}
