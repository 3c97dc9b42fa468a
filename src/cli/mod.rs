// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::OcrConfig;

/// Kordoc OCR CLI
#[derive(Parser, Debug)]
#[command(name = "kordoc-ocr")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Ensemble OCR for Korean ID and business registration documents", long_about = None)]
pub struct Cli {
    /// TOML configuration file (environment variables are used otherwise)
    #[arg(long, global = true, env = "OCR_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run OCR on one image and print the outcome as JSON
    Extract(commands::ExtractArgs),

    /// Check every configured engine
    Health(commands::HealthArgs),

    /// Print version information
    Version,
}

/// Load and validate configuration
pub fn load_config(path: Option<&Path>) -> Result<OcrConfig> {
    let config = match path {
        Some(path) => OcrConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => OcrConfig::from_env(),
    };
    config.validate().context("Invalid OCR configuration")?;
    info!("Configured engines: {}", config.engine_ids().join(", "));
    Ok(config)
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Extract(args) => {
            let config = load_config(cli.config.as_deref())?;
            commands::extract(args, config).await
        }
        Commands::Health(args) => {
            let config = load_config(cli.config.as_deref())?;
            commands::health(args, config).await
        }
        Commands::Version => {
            println!(
                "{}",
                serde_json::to_string_pretty(&crate::version::get_version_info())?
            );
            Ok(())
        }
    }
}
