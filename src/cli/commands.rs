// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::cross_validation::{BusinessType, ChatTextProcessor, DocumentType, TextProcessor};
use crate::engines::build_engines;
use crate::ensemble::EnsembleCoordinator;
use crate::service::{DocumentOcrService, OcrRequest};

/// Arguments for the extract command
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Image file (PNG, JPEG, WebP, ...)
    pub image: PathBuf,

    /// Document type: business-license, id-card or driver-license
    #[arg(long, default_value = "business-license")]
    pub document_type: DocumentType,

    /// Business type of a business license: individual, corporate or unknown
    #[arg(long, default_value = "unknown")]
    pub business_type: BusinessType,

    /// Skip the cross-validation stage even when it is configured
    #[arg(long)]
    pub no_cross_validation: bool,

    /// Run only the primary engine
    #[arg(long)]
    pub no_ensemble: bool,

    /// Override the ensemble deadline in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Arguments for the health command
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Exit with an error if any engine is unhealthy
    #[arg(long)]
    pub strict: bool,
}

fn text_processor(config: &OcrConfig) -> Result<Option<Arc<dyn TextProcessor>>> {
    match &config.cross_validation {
        Some(cv) => {
            let processor = ChatTextProcessor::new(cv)?;
            Ok(Some(Arc::new(processor)))
        }
        None => Ok(None),
    }
}

/// Run OCR on one image and print the outcome as JSON
pub async fn extract(args: ExtractArgs, mut config: OcrConfig) -> Result<()> {
    if args.no_ensemble {
        config.ensemble_enabled = false;
    }
    if let Some(timeout) = args.timeout_secs {
        config.ensemble_timeout_secs = timeout;
        config.validate()?;
    }

    let image = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read image {}", args.image.display()))?;

    let engines = build_engines(&config).await?;
    let processor = if args.no_cross_validation {
        None
    } else {
        text_processor(&config)?
    };
    let service = DocumentOcrService::from_config(engines, &config, processor);

    let request = OcrRequest::new(image, args.business_type).with_document_type(args.document_type);
    let outcome = service.process(request).await;
    if !outcome.selected.is_success() {
        warn!(
            "No engine produced text: {}",
            outcome.selected.error_message().unwrap_or("unknown")
        );
    }

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Check every engine (and the cross-validation endpoint) and print a JSON map
pub async fn health(args: HealthArgs, config: OcrConfig) -> Result<()> {
    let engines = build_engines(&config).await?;
    let coordinator = EnsembleCoordinator::from_config(engines, &config);

    let mut report: BTreeMap<String, bool> = coordinator.check_health().await;
    if let Some(cv) = &config.cross_validation {
        let processor = ChatTextProcessor::new(cv)?;
        report.insert("cross_validation".to_string(), processor.health_check().await);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    let unhealthy: Vec<&str> = report
        .iter()
        .filter(|(_, healthy)| !**healthy)
        .map(|(id, _)| id.as_str())
        .collect();
    if unhealthy.is_empty() {
        info!("All {} components healthy", report.len());
        Ok(())
    } else if args.strict {
        Err(anyhow!("Unhealthy: {}", unhealthy.join(", ")))
    } else {
        warn!("Unhealthy: {}", unhealthy.join(", "));
        Ok(())
    }
}
