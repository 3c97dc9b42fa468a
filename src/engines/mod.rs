// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR engines behind a uniform async interface
//!
//! - `remote` - HTTP sidecars (PaddleOCR/RapidOCR, Pororo, EasyOCR)
//! - `local` - In-process ONNX pipeline
//!
//! Every engine reports failures as a failed [`EngineResult`] instead of an
//! error, so the ensemble can always collect one result per engine.

pub mod local;
pub mod provider;
pub mod remote;
pub mod types;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::vision::ocr::PaddleOcrModel;

pub use local::LocalOnnxEngine;
pub use provider::OcrEngine;
pub use remote::RemoteOcrEngine;
pub use types::{EngineError, EngineResult, RecognizedLine, UNKNOWN_ERROR_MESSAGE};

/// Build every configured engine, ordered by priority (lower first)
///
/// Loads the local models when the local engine is enabled; missing model
/// files are an error.
pub async fn build_engines(config: &OcrConfig) -> Result<Vec<Arc<dyn OcrEngine>>> {
    let mut engines: Vec<Arc<dyn OcrEngine>> = Vec::new();

    if config.local.enabled {
        let model = PaddleOcrModel::load(&config.local)
            .await
            .context("Failed to load local OCR models")?;
        engines.push(Arc::new(LocalOnnxEngine::new(
            Arc::new(model),
            config.local.priority,
        )));
        debug!("Local ONNX engine enabled");
    }

    for engine_config in &config.engines {
        let engine = RemoteOcrEngine::new(engine_config.clone())
            .with_context(|| format!("Failed to create {} engine", engine_config.name))?;
        engines.push(Arc::new(engine));
    }

    sort_by_priority(&mut engines);
    info!(
        "OCR engines: {}",
        engines
            .iter()
            .map(|e| e.display_name())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(engines)
}

/// Stable sort, so equal priorities keep configuration order
pub fn sort_by_priority(engines: &mut [Arc<dyn OcrEngine>]) {
    engines.sort_by_key(|e| e.priority());
}
