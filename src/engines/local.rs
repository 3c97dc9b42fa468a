// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process ONNX engine

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::provider::OcrEngine;
use super::types::{EngineResult, RecognizedLine};
use crate::config::LOCAL_ENGINE_ID;
use crate::vision::ocr::{OcrOutput, PaddleOcrModel};

/// Display name of the local engine
pub const LOCAL_ENGINE_NAME: &str = "LocalOCR";

/// Engine backed by the shared local detection + recognition pipeline
///
/// Inference is CPU-bound and runs on the blocking pool.
pub struct LocalOnnxEngine {
    model: Arc<PaddleOcrModel>,
    priority: u8,
}

impl LocalOnnxEngine {
    pub fn new(model: Arc<PaddleOcrModel>, priority: u8) -> Self {
        Self { model, priority }
    }
}

/// Convert pipeline output into an engine result
pub fn output_to_result(output: OcrOutput, processing_time_ms: u64) -> EngineResult {
    let lines = output
        .lines
        .into_iter()
        .map(|line| RecognizedLine {
            bounding_box: Some(line.bounding_box),
            ..RecognizedLine::new(line.text, line.confidence)
        })
        .collect();

    EngineResult::success(
        LOCAL_ENGINE_ID,
        LOCAL_ENGINE_NAME,
        output.full_text,
        lines,
        processing_time_ms,
    )
}

#[async_trait]
impl OcrEngine for LocalOnnxEngine {
    async fn extract_text(&self, image_bytes: &[u8]) -> EngineResult {
        let start = Instant::now();
        let model = Arc::clone(&self.model);
        let bytes = image_bytes.to_vec();

        let outcome = tokio::task::spawn_blocking(move || model.process_bytes(&bytes)).await;
        let elapsed = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(output)) => {
                info!(
                    "[{}] extracted {} lines in {}ms",
                    LOCAL_ENGINE_NAME,
                    output.lines.len(),
                    elapsed
                );
                output_to_result(output, elapsed)
            }
            Ok(Err(e)) => {
                warn!("[{}] extraction failed: {}", LOCAL_ENGINE_NAME, e);
                EngineResult::failure(LOCAL_ENGINE_ID, LOCAL_ENGINE_NAME, e.to_string(), elapsed)
            }
            Err(e) => {
                warn!("[{}] inference task failed: {}", LOCAL_ENGINE_NAME, e);
                EngineResult::failure(
                    LOCAL_ENGINE_ID,
                    LOCAL_ENGINE_NAME,
                    format!("Inference task failed: {}", e),
                    elapsed,
                )
            }
        }
    }

    async fn is_healthy(&self) -> bool {
        self.model.is_ready()
    }

    fn engine_id(&self) -> &str {
        LOCAL_ENGINE_ID
    }

    fn display_name(&self) -> &str {
        LOCAL_ENGINE_NAME
    }

    fn priority(&self) -> u8 {
        self.priority
    }
}
