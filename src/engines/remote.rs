// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP OCR sidecar engine
//!
//! Talks to the RapidOCR/PaddleOCR, EasyOCR and Pororo containers. All of
//! them accept `POST /ocr` with a multipart `image_file` field and expose
//! `GET /health`.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::provider::OcrEngine;
use super::types::{join_lines, BoundingBox, EngineError, EngineResult, RecognizedLine};
use crate::config::RemoteEngineConfig;

/// Health checks give up after this long
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Confidence assumed when the service omits one
pub const DEFAULT_LINE_CONFIDENCE: f32 = 0.9;

/// Remote OCR engine
pub struct RemoteOcrEngine {
    config: RemoteEngineConfig,
    client: Client,
}

impl RemoteOcrEngine {
    /// Create a new remote engine
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: RemoteEngineConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!(
            "{} engine configured at {} (timeout {}s)",
            config.name, config.endpoint, config.timeout_secs
        );
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    async fn request(&self, image_bytes: &[u8]) -> Result<(String, Vec<RecognizedLine>), EngineError> {
        let part = Part::bytes(image_bytes.to_vec())
            .file_name("image.png")
            .mime_str("image/png")?;
        let form = Form::new().part("image_file", part);

        let response = self
            .client
            .post(self.url("/ocr"))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let parsed: OcrResponse = serde_json::from_str(&body)
            .map_err(|e| EngineError::InvalidResponse(format!("JSON parse error: {}", e)))?;

        parsed.into_lines()
    }
}

#[async_trait]
impl OcrEngine for RemoteOcrEngine {
    async fn extract_text(&self, image_bytes: &[u8]) -> EngineResult {
        let start = Instant::now();
        debug!("[{}] starting extraction", self.config.name);

        match self.request(image_bytes).await {
            Ok((full_text, lines)) => {
                let elapsed = start.elapsed().as_millis() as u64;
                info!(
                    "[{}] extracted {} lines in {}ms",
                    self.config.name,
                    lines.len(),
                    elapsed
                );
                EngineResult::success(&self.config.id, &self.config.name, full_text, lines, elapsed)
            }
            Err(e) => {
                warn!("[{}] extraction failed: {}", self.config.name, e);
                EngineResult::failure(
                    &self.config.id,
                    &self.config.name,
                    e.to_string(),
                    start.elapsed().as_millis() as u64,
                )
            }
        }
    }

    async fn is_healthy(&self) -> bool {
        let response = match self
            .client
            .get(self.url("/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("{} health check failed: {}", self.config.name, e);
                return false;
            }
        };

        if !response.status().is_success() {
            warn!(
                "{} health check returned {}",
                self.config.name,
                response.status()
            );
            return false;
        }

        let body: Option<serde_json::Value> = response.json().await.ok();
        match body.as_ref().and_then(|b| b.get("status")) {
            None => true,
            Some(status) => status.as_str() == Some("healthy"),
        }
    }

    fn engine_id(&self) -> &str {
        &self.config.id
    }

    fn display_name(&self) -> &str {
        &self.config.name
    }

    fn priority(&self) -> u8 {
        self.config.priority
    }
}

/// Union of the current and legacy sidecar response formats
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OcrResponse {
    // current format
    pub success: Option<bool>,
    pub text: Option<String>,
    pub lines: Option<Vec<ResponseLine>>,
    pub line_count: Option<u64>,
    pub korean_ratio: Option<f64>,
    pub error: Option<String>,
    // legacy RapidOCR format
    pub code: Option<serde_json::Value>,
    pub msg: Option<String>,
    pub data: Option<Vec<LegacyItem>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResponseLine {
    pub text: Option<String>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LegacyItem {
    pub text: Option<String>,
    pub score: Option<f32>,
    pub text_region: Option<serde_json::Value>,
}

impl OcrResponse {
    /// `success == true` or legacy `code == "100"`
    pub fn is_success(&self) -> bool {
        if self.success == Some(true) {
            return true;
        }
        match &self.code {
            Some(serde_json::Value::String(code)) => code == "100",
            Some(serde_json::Value::Number(code)) => code.as_u64() == Some(100),
            _ => false,
        }
    }

    /// Convert into `(full_text, lines)`, or the service's own error
    pub fn into_lines(self) -> Result<(String, Vec<RecognizedLine>), EngineError> {
        if !self.is_success() {
            let message = self
                .error
                .or(self.msg)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(EngineError::Api { status: 0, message });
        }

        let lines: Vec<RecognizedLine> = match (self.lines, self.data) {
            (Some(lines), _) if !lines.is_empty() => lines
                .into_iter()
                .map(|l| {
                    RecognizedLine::new(
                        l.text.unwrap_or_default(),
                        l.confidence.unwrap_or(DEFAULT_LINE_CONFIDENCE),
                    )
                })
                .collect(),
            (_, Some(data)) => data
                .into_iter()
                .map(|item| RecognizedLine {
                    bounding_box: item.text_region.as_ref().and_then(region_to_box),
                    ..RecognizedLine::new(
                        item.text.unwrap_or_default(),
                        item.score.unwrap_or(DEFAULT_LINE_CONFIDENCE),
                    )
                })
                .collect(),
            _ => Vec::new(),
        };

        let full_text = self.text.unwrap_or_else(|| join_lines(&lines));
        Ok((full_text, lines))
    }
}

/// Axis-aligned box around a polygon of `[x, y]` points
fn region_to_box(region: &serde_json::Value) -> Option<BoundingBox> {
    let coords: Vec<(f64, f64)> = region
        .as_array()?
        .iter()
        .filter_map(|p| match p.as_array()?.as_slice() {
            [x, y, ..] => Some((x.as_f64()?, y.as_f64()?)),
            _ => None,
        })
        .collect();
    if coords.is_empty() {
        return None;
    }

    let min_x = coords.iter().map(|c| c.0).fold(f64::MAX, f64::min).max(0.0);
    let min_y = coords.iter().map(|c| c.1).fold(f64::MAX, f64::min).max(0.0);
    let max_x = coords.iter().map(|c| c.0).fold(f64::MIN, f64::max).max(0.0);
    let max_y = coords.iter().map(|c| c.1).fold(f64::MIN, f64::max).max(0.0);

    Some(BoundingBox {
        x: min_x as u32,
        y: min_y as u32,
        width: (max_x - min_x) as u32,
        height: (max_y - min_y) as u32,
    })
}
