// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types shared by every OCR engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::vision::ocr::BoundingBox;

/// Error message recorded for engines that miss the ensemble deadline
pub const TIMEOUT_MESSAGE: &str = "Timeout";

/// Recorded when an engine fails without saying why
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown";

/// A single recognized line from one engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedLine {
    pub text: String,
    /// Confidence in `[0, 1]`
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl RecognizedLine {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            bounding_box: None,
        }
    }
}

/// Outcome of one engine on one image
///
/// Only built through the constructors below: a failed result always has
/// empty `lines`, empty `full_text` and a non-empty `error_message`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineResult {
    engine_id: String,
    engine_name: String,
    success: bool,
    full_text: String,
    lines: Vec<RecognizedLine>,
    /// Mean line confidence, 0.0 without lines
    confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    processing_time_ms: u64,
}

impl EngineResult {
    /// Successful result; confidence is the mean line confidence
    pub fn success(
        engine_id: &str,
        engine_name: &str,
        full_text: String,
        lines: Vec<RecognizedLine>,
        processing_time_ms: u64,
    ) -> Self {
        let confidence = if lines.is_empty() {
            0.0
        } else {
            lines.iter().map(|l| l.confidence).sum::<f32>() / lines.len() as f32
        };

        Self {
            engine_id: engine_id.to_string(),
            engine_name: engine_name.to_string(),
            success: true,
            full_text,
            lines,
            confidence: confidence.clamp(0.0, 1.0),
            error_message: None,
            processing_time_ms,
        }
    }

    /// Successful result with `full_text` built by joining line texts
    pub fn from_lines(
        engine_id: &str,
        engine_name: &str,
        lines: Vec<RecognizedLine>,
        processing_time_ms: u64,
    ) -> Self {
        let full_text = join_lines(&lines);
        Self::success(engine_id, engine_name, full_text, lines, processing_time_ms)
    }

    /// Failed result; an empty message is recorded as `Unknown`
    pub fn failure(
        engine_id: &str,
        engine_name: &str,
        message: impl Into<String>,
        processing_time_ms: u64,
    ) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = UNKNOWN_ERROR_MESSAGE.to_string();
        }

        Self {
            engine_id: engine_id.to_string(),
            engine_name: engine_name.to_string(),
            success: false,
            full_text: String::new(),
            lines: Vec::new(),
            confidence: 0.0,
            error_message: Some(message),
            processing_time_ms,
        }
    }

    pub fn timeout(engine_id: &str, engine_name: &str, processing_time_ms: u64) -> Self {
        Self::failure(engine_id, engine_name, TIMEOUT_MESSAGE, processing_time_ms)
    }

    pub fn is_timeout(&self) -> bool {
        !self.success && self.error_message.as_deref() == Some(TIMEOUT_MESSAGE)
    }

    pub fn engine_id(&self) -> &str {
        &self.engine_id
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn lines(&self) -> &[RecognizedLine] {
        &self.lines
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Set exactly when the result is a failure
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn processing_time_ms(&self) -> u64 {
        self.processing_time_ms
    }
}

/// Line texts joined with `\n`
pub fn join_lines(lines: &[RecognizedLine]) -> String {
    lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors inside an engine before they are folded into a failed result
#[derive(Debug, Error)]
pub enum EngineError {
    /// Transport failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service answered with an error
    #[error("OCR API error: {status} - {message}")]
    Api {
        /// HTTP status code (0 when the error came from the body)
        status: u16,
        message: String,
    },

    /// The body could not be understood
    #[error("Invalid OCR response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            EngineError::InvalidResponse(e.to_string())
        } else {
            EngineError::Http(e.to_string())
        }
    }
}
