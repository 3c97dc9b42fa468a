// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local Korean OCR on ONNX Runtime
//!
//! Components:
//! - `detection` - Text region detection (PP-OCRv4 DB model + flood fill)
//! - `recognition` - Crop recognition with CTC decoding
//! - `hangul` - Jamo to syllable composition
//! - `preprocessing` - Tensor preparation for both models
//! - `model` - Combined pipeline

pub mod detection;
pub mod hangul;
pub mod model;
pub mod preprocessing;
pub mod recognition;

use thiserror::Error;

use super::image_utils::ImageError;

pub use detection::{OcrDetectionModel, TextRegion};
pub use model::{BoundingBox, OcrLine, OcrOutput, PaddleOcrModel};
pub use recognition::{OcrRecognitionModel, RecognizedText};

/// Errors raised by the local OCR pipeline
#[derive(Debug, Error)]
pub enum OcrError {
    /// The input bytes are not a usable image
    #[error("Failed to decode image: {0}")]
    Decode(#[from] ImageError),

    /// A model invocation failed or produced unusable output
    #[error("OCR inference failed: {0}")]
    Inference(String),

    /// Model files or vocabulary are missing or invalid
    #[error("OCR configuration error: {0}")]
    Configuration(String),
}
