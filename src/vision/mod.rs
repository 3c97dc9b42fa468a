// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image handling and the local OCR pipeline
//!
//! This module provides:
//! - Byte-level decode/encode helpers
//! - Document photo preprocessing shared by every engine
//! - Korean OCR on ONNX Runtime (CPU only)

pub mod image_utils;
pub mod ocr;
pub mod preprocessor;

pub use image_utils::{decode_base64_image, decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use preprocessor::ImagePreprocessor;
