// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR engine trait definition

use async_trait::async_trait;

use super::types::EngineResult;

/// Trait for implementing OCR engines
///
/// Engines never return errors or panic past this boundary: every failure
/// is reported as a failed [`EngineResult`] tagged with `engine_id`.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Extract text from encoded image bytes
    async fn extract_text(&self, image_bytes: &[u8]) -> EngineResult;

    /// Check whether the backend is reachable and ready
    async fn is_healthy(&self) -> bool;

    /// Stable id used in results and health maps
    fn engine_id(&self) -> &str;

    /// Display name used in logs and the combined text
    fn display_name(&self) -> &str;

    /// Get engine priority (lower = runs and ranks first)
    ///
    /// Default priority is 100.
    fn priority(&self) -> u8 {
        100
    }
}
