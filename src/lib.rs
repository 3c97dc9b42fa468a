// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod cross_validation;
pub mod engines;
pub mod ensemble;
pub mod service;
pub mod version;
pub mod vision;

// Re-export main types
pub use config::{ConfigError, OcrConfig};
pub use cross_validation::{
    mask_rrn, BusinessType, ChatTextProcessor, DocumentType, ParsedDocument, TextProcessor,
};
pub use engines::{build_engines, EngineResult, LocalOnnxEngine, OcrEngine, RemoteOcrEngine};
pub use ensemble::{EnsembleCoordinator, EnsembleResult};
pub use service::{DocumentOcrService, OcrOutcome, OcrRequest};
pub use vision::ocr::{OcrError, PaddleOcrModel};
