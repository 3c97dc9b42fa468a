// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document OCR service: preprocess, ensemble, cross-validate

use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::cross_validation::{BusinessType, DocumentType, ParsedDocument, TextProcessor};
use crate::engines::{EngineResult, OcrEngine};
use crate::ensemble::{EnsembleCoordinator, EnsembleResult, LOW_QUALITY_THRESHOLD};
use crate::vision::ImagePreprocessor;

/// One document to process
#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub request_id: String,
    pub image: Vec<u8>,
    pub document_type: DocumentType,
    /// Only used for business licenses
    pub business_type: BusinessType,
}

impl OcrRequest {
    /// New business-license request with a random id
    pub fn new(image: Vec<u8>, business_type: BusinessType) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            image,
            document_type: DocumentType::BusinessLicense,
            business_type,
        }
    }

    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = document_type;
        self
    }
}

/// Structured outcome, produced even when every engine fails
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrOutcome {
    pub request_id: String,
    pub document_type: DocumentType,
    pub business_type: BusinessType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ensemble: Option<EnsembleResult>,
    /// Result chosen for single-result consumers
    pub selected: EngineResult,
    /// Text handed to cross-validation
    pub combined_text: String,
    pub quality_score: f64,
    pub low_quality: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ParsedDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    pub elapsed_ms: u64,
}

pub struct DocumentOcrService {
    coordinator: EnsembleCoordinator,
    preprocessor: ImagePreprocessor,
    text_processor: Option<Arc<dyn TextProcessor>>,
}

impl DocumentOcrService {
    pub fn new(
        coordinator: EnsembleCoordinator,
        preprocessor: ImagePreprocessor,
        text_processor: Option<Arc<dyn TextProcessor>>,
    ) -> Self {
        Self {
            coordinator,
            preprocessor,
            text_processor,
        }
    }

    pub fn from_config(
        engines: Vec<Arc<dyn OcrEngine>>,
        config: &OcrConfig,
        text_processor: Option<Arc<dyn TextProcessor>>,
    ) -> Self {
        Self::new(
            EnsembleCoordinator::from_config(engines, config),
            ImagePreprocessor::from(&config.preprocessing),
            text_processor,
        )
    }

    pub fn coordinator(&self) -> &EnsembleCoordinator {
        &self.coordinator
    }

    pub async fn process(&self, request: OcrRequest) -> OcrOutcome {
        let start = Instant::now();
        info!(
            "[{}] processing {} bytes ({}, {})",
            request.request_id,
            request.image.len(),
            request.document_type,
            request.business_type
        );

        let image = self.preprocessor.prepare(&request.image);

        let (ensemble, selected) = if self.coordinator.ensemble_enabled() {
            let ensemble = self
                .coordinator
                .extract_parallel(&image, self.coordinator.timeout())
                .await;
            let selected = self.coordinator.select(&ensemble);
            (Some(ensemble), selected)
        } else {
            (None, self.coordinator.extract_primary(&image).await)
        };

        let (combined_text, quality_score) = match &ensemble {
            Some(ensemble) => (ensemble.to_prompt_format(), ensemble.quality_score()),
            None => {
                let single = EnsembleResult::new(vec![selected.clone()], 0);
                (single.to_prompt_format(), single.quality_score())
            }
        };
        let low_quality = quality_score < LOW_QUALITY_THRESHOLD;
        if low_quality {
            warn!(
                "[{}] low OCR quality ({:.1}%)",
                request.request_id,
                quality_score * 100.0
            );
        }

        let document_type = request.document_type;
        let mut business_type = request.business_type;
        let (parsed, parse_error) = match &self.text_processor {
            Some(processor) if selected.is_success() => {
                if document_type == DocumentType::BusinessLicense
                    && business_type == BusinessType::Unknown
                {
                    business_type = processor.classify_document(selected.full_text()).await;
                }
                match processor
                    .correct_and_parse(&combined_text, document_type, business_type, Some(&image))
                    .await
                {
                    Ok(mut data) => {
                        // the RRN never leaves the service unmasked
                        data.mask_sensitive();
                        (Some(data), None)
                    }
                    Err(e) => {
                        warn!("[{}] cross-validation failed: {:#}", request.request_id, e);
                        (None, Some(format!("{:#}", e)))
                    }
                }
            }
            _ => (None, None),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            "[{}] done in {}ms (selected: {}, success: {})",
            request.request_id, elapsed_ms, selected.engine_name(), selected.is_success()
        );

        OcrOutcome {
            request_id: request.request_id,
            document_type,
            business_type,
            ensemble,
            selected,
            combined_text,
            quality_score,
            low_quality,
            parsed,
            parse_error,
            elapsed_ms,
        }
    }
}
