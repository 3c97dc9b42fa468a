// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end local OCR: detect regions, crop, recognize

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::detection::{OcrDetectionModel, TextRegion};
use super::recognition::{OcrRecognitionModel, RecognizedText};
use super::OcrError;
use crate::config::LocalOcrConfig;
use crate::vision::image_utils::decode_image_bytes;

/// Bounding box for recognized text, in original-image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<TextRegion> for BoundingBox {
    fn from(region: TextRegion) -> Self {
        Self {
            x: region.x1,
            y: region.y1,
            width: region.width(),
            height: region.height(),
        }
    }
}

/// One recognized line with its location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrLine {
    pub text: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// Result of running the local pipeline on one image
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrOutput {
    /// Non-blank lines in detection order
    pub lines: Vec<OcrLine>,
    /// Line texts joined with `\n`
    pub full_text: String,
    /// Number of regions the detector produced
    pub region_count: usize,
    pub processing_time_ms: u64,
}

/// First directory in the search list containing every model file
pub fn resolve_model_dir(config: &LocalOcrConfig) -> Result<PathBuf, OcrError> {
    let required = [
        config.detection_model.as_str(),
        config.recognition_model.as_str(),
        config.vocabulary_file.as_str(),
    ];

    config
        .model_dirs
        .iter()
        .find(|dir| required.iter().all(|file| dir.join(file).is_file()))
        .cloned()
        .ok_or_else(|| {
            OcrError::Configuration(format!(
                "No model directory contains {} (searched: {:?})",
                required.join(", "),
                config.model_dirs
            ))
        })
}

/// Crop a region, clamping width and height to the image
pub fn crop_region(image: &DynamicImage, region: &TextRegion) -> Option<DynamicImage> {
    let (img_w, img_h) = (image.width(), image.height());
    if region.x1 >= img_w || region.y1 >= img_h {
        return None;
    }
    let width = region.width().min(img_w - region.x1);
    let height = region.height().min(img_h - region.y1);
    if width == 0 || height == 0 {
        return None;
    }
    Some(image.crop_imm(region.x1, region.y1, width, height))
}

/// Recognize every region, skipping blank texts and per-region failures
pub fn recognize_regions<F>(image: &DynamicImage, regions: &[TextRegion], mut recognize: F) -> Vec<OcrLine>
where
    F: FnMut(&DynamicImage) -> Result<RecognizedText, OcrError>,
{
    let mut lines = Vec::with_capacity(regions.len());

    for (index, region) in regions.iter().enumerate() {
        let Some(crop) = crop_region(image, region) else {
            continue;
        };

        match recognize(&crop) {
            Ok(recognized) if !recognized.is_empty() => lines.push(OcrLine {
                text: recognized.text,
                confidence: recognized.confidence,
                bounding_box: BoundingBox::from(*region),
            }),
            Ok(_) => {}
            Err(e) => warn!("Recognition failed for region {}: {}", index, e),
        }
    }

    lines
}

/// Local OCR pipeline
///
/// Combines text detection and recognition models. Runs on CPU only.
#[derive(Debug, Clone)]
pub struct PaddleOcrModel {
    detector: OcrDetectionModel,
    recognizer: OcrRecognitionModel,
    model_dir: PathBuf,
}

impl PaddleOcrModel {
    /// Load both models and the vocabulary from the first complete directory
    pub async fn load(config: &LocalOcrConfig) -> Result<Self, OcrError> {
        let model_dir = resolve_model_dir(config)?;
        info!("Loading local OCR models from {}", model_dir.display());

        let detector = OcrDetectionModel::new(model_dir.join(&config.detection_model))
            .await
            .map_err(|e| OcrError::Configuration(format!("{:#}", e)))?;
        let recognizer = OcrRecognitionModel::new(
            model_dir.join(&config.recognition_model),
            model_dir.join(&config.vocabulary_file),
        )
        .await
        .map_err(|e| OcrError::Configuration(format!("{:#}", e)))?;

        Ok(Self {
            detector,
            recognizer,
            model_dir,
        })
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn is_ready(&self) -> bool {
        self.detector.is_ready() && self.recognizer.is_ready()
    }

    /// Run detection and recognition on a decoded image
    pub fn process(&self, image: &DynamicImage) -> Result<OcrOutput, OcrError> {
        let start = Instant::now();

        let regions = self.detector.detect(image)?;
        let lines = recognize_regions(image, &regions, |crop| self.recognizer.recognize(crop));

        let full_text = lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let output = OcrOutput {
            region_count: regions.len(),
            lines,
            full_text,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        debug!(
            "Local OCR: {} regions, {} lines in {}ms",
            output.region_count,
            output.lines.len(),
            output.processing_time_ms
        );
        Ok(output)
    }

    /// Decode encoded image bytes, then [`process`](Self::process)
    pub fn process_bytes(&self, image_bytes: &[u8]) -> Result<OcrOutput, OcrError> {
        let (image, _) = decode_image_bytes(image_bytes)?;
        self.process(&image)
    }
}
