// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text region detection
//!
//! Runs the PP-OCR detection model on a resized copy of the image and turns
//! the per-pixel text probability map into axis-aligned boxes with a
//! connected-component flood fill.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{ArrayViewD, IxDyn};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::preprocessing::preprocess_for_detection;
use super::OcrError;

/// Default probability threshold for text pixels
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.3;

/// Components narrower or shorter than this (in map pixels) are discarded
pub const MIN_REGION_EXTENT: usize = 5;

/// Minimum padding added around each component
pub const MIN_REGION_PADDING: usize = 3;

/// Axis-aligned text box in original-image coordinates
///
/// `x1 < x2` and `y1 < y2` hold for every region returned by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRegion {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl TextRegion {
    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }
}

/// Detection probability map at the resized resolution, row-major
#[derive(Debug, Clone)]
pub struct ProbabilityMap {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl ProbabilityMap {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Self {
        let mut data = data;
        data.resize(width * height, 0.0);
        Self {
            width,
            height,
            data,
        }
    }

    /// Copy a model output into a `width` x `height` map
    ///
    /// Accepts `[1,1,H,W]`, `[1,H,W]` and `[H,W]`. Cells outside the output
    /// stay zero. Returns `None` for any other layout.
    pub fn from_output(output: ArrayViewD<f32>, width: usize, height: usize) -> Option<Self> {
        let shape = output.shape().to_vec();
        let (out_h, out_w) = match shape.as_slice() {
            [1, 1, h, w] | [1, h, w] | [h, w] => (*h, *w),
            _ => return None,
        };

        let mut data = vec![0.0; width * height];
        for y in 0..out_h.min(height) {
            for x in 0..out_w.min(width) {
                let value = match shape.len() {
                    4 => output[IxDyn(&[0, 0, y, x])],
                    3 => output[IxDyn(&[0, y, x])],
                    _ => output[IxDyn(&[y, x])],
                };
                data[y * width + x] = value;
            }
        }

        Some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }
}

/// Inclusive component bounds in map coordinates after padding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapBox {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

/// Extract padded boxes for every 4-connected component above `threshold`
///
/// Components are found in row-major scan order. Components whose extent is
/// below [`MIN_REGION_EXTENT`] on either axis are dropped; survivors are
/// padded by `max(3, extent / 10)` and clamped to the map.
pub fn find_regions(map: &ProbabilityMap, threshold: f32) -> Vec<MapBox> {
    let (width, height) = (map.width, map.height);
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut visited = vec![false; width * height];
    let mut boxes = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if visited[y * width + x] || map.get(x, y) <= threshold {
                continue;
            }

            let (min_x, min_y, max_x, max_y) = flood_fill(map, threshold, &mut visited, x, y);
            let extent_x = max_x - min_x;
            let extent_y = max_y - min_y;
            if extent_x < MIN_REGION_EXTENT || extent_y < MIN_REGION_EXTENT {
                continue;
            }

            let pad_x = MIN_REGION_PADDING.max(extent_x / 10);
            let pad_y = MIN_REGION_PADDING.max(extent_y / 10);
            boxes.push(MapBox {
                min_x: min_x.saturating_sub(pad_x),
                min_y: min_y.saturating_sub(pad_y),
                max_x: (max_x + pad_x).min(width - 1),
                max_y: (max_y + pad_y).min(height - 1),
            });
        }
    }

    boxes
}

/// Stack-based flood fill; neighbours pushed right, left, down, up
fn flood_fill(
    map: &ProbabilityMap,
    threshold: f32,
    visited: &mut [bool],
    start_x: usize,
    start_y: usize,
) -> (usize, usize, usize, usize) {
    let (width, height) = (map.width as isize, map.height as isize);
    let mut stack = vec![(start_x as isize, start_y as isize)];
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (start_x, start_y, start_x, start_y);

    while let Some((x, y)) = stack.pop() {
        if x < 0 || y < 0 || x >= width || y >= height {
            continue;
        }
        let (ux, uy) = (x as usize, y as usize);
        let index = uy * map.width + ux;
        if visited[index] || map.get(ux, uy) <= threshold {
            continue;
        }
        visited[index] = true;

        min_x = min_x.min(ux);
        max_x = max_x.max(ux);
        min_y = min_y.min(uy);
        max_y = max_y.max(uy);

        stack.push((x + 1, y));
        stack.push((x - 1, y));
        stack.push((x, y + 1));
        stack.push((x, y - 1));
    }

    (min_x, min_y, max_x, max_y)
}

/// Map a box from the resized map back to the original image
///
/// Coordinates scale by `orig / resized` per axis (truncating) and are
/// clamped to the image. Returns `None` when the box collapses.
pub fn scale_to_original(
    region: &MapBox,
    resized: (u32, u32),
    original: (u32, u32),
) -> Option<TextRegion> {
    let (resized_w, resized_h) = resized;
    let (orig_w, orig_h) = original;
    if resized_w == 0 || resized_h == 0 {
        return None;
    }

    let scale_x = orig_w as f32 / resized_w as f32;
    let scale_y = orig_h as f32 / resized_h as f32;
    let scale = |v: usize, s: f32, limit: u32| ((v as f32 * s) as u32).min(limit);

    let region = TextRegion {
        x1: scale(region.min_x, scale_x, orig_w),
        y1: scale(region.min_y, scale_y, orig_h),
        x2: scale(region.max_x, scale_x, orig_w),
        y2: scale(region.max_y, scale_y, orig_h),
    };

    (region.x1 < region.x2 && region.y1 < region.y2).then_some(region)
}

/// PP-OCR text detection model
///
/// CPU-only ONNX session behind a mutex; `run` needs exclusive access.
#[derive(Clone)]
pub struct OcrDetectionModel {
    session: Arc<Mutex<Session>>,
    input_name: String,
    confidence_threshold: f32,
    is_ready: bool,
}

impl std::fmt::Debug for OcrDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrDetectionModel")
            .field("input_name", &self.input_name)
            .field("confidence_threshold", &self.confidence_threshold)
            .field("is_ready", &self.is_ready)
            .finish_non_exhaustive()
    }
}

impl OcrDetectionModel {
    /// Load the detection model from an ONNX file
    ///
    /// # Errors
    /// Returns error if the file is missing or ONNX Runtime rejects it.
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR detection model not found: {}", model_path.display());
        }

        info!("Loading OCR detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load OCR detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        debug!("Detection model loaded - input: {}", input_name);
        info!("✅ OCR detection model loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            confidence_threshold: DEFAULT_DETECTION_THRESHOLD,
            is_ready: true,
        })
    }

    /// Set the text pixel threshold, clamped to `[0, 1]`
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    /// Detect text regions in `image`, in original-image coordinates
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<TextRegion>, OcrError> {
        let original = (image.width(), image.height());
        let (tensor, resized) = preprocess_for_detection(image);

        let map = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| OcrError::Inference("detection session lock poisoned".to_string()))?;

            let input_value = Value::from_array(tensor)
                .map_err(|e| OcrError::Inference(format!("Failed to create input tensor: {}", e)))?;

            let outputs = session
                .run(ort::inputs![&self.input_name => input_value])
                .map_err(|e| OcrError::Inference(format!("Detection inference failed: {}", e)))?;

            let output_tensor = outputs[0].try_extract_array::<f32>().map_err(|e| {
                OcrError::Inference(format!("Failed to extract output tensor: {}", e))
            })?;

            debug!("Detection output shape: {:?}", output_tensor.shape());
            ProbabilityMap::from_output(output_tensor.view(), resized.0 as usize, resized.1 as usize)
                .ok_or_else(|| format!("{:?}", output_tensor.shape()))
        };

        let map = match map {
            Ok(map) => map,
            Err(shape) => {
                warn!("Unexpected detection output shape {}, no regions", shape);
                return Ok(Vec::new());
            }
        };

        let regions: Vec<TextRegion> = find_regions(&map, self.confidence_threshold)
            .iter()
            .filter_map(|b| scale_to_original(b, resized, original))
            .collect();

        debug!("Detected {} text regions", regions.len());
        Ok(regions)
    }
}
