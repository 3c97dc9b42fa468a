// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text recognition and CTC decoding
//!
//! Each detected crop is resized to a 48 px high strip, run through the
//! recognition model, and decoded best-path: argmax per timestep, collapse
//! repeats, drop blanks (class 0), then compose Korean jamo.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{ArrayView2, ArrayViewD, Axis, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::hangul;
use super::preprocessing::preprocess_for_recognition;
use super::OcrError;

/// Recognized text with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    /// Decoded, jamo-composed, trimmed text
    pub text: String,
    /// Mean of the kept timesteps' max probabilities (0.0-1.0)
    pub confidence: f32,
    /// Max probability of each kept timestep
    pub char_confidences: Vec<f32>,
}

impl RecognizedText {
    pub fn new(text: String, confidence: f32) -> Self {
        Self {
            text,
            confidence,
            char_confidences: Vec::new(),
        }
    }

    /// Check if the text is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Load a recognition vocabulary, one entry per line
///
/// Entry `i` decodes class `i + 1`. Line endings (`\n` or `\r\n`) are
/// stripped. Empty lines inside the file are kept so later classes keep their
/// index; only the final newline does not add an entry.
pub fn load_vocabulary<P: AsRef<Path>>(path: P) -> Result<Vec<String>, OcrError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        OcrError::Configuration(format!(
            "Failed to read vocabulary {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(parse_vocabulary(&content))
}

fn parse_vocabulary(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

/// First maximum of a row as (class, probability)
fn argmax(row: ndarray::ArrayView1<f32>) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (class, &prob) in row.iter().enumerate() {
        match best {
            Some((_, max)) if prob <= max => {}
            _ => best = Some((class, prob)),
        }
    }
    best
}

/// Best-path CTC decode of a `(T, C)` probability matrix
///
/// The previous class is tracked across blanks, so `A _ A` yields `AA`
/// while `A A` yields `A`. Classes beyond the vocabulary are ignored.
pub fn ctc_decode(probs: ArrayView2<f32>, vocabulary: &[String]) -> RecognizedText {
    let mut raw = String::new();
    let mut char_confidences = Vec::new();
    let mut prev_class: Option<usize> = None;

    for row in probs.rows() {
        let Some((class, prob)) = argmax(row) else {
            continue;
        };

        if class != 0 && prev_class != Some(class) {
            if let Some(entry) = vocabulary.get(class - 1) {
                raw.push_str(entry);
                char_confidences.push(prob);
            }
        }
        prev_class = Some(class);
    }

    let confidence = if char_confidences.is_empty() {
        0.0
    } else {
        let mean = char_confidences.iter().sum::<f32>() / char_confidences.len() as f32;
        mean.clamp(0.0, 1.0)
    };

    RecognizedText {
        text: hangul::compose(&raw).trim().to_string(),
        confidence,
        char_confidences,
    }
}

/// View a `[1,T,C]` or `[T,C]` output as `(T, C)`
fn as_timesteps(output: ArrayViewD<'_, f32>) -> Option<ArrayView2<'_, f32>> {
    match output.ndim() {
        3 if output.shape()[0] == 1 => output
            .index_axis_move(Axis(0), 0)
            .into_dimensionality::<Ix2>()
            .ok(),
        2 => output.into_dimensionality::<Ix2>().ok(),
        _ => None,
    }
}

/// PP-OCR text recognition model with its vocabulary
#[derive(Clone)]
pub struct OcrRecognitionModel {
    session: Arc<Mutex<Session>>,
    vocabulary: Arc<Vec<String>>,
    input_name: String,
    class_mismatch_logged: Arc<AtomicBool>,
    is_ready: bool,
}

impl std::fmt::Debug for OcrRecognitionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrRecognitionModel")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("input_name", &self.input_name)
            .field("is_ready", &self.is_ready)
            .finish_non_exhaustive()
    }
}

impl OcrRecognitionModel {
    /// Load the recognition model and its vocabulary
    ///
    /// # Errors
    /// Returns error if either file is missing or ONNX Runtime rejects the
    /// model.
    pub async fn new<P: AsRef<Path>>(model_path: P, vocabulary_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let vocabulary_path = vocabulary_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR recognition model not found: {}", model_path.display());
        }
        if !vocabulary_path.exists() {
            anyhow::bail!(
                "OCR vocabulary not found: {}",
                vocabulary_path.display()
            );
        }

        info!("Loading OCR recognition model from {}", model_path.display());

        let vocabulary = load_vocabulary(vocabulary_path)?;
        info!("Loaded vocabulary with {} entries", vocabulary.len());

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
                "Failed to load OCR recognition model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        debug!("Recognition model loaded - input: {}", input_name);
        info!("✅ OCR recognition model loaded successfully (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            vocabulary: Arc::new(vocabulary),
            input_name,
            class_mismatch_logged: Arc::new(AtomicBool::new(false)),
            is_ready: true,
        })
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    /// Recognize the text in a cropped region
    pub fn recognize(&self, crop: &DynamicImage) -> Result<RecognizedText, OcrError> {
        let tensor = preprocess_for_recognition(crop);

        let mut session = self
            .session
            .lock()
            .map_err(|_| OcrError::Inference("recognition session lock poisoned".to_string()))?;

        let input_value = Value::from_array(tensor)
            .map_err(|e| OcrError::Inference(format!("Failed to create input tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(|e| OcrError::Inference(format!("Recognition inference failed: {}", e)))?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| OcrError::Inference(format!("Failed to extract output tensor: {}", e)))?;

        let shape = output_tensor.shape().to_vec();
        let probs = as_timesteps(output_tensor.view()).ok_or_else(|| {
            OcrError::Inference(format!("Unexpected recognition output shape: {:?}", shape))
        })?;

        let classes = probs.ncols();
        if classes != self.vocabulary.len() + 1
            && !self.class_mismatch_logged.swap(true, Ordering::Relaxed)
        {
            debug!(
                "Recognition classes ({}) differ from vocabulary size + 1 ({})",
                classes,
                self.vocabulary.len() + 1
            );
        }

        Ok(ctc_decode(probs, &self.vocabulary))
    }
}
