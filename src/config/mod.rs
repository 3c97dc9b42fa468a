// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime configuration
//!
//! Settings come from environment variables (`OcrConfig::from_env`, after
//! `dotenv`) or from a TOML file (`OcrConfig::from_toml_file`). Missing keys
//! fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Engine id reserved for the in-process ONNX pipeline
pub const LOCAL_ENGINE_ID: &str = "local";

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One HTTP OCR sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteEngineConfig {
    /// Stable id used in results and health maps (e.g. "paddleocr")
    pub id: String,
    /// Display name used in logs and the combined text
    pub name: String,
    /// Base URL; `/ocr` and `/health` are appended
    pub endpoint: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,
    /// Lower runs and ranks first
    #[serde(default = "default_priority")]
    pub priority: u8,
}

fn default_engine_timeout() -> u64 {
    60
}

fn default_priority() -> u8 {
    100
}

impl RemoteEngineConfig {
    pub fn new(id: &str, name: &str, endpoint: &str, priority: u8) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            endpoint: endpoint.to_string(),
            timeout_secs: default_engine_timeout(),
            priority,
        }
    }
}

/// In-process detection + recognition models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalOcrConfig {
    pub enabled: bool,
    /// Directories searched in order; the first one holding all three files wins
    pub model_dirs: Vec<PathBuf>,
    pub detection_model: String,
    pub recognition_model: String,
    pub vocabulary_file: String,
    pub priority: u8,
}

impl Default for LocalOcrConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model_dirs: vec![PathBuf::from("./models/paddleocr")],
            detection_model: "ch_PP-OCRv4_det_infer.onnx".to_string(),
            recognition_model: "korean_PP-OCRv3_rec_infer.onnx".to_string(),
            vocabulary_file: "korean_dict.txt".to_string(),
            priority: 5,
        }
    }
}

/// Image normalization applied before OCR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    pub grayscale: bool,
    pub contrast_factor: f32,
    pub min_width: u32,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            grayscale: true,
            contrast_factor: 1.3,
            min_width: 1000,
        }
    }
}

/// OpenAI-compatible chat endpoint that parses the combined OCR text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationConfig {
    pub endpoint: String,
    #[serde(default = "default_cross_validation_model")]
    pub model: String,
    #[serde(default = "default_cross_validation_timeout")]
    pub timeout_secs: u64,
}

fn default_cross_validation_model() -> String {
    "gemma2:2b".to_string()
}

fn default_cross_validation_timeout() -> u64 {
    120
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run every engine and pick the best result
    pub ensemble_enabled: bool,
    /// Shared deadline for one ensemble run
    pub ensemble_timeout_secs: u64,
    /// Engine used when the ensemble is disabled or yields nothing
    pub primary_engine: String,
    pub engines: Vec<RemoteEngineConfig>,
    pub local: LocalOcrConfig,
    pub preprocessing: PreprocessingConfig,
    pub cross_validation: Option<CrossValidationConfig>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            ensemble_enabled: true,
            ensemble_timeout_secs: 90,
            primary_engine: "paddleocr".to_string(),
            engines: vec![
                RemoteEngineConfig::new("paddleocr", "PaddleOCR", "http://localhost:9003", 10),
                RemoteEngineConfig::new("pororo", "Pororo", "http://localhost:9004", 20),
                RemoteEngineConfig::new("easyocr", "EasyOCR", "http://localhost:9005", 30),
            ],
            local: LocalOcrConfig::default(),
            preprocessing: PreprocessingConfig::default(),
            cross_validation: None,
        }
    }
}

fn parse_value<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl OcrConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup (environment, test maps)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(enabled) = lookup("ENSEMBLE_ENABLED").and_then(|v| parse_bool(&v)) {
            config.ensemble_enabled = enabled;
        }
        if let Some(timeout) = parse_value(&lookup, "ENSEMBLE_TIMEOUT_SECS") {
            config.ensemble_timeout_secs = timeout;
        }
        if let Some(primary) = lookup("PRIMARY_OCR_ENGINE") {
            config.primary_engine = primary.trim().to_lowercase();
        }

        for engine in config.engines.iter_mut() {
            let prefix = engine.id.to_uppercase();
            if let Some(url) = lookup(&format!("{}_API_URL", prefix)) {
                engine.endpoint = url.trim_end_matches('/').to_string();
            }
            if let Some(timeout) = parse_value(&lookup, &format!("{}_TIMEOUT_SECS", prefix)) {
                engine.timeout_secs = timeout;
            }
        }

        if let Some(enabled) = lookup("LOCAL_OCR_ENABLED").and_then(|v| parse_bool(&v)) {
            config.local.enabled = enabled;
        }
        if let Some(dirs) = lookup("OCR_MODEL_DIRS") {
            let dirs: Vec<PathBuf> = dirs
                .split(':')
                .filter(|d| !d.trim().is_empty())
                .map(|d| PathBuf::from(d.trim()))
                .collect();
            if !dirs.is_empty() {
                config.local.model_dirs = dirs;
            }
        }
        if let Some(name) = lookup("OCR_DETECTION_MODEL") {
            config.local.detection_model = name;
        }
        if let Some(name) = lookup("OCR_RECOGNITION_MODEL") {
            config.local.recognition_model = name;
        }
        if let Some(name) = lookup("OCR_VOCABULARY_FILE") {
            config.local.vocabulary_file = name;
        }

        if let Some(grayscale) = lookup("OCR_GRAYSCALE").and_then(|v| parse_bool(&v)) {
            config.preprocessing.grayscale = grayscale;
        }
        if let Some(factor) = parse_value(&lookup, "OCR_CONTRAST_FACTOR") {
            config.preprocessing.contrast_factor = factor;
        }
        if let Some(width) = parse_value(&lookup, "OCR_MIN_WIDTH") {
            config.preprocessing.min_width = width;
        }

        if let Some(endpoint) = lookup("CROSS_VALIDATION_URL").filter(|v| !v.trim().is_empty()) {
            config.cross_validation = Some(CrossValidationConfig {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                model: lookup("CROSS_VALIDATION_MODEL")
                    .unwrap_or_else(default_cross_validation_model),
                timeout_secs: parse_value(&lookup, "CROSS_VALIDATION_TIMEOUT_SECS")
                    .unwrap_or_else(default_cross_validation_timeout),
            });
        }

        config
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Ids of every configured engine, local first when enabled
    pub fn engine_ids(&self) -> Vec<&str> {
        let mut ids = Vec::with_capacity(self.engines.len() + 1);
        if self.local.enabled {
            ids.push(LOCAL_ENGINE_ID);
        }
        ids.extend(self.engines.iter().map(|e| e.id.as_str()));
        ids
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ensemble_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "Ensemble timeout must be greater than 0".to_string(),
            ));
        }
        let contrast = self.preprocessing.contrast_factor;
        if contrast.is_nan() || contrast <= 0.0 {
            return Err(ConfigError::Invalid(
                "Contrast factor must be positive".to_string(),
            ));
        }

        let ids = self.engine_ids();
        if ids.is_empty() {
            return Err(ConfigError::Invalid("No OCR engines configured".to_string()));
        }
        for (i, id) in ids.iter().enumerate() {
            if ids[..i].contains(id) {
                return Err(ConfigError::Invalid(format!("Duplicate engine id: {}", id)));
            }
        }
        if !ids.contains(&self.primary_engine.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Primary engine '{}' is not configured",
                self.primary_engine
            )));
        }
        if let Some(engine) = self.engines.iter().find(|e| e.timeout_secs == 0) {
            return Err(ConfigError::Invalid(format!(
                "Timeout for engine '{}' must be greater than 0",
                engine.id
            )));
        }

        Ok(())
    }
}
