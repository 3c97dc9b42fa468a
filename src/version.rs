// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Kordoc OCR node

/// Full version string with feature description
pub const VERSION: &str = "v0.3.0-ensemble-ocr-2025-11-04";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.3.0";

/// Build date
pub const BUILD_DATE: &str = "2025-11-04";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "ensemble-ocr",
    "remote-ocr-sidecars",
    "local-onnx-ocr",
    "hangul-composition",
    "cross-validation",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Kordoc OCR Node {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for JSON output
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
