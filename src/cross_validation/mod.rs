// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cross-validation stage
//!
//! Hands the combined ensemble text to a language model that corrects OCR
//! noise and parses the document fields: business registration certificates,
//! resident ID cards and driver licenses.

pub mod client;
pub mod prompts;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub use client::ChatTextProcessor;

/// Kind of document being read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    #[default]
    BusinessLicense,
    IdCard,
    DriverLicense,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::BusinessLicense => "BUSINESS_LICENSE",
            DocumentType::IdCard => "ID_CARD",
            DocumentType::DriverLicense => "DRIVER_LICENSE",
        }
    }

    /// ID cards and driver licenses carry a resident registration number
    pub fn is_identity(&self) -> bool {
        matches!(self, DocumentType::IdCard | DocumentType::DriverLicense)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "business-license" | "business" | "사업자등록증" => Ok(DocumentType::BusinessLicense),
            "id-card" | "id" | "주민등록증" => Ok(DocumentType::IdCard),
            "driver-license" | "driver" | "운전면허증" => Ok(DocumentType::DriverLicense),
            other => Err(format!("unknown document type: {}", other)),
        }
    }
}

/// Kind of business registration on a business license
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BusinessType {
    Individual,
    Corporate,
    #[default]
    Unknown,
}

impl BusinessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessType::Individual => "INDIVIDUAL",
            BusinessType::Corporate => "CORPORATE",
            BusinessType::Unknown => "UNKNOWN",
        }
    }

    /// Classify a free-form model reply; `CORPORATE` wins over `INDIVIDUAL`
    pub fn from_reply(reply: &str) -> Self {
        let upper = reply.trim().to_uppercase();
        if upper.contains("CORPORATE") {
            BusinessType::Corporate
        } else if upper.contains("INDIVIDUAL") {
            BusinessType::Individual
        } else {
            BusinessType::Unknown
        }
    }
}

impl fmt::Display for BusinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "individual" | "개인" | "개인사업자" => Ok(BusinessType::Individual),
            "corporate" | "법인" | "법인사업자" => Ok(BusinessType::Corporate),
            "unknown" | "" => Ok(BusinessType::Unknown),
            other => Err(format!("unknown business type: {}", other)),
        }
    }
}

/// Fields parsed from any supported document
///
/// Business licenses fill the business fields, identity documents fill
/// `name`, `rrn` and the license fields; `address` is shared. Missing or
/// `null` values deserialize to empty strings; unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedDocument {
    #[serde(deserialize_with = "nullable_string")]
    pub document_type: String,
    #[serde(deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(deserialize_with = "nullable_string")]
    pub issue_date: String,
    #[serde(deserialize_with = "nullable_string")]
    pub business_number: String,
    #[serde(deserialize_with = "nullable_string")]
    pub merchant_name: String,
    #[serde(deserialize_with = "nullable_string")]
    pub representative_name: String,
    #[serde(deserialize_with = "nullable_string")]
    pub opening_date: String,
    #[serde(deserialize_with = "nullable_string")]
    pub address: String,
    #[serde(deserialize_with = "nullable_string")]
    pub business_type: String,
    #[serde(deserialize_with = "nullable_string")]
    pub business_item: String,
    #[serde(deserialize_with = "nullable_string")]
    pub corporate_number: String,
    #[serde(deserialize_with = "nullable_string")]
    pub head_office_address: String,
    #[serde(deserialize_with = "nullable_string")]
    pub tax_office: String,
    /// Resident registration number, masked after the hyphen
    #[serde(deserialize_with = "nullable_string")]
    pub rrn: String,
    #[serde(deserialize_with = "nullable_string")]
    pub license_number: String,
    /// 1종보통, 2종보통, ...
    #[serde(deserialize_with = "nullable_string")]
    pub license_type: String,
    #[serde(deserialize_with = "nullable_string")]
    pub serial_number: String,
    #[serde(deserialize_with = "nullable_string")]
    pub issuer: String,
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ParsedDocument {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Number of non-empty fields
    pub fn filled_fields(&self) -> usize {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map
                .values()
                .filter(|v| v.as_str().is_some_and(|s| !s.is_empty()))
                .count(),
            _ => 0,
        }
    }

    /// Replace the RRN back half with `*`; safe to apply twice
    pub fn mask_sensitive(&mut self) {
        if !self.rrn.is_empty() {
            self.rrn = mask_rrn(&self.rrn);
        }
    }

    /// Parse a model reply, tolerating code fences and surrounding prose
    pub fn from_reply(reply: &str) -> Self {
        let json = extract_json(reply);
        serde_json::from_str(json).unwrap_or_else(|e| {
            warn!("Unparsable cross-validation reply: {}", e);
            Self::default()
        })
    }
}

/// Mask a resident registration number after the hyphen
///
/// `900101-1234567` becomes `900101-*******`. Without a hyphen the first six
/// characters are kept as the birth date and the rest masked; six characters
/// or fewer are returned as is.
pub fn mask_rrn(rrn: &str) -> String {
    let rrn = rrn.trim();
    let (front, back) = match rrn.split_once('-') {
        Some((front, back)) => (front.trim(), back.trim()),
        None => match rrn.char_indices().nth(6) {
            Some((split, _)) => (&rrn[..split], &rrn[split..]),
            None => return rrn.to_string(),
        },
    };
    let masked: String = back
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|_| '*')
        .collect();
    format!("{}-{}", front, masked)
}

/// Outermost `{...}` of a reply, or `{}` when there is none
pub fn extract_json(reply: &str) -> &str {
    match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if end > start => &reply[start..=end],
        _ => "{}",
    }
}

/// Downstream language-model stage
#[async_trait]
pub trait TextProcessor: Send + Sync {
    /// Correct OCR errors in the combined text and parse the fields
    ///
    /// `business_type` only matters for business licenses. `image` is the
    /// preprocessed document, attached when the model can see.
    async fn correct_and_parse(
        &self,
        combined_text: &str,
        document_type: DocumentType,
        business_type: BusinessType,
        image: Option<&[u8]>,
    ) -> Result<ParsedDocument>;

    /// Guess the business type of a business license from OCR text
    async fn classify_document(&self, _text: &str) -> BusinessType {
        BusinessType::Unknown
    }
}
