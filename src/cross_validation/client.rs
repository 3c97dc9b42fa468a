// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cross-validation client for an OpenAI-compatible chat API

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::prompts::{classification_prompt, field_parsing_prompt};
use super::{BusinessType, DocumentType, ParsedDocument, TextProcessor};
use crate::config::CrossValidationConfig;
use crate::vision::detect_format;

const PARSE_TEMPERATURE: f32 = 0.1;
const PARSE_MAX_TOKENS: u32 = 2048;
const CLASSIFY_MAX_TOKENS: u32 = 16;

// --- OpenAI-compatible serde structs ---

#[derive(serde::Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(serde::Serialize)]
struct ChatMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(serde::Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Text processor backed by a chat-completions endpoint (Ollama, vLLM, ...)
pub struct ChatTextProcessor {
    client: Client,
    endpoint: String,
    model_name: String,
}

impl ChatTextProcessor {
    pub fn new(config: &CrossValidationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        info!(
            "Cross-validation client configured: endpoint={}, model={}",
            endpoint, config.model
        );

        Ok(Self {
            client,
            endpoint,
            model_name: config.model.clone(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub async fn health_check(&self) -> bool {
        match self
            .client
            .get(format!("{}/health", self.endpoint))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!("Cross-validation health check failed: {}", e);
                false
            }
        }
    }

    fn build_request(&self, prompt: &str, image: Option<&[u8]>, max_tokens: u32) -> ChatRequest {
        let content = match image {
            Some(bytes) => serde_json::json!([
                {"type": "text", "text": prompt},
                {"type": "image_url", "image_url": {"url": data_url(bytes)}}
            ]),
            None => serde_json::Value::String(prompt.to_string()),
        };

        ChatRequest {
            model: self.model_name.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
            max_tokens,
            temperature: PARSE_TEMPERATURE,
        }
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let start = Instant::now();
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.endpoint))
            .json(request)
            .send()
            .await
            .context("Cross-validation request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Cross-validation endpoint returned {}: {}", status, body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Invalid chat completion response")?;
        let tokens_used = chat_response.usage.map(|u| u.total_tokens).unwrap_or(0);
        let text = chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        debug!(
            "Cross-validation reply in {}ms ({} tokens)",
            start.elapsed().as_millis(),
            tokens_used
        );
        Ok(text)
    }
}

/// `data:` URL for an inline image; unknown formats are labelled PNG
fn data_url(bytes: &[u8]) -> String {
    let mime = detect_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/png");
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

#[async_trait]
impl TextProcessor for ChatTextProcessor {
    async fn correct_and_parse(
        &self,
        combined_text: &str,
        document_type: DocumentType,
        business_type: BusinessType,
        image: Option<&[u8]>,
    ) -> Result<ParsedDocument> {
        let prompt = field_parsing_prompt(document_type, business_type, combined_text);
        let request = self.build_request(&prompt, image, PARSE_MAX_TOKENS);
        let reply = self.complete(&request).await?;

        let mut data = ParsedDocument::from_reply(&reply);
        data.mask_sensitive();
        if data.is_empty() {
            warn!("Cross-validation returned no fields ({})", document_type);
        } else {
            // field count only; identity documents carry personal data
            info!(
                "Cross-validation parsed {} ({}): {} fields",
                document_type,
                business_type,
                data.filled_fields()
            );
        }
        Ok(data)
    }

    async fn classify_document(&self, text: &str) -> BusinessType {
        let request = self.build_request(&classification_prompt(text), None, CLASSIFY_MAX_TOKENS);
        match self.complete(&request).await {
            Ok(reply) => BusinessType::from_reply(&reply),
            Err(e) => {
                warn!("Document classification failed: {:#}", e);
                BusinessType::Unknown
            }
        }
    }
}
