// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Document service end to end: preprocessing, ensemble, cross-validation

use async_trait::async_trait;
use axum::{routing::post, Json, Router};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use kordoc_ocr_node::config::{CrossValidationConfig, OcrConfig};
use kordoc_ocr_node::cross_validation::{BusinessType, ChatTextProcessor, DocumentType, TextProcessor};
use kordoc_ocr_node::engines::{EngineResult, OcrEngine, RecognizedLine};
use kordoc_ocr_node::service::{DocumentOcrService, OcrRequest};
use kordoc_ocr_node::vision::decode_image_bytes;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};

/// Records the dimensions of every image it is given
struct InspectingEngine {
    id: &'static str,
    text: &'static str,
    seen_widths: Arc<Mutex<Vec<u32>>>,
}

#[async_trait]
impl OcrEngine for InspectingEngine {
    async fn extract_text(&self, image_bytes: &[u8]) -> EngineResult {
        match decode_image_bytes(image_bytes) {
            Ok((image, _)) => {
                self.seen_widths.lock().unwrap().push(image.width());
                EngineResult::from_lines(self.id, self.id, vec![RecognizedLine::new(self.text, 0.9)], 1)
            }
            Err(e) => EngineResult::failure(self.id, self.id, e.to_string(), 1),
        }
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    fn engine_id(&self) -> &str {
        self.id
    }

    fn display_name(&self) -> &str {
        self.id
    }
}

fn small_png() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(500, 300, Rgb([200, 200, 200])));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

const LICENSE_REPLY: &str = "```json\n{\"merchantName\": \"테스트상사\", \"businessNumber\": \"123-45-67890\", \"corporateNumber\": \"110111-1234567\"}\n```";

const ID_CARD_REPLY: &str = "{\"documentType\": \"주민등록증\", \"name\": \"홍길동\", \"rrn\": \"900101-1234567\", \"issuer\": \"서울특별시 종로구청장\"}";

/// Fake chat-completions endpoint answering every request with `reply`
async fn spawn_chat_endpoint(requests: Arc<Mutex<Vec<Value>>>, reply: &'static str) -> String {
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |Json(body): Json<Value>| {
            let requests = Arc::clone(&requests);
            async move {
                requests.lock().unwrap().push(body);
                Json(json!({
                    "choices": [{"message": {"content": reply}}],
                    "usage": {"prompt_tokens": 300, "completion_tokens": 40, "total_tokens": 340}
                }))
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn engines(seen_widths: &Arc<Mutex<Vec<u32>>>) -> Vec<Arc<dyn OcrEngine>> {
    vec![
        Arc::new(InspectingEngine {
            id: "paddleocr",
            text: "법인명 테스트상사",
            seen_widths: Arc::clone(seen_widths),
        }),
        Arc::new(InspectingEngine {
            id: "easyocr",
            text: "beobinmyeong",
            seen_widths: Arc::clone(seen_widths),
        }),
    ]
}

#[tokio::test]
async fn test_process_with_chat_cross_validation() {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let endpoint = spawn_chat_endpoint(Arc::clone(&requests), LICENSE_REPLY).await;

    let mut config = OcrConfig::default();
    config.cross_validation = Some(CrossValidationConfig {
        endpoint,
        model: "gemma2:2b".to_string(),
        timeout_secs: 10,
    });
    let processor = assert_ok!(ChatTextProcessor::new(
        config.cross_validation.as_ref().unwrap()
    ));

    let seen_widths = Arc::new(Mutex::new(Vec::new()));
    let service = DocumentOcrService::from_config(
        engines(&seen_widths),
        &config,
        Some(Arc::new(processor) as Arc<dyn TextProcessor>),
    );

    let outcome = service
        .process(OcrRequest::new(small_png(), BusinessType::Corporate))
        .await;

    // every engine saw the upscaled image
    assert_eq!(*seen_widths.lock().unwrap(), vec![1000, 1000]);

    assert_eq!(outcome.selected.engine_id(), "paddleocr");
    assert!(!outcome.low_quality);
    let parsed = outcome.parsed.expect("cross-validation should succeed");
    assert_eq!(parsed.merchant_name, "테스트상사");
    assert_eq!(parsed.corporate_number, "110111-1234567");
    assert!(outcome.parse_error.is_none());

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request["model"], "gemma2:2b");
    let content = &request["messages"][0]["content"];
    let prompt = content[0]["text"].as_str().unwrap();
    assert!(prompt.contains("[paddleocr]\n법인명 테스트상사\n\n[easyocr]\nbeobinmyeong\n"));
    assert!(prompt.contains("corporateNumber"));
    assert!(content[1]["image_url"]["url"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_unreachable_cross_validation_is_recorded() {
    let config = CrossValidationConfig {
        endpoint: "http://127.0.0.1:9".to_string(),
        model: "gemma2:2b".to_string(),
        timeout_secs: 2,
    };
    let processor: Arc<dyn TextProcessor> = Arc::new(ChatTextProcessor::new(&config).unwrap());
    assert_err!(
        processor
            .correct_and_parse("text", DocumentType::BusinessLicense, BusinessType::Individual, None)
            .await
    );

    let seen_widths = Arc::new(Mutex::new(Vec::new()));
    let service =
        DocumentOcrService::from_config(engines(&seen_widths), &OcrConfig::default(), Some(processor));
    let outcome = service
        .process(OcrRequest::new(small_png(), BusinessType::Individual))
        .await;

    assert!(outcome.selected.is_success());
    assert!(outcome.parsed.is_none());
    assert!(outcome.parse_error.is_some());
}

#[tokio::test]
async fn test_id_card_cross_validation_masks_rrn() {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let endpoint = spawn_chat_endpoint(Arc::clone(&requests), ID_CARD_REPLY).await;
    let processor = assert_ok!(ChatTextProcessor::new(&CrossValidationConfig {
        endpoint,
        model: "gemma2:2b".to_string(),
        timeout_secs: 10,
    }));

    let parsed = assert_ok!(
        processor
            .correct_and_parse(
                "[paddleocr]\n주민등록증\n홍길동\n900101-1234567\n",
                DocumentType::IdCard,
                BusinessType::Unknown,
                None,
            )
            .await
    );
    assert_eq!(parsed.name, "홍길동");
    assert_eq!(parsed.rrn, "900101-*******");
    assert_eq!(parsed.issuer, "서울특별시 종로구청장");
    assert!(parsed.merchant_name.is_empty());

    let requests = requests.lock().unwrap();
    let prompt = requests[0]["messages"][0]["content"].as_str().unwrap();
    assert!(prompt.contains("주민등록증 OCR"));
    assert!(prompt.contains("900101-1234567"));
    assert!(!prompt.contains("merchantName"));
}
