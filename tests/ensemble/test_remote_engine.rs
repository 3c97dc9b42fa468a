// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Remote engines against fake OCR sidecars served by axum

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use kordoc_ocr_node::config::RemoteEngineConfig;
use kordoc_ocr_node::engines::{OcrEngine, RemoteOcrEngine};
use kordoc_ocr_node::ensemble::EnsembleCoordinator;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone)]
struct Sidecar {
    ocr_status: StatusCode,
    ocr_body: Value,
    delay: Duration,
    health_status: StatusCode,
    health_body: Value,
}

impl Sidecar {
    fn ok(body: Value) -> Self {
        Self {
            ocr_status: StatusCode::OK,
            ocr_body: body,
            delay: Duration::ZERO,
            health_status: StatusCode::OK,
            health_body: json!({"status": "healthy"}),
        }
    }
}

async fn ocr(State(sidecar): State<Arc<Sidecar>>, mut multipart: Multipart) -> (StatusCode, Json<Value>) {
    let mut received = false;
    while let Ok(Some(field)) = multipart.next_field().await {
        let well_formed = field.name() == Some("image_file")
            && field.file_name() == Some("image.png")
            && field.content_type() == Some("image/png");
        if well_formed {
            received = field.bytes().await.map(|b| !b.is_empty()).unwrap_or(false);
        }
    }
    if !received {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "error": "missing image_file"})),
        );
    }

    tokio::time::sleep(sidecar.delay).await;
    (sidecar.ocr_status, Json(sidecar.ocr_body.clone()))
}

async fn health(State(sidecar): State<Arc<Sidecar>>) -> (StatusCode, Json<Value>) {
    (sidecar.health_status, Json(sidecar.health_body.clone()))
}

/// Serve a sidecar on an ephemeral port and return its base URL
async fn spawn_sidecar(sidecar: Sidecar) -> String {
    let app = Router::new()
        .route("/ocr", post(ocr))
        .route("/health", get(health))
        .with_state(Arc::new(sidecar));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn engine(id: &str, name: &str, endpoint: &str, priority: u8) -> Arc<dyn OcrEngine> {
    Arc::new(RemoteOcrEngine::new(RemoteEngineConfig::new(id, name, endpoint, priority)).unwrap())
}

#[tokio::test]
async fn test_current_response_format() {
    let url = spawn_sidecar(Sidecar::ok(json!({
        "success": true,
        "text": "사업자등록증\n상호: 테스트상사",
        "lines": [
            {"text": "사업자등록증", "confidence": 0.96},
            {"text": "상호: 테스트상사", "confidence": 0.84}
        ],
        "line_count": 2,
        "korean_ratio": 0.9
    })))
    .await;

    let result = engine("paddleocr", "PaddleOCR", &url, 10).extract_text(b"png-bytes").await;
    assert!(result.is_success(), "{:?}", result.error_message());
    assert_eq!(result.engine_id(), "paddleocr");
    assert_eq!(result.full_text(), "사업자등록증\n상호: 테스트상사");
    assert_eq!(result.lines().len(), 2);
    assert!((result.confidence() - 0.9).abs() < 1e-5);
}

#[tokio::test]
async fn test_legacy_response_format() {
    let url = spawn_sidecar(Sidecar::ok(json!({
        "code": "100",
        "msg": "success",
        "data": [
            {"text": "대표자", "score": 0.9, "text_region": [[0, 0], [40, 0], [40, 12], [0, 12]]},
            {"text": "홍길동", "score": 0.7, "text_region": [[50, 0], [90, 0], [90, 12], [50, 12]]}
        ]
    })))
    .await;

    let result = engine("paddleocr", "PaddleOCR", &url, 10).extract_text(b"png-bytes").await;
    assert!(result.is_success());
    assert_eq!(result.full_text(), "대표자\n홍길동");
    let bbox = result.lines()[1].bounding_box.unwrap();
    assert_eq!((bbox.x, bbox.width, bbox.height), (50, 40, 12));
}

#[tokio::test]
async fn test_service_reported_error() {
    let url = spawn_sidecar(Sidecar::ok(json!({"success": false, "error": "no text detected"}))).await;

    let result = engine("easyocr", "EasyOCR", &url, 30).extract_text(b"png-bytes").await;
    assert!(!result.is_success());
    assert!(result.lines().is_empty());
    assert!(result.full_text().is_empty());
    assert!(result.error_message().unwrap().contains("no text detected"));
}

#[tokio::test]
async fn test_http_status_error() {
    let mut sidecar = Sidecar::ok(json!({"detail": "model crashed"}));
    sidecar.ocr_status = StatusCode::INTERNAL_SERVER_ERROR;
    let url = spawn_sidecar(sidecar).await;

    let result = engine("pororo", "Pororo", &url, 20).extract_text(b"png-bytes").await;
    assert!(!result.is_success());
    let message = result.error_message().unwrap();
    assert!(message.contains("500"));
    assert!(message.contains("model crashed"));
}

#[tokio::test]
async fn test_health_checks() {
    let healthy = spawn_sidecar(Sidecar::ok(json!({}))).await;

    let mut degraded = Sidecar::ok(json!({}));
    degraded.health_body = json!({"status": "loading"});
    let degraded = spawn_sidecar(degraded).await;

    let mut down = Sidecar::ok(json!({}));
    down.health_status = StatusCode::SERVICE_UNAVAILABLE;
    let down = spawn_sidecar(down).await;

    assert!(engine("a", "A", &healthy, 1).is_healthy().await);
    assert!(!engine("b", "B", &degraded, 1).is_healthy().await);
    assert!(!engine("c", "C", &down, 1).is_healthy().await);
}

#[tokio::test]
async fn test_ensemble_over_sidecars_with_slow_engine() {
    let paddle = spawn_sidecar(Sidecar::ok(json!({
        "success": true,
        "lines": [{"text": "Sangho Test", "confidence": 0.99}]
    })))
    .await;

    let mut slow = Sidecar::ok(json!({"success": true, "text": "늦은 결과"}));
    slow.delay = Duration::from_secs(5);
    let pororo = spawn_sidecar(slow).await;

    let easy = spawn_sidecar(Sidecar::ok(json!({
        "success": true,
        "lines": [{"text": "상호 테스트", "confidence": 0.6}]
    })))
    .await;

    let coordinator = EnsembleCoordinator::new(
        vec![
            engine("paddleocr", "PaddleOCR", &paddle, 10),
            engine("pororo", "Pororo", &pororo, 20),
            engine("easyocr", "EasyOCR", &easy, 30),
        ],
        "paddleocr",
        true,
        Duration::from_secs(1),
    );

    let ensemble = coordinator
        .extract_parallel(b"png-bytes", Duration::from_secs(1))
        .await;
    assert_eq!(ensemble.success_count(), 2);
    assert!(ensemble.results()[1].is_timeout());
    assert_eq!(ensemble.best_result().unwrap().engine_id(), "paddleocr");
    assert_eq!(ensemble.best_korean_result().unwrap().engine_id(), "easyocr");
    assert_eq!(
        ensemble.to_prompt_format(),
        "[PaddleOCR]\nSangho Test\n\n[Pororo]\n(실패: Timeout)\n\n[EasyOCR]\n상호 테스트\n"
    );

    let health = coordinator.check_health().await;
    assert!(health.values().all(|healthy| *healthy));
}
