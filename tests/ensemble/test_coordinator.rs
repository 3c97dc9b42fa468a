// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Coordinator fan-out, deadline and selection behaviour

use async_trait::async_trait;
use kordoc_ocr_node::engines::{EngineResult, OcrEngine, RecognizedLine};
use kordoc_ocr_node::ensemble::EnsembleCoordinator;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct DelayedEngine {
    id: &'static str,
    name: &'static str,
    text: &'static str,
    confidence: f32,
    delay: Duration,
    finished: Arc<AtomicUsize>,
}

#[async_trait]
impl OcrEngine for DelayedEngine {
    async fn extract_text(&self, _image_bytes: &[u8]) -> EngineResult {
        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        EngineResult::from_lines(
            self.id,
            self.name,
            vec![RecognizedLine::new(self.text, self.confidence)],
            self.delay.as_millis() as u64,
        )
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    fn engine_id(&self) -> &str {
        self.id
    }

    fn display_name(&self) -> &str {
        self.name
    }
}

fn engines(finished: &Arc<AtomicUsize>) -> Vec<Arc<dyn OcrEngine>> {
    let setups = [
        ("paddleocr", "PaddleOCR", "상호: 테스트상사", 0.92, 1),
        ("pororo", "Pororo", "상호 테스트상사", 0.88, 5),
        ("easyocr", "EasyOCR", "sangho", 0.97, 20),
    ];
    setups.iter()
        .map(|&(id, name, text, confidence, secs)| {
            Arc::new(DelayedEngine {
                id,
                name,
                text,
                confidence,
                delay: Duration::from_secs(secs),
                finished: Arc::clone(finished),
            }) as Arc<dyn OcrEngine>
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_three_engines_with_three_second_deadline() {
    let finished = Arc::new(AtomicUsize::new(0));
    let coordinator =
        EnsembleCoordinator::new(engines(&finished), "paddleocr", true, Duration::from_secs(3));

    let start = Instant::now();
    let ensemble = coordinator
        .extract_parallel(b"image", Duration::from_secs(3))
        .await;
    assert!(start.elapsed() < Duration::from_secs(4));

    let results = ensemble.results();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_success());
    assert_eq!(results[0].full_text(), "상호: 테스트상사");
    assert_eq!(results[1].error_message(), Some("Timeout"));
    assert_eq!(results[2].error_message(), Some("Timeout"));
    assert_eq!(ensemble.success_count(), 1);
    assert_eq!(
        ensemble.to_prompt_format(),
        "[PaddleOCR]\n상호: 테스트상사\n\n[Pororo]\n(실패: Timeout)\n\n[EasyOCR]\n(실패: Timeout)\n"
    );
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_engines_keep_running_detached() {
    let finished = Arc::new(AtomicUsize::new(0));
    let coordinator =
        EnsembleCoordinator::new(engines(&finished), "paddleocr", true, Duration::from_secs(3));

    coordinator
        .extract_parallel(b"image", Duration::from_secs(3))
        .await;
    assert_eq!(finished.load(Ordering::SeqCst), 1);

    // late completions happen but are not collected
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_generous_deadline_prefers_korean_over_confidence() {
    let finished = Arc::new(AtomicUsize::new(0));
    let coordinator =
        EnsembleCoordinator::new(engines(&finished), "paddleocr", true, Duration::from_secs(30));

    // the colon lowers PaddleOCR's Hangul ratio below Pororo's
    let selected = coordinator.extract_text(b"image").await;
    assert_eq!(selected.engine_id(), "pororo");

    let ensemble = coordinator
        .extract_parallel(b"image", Duration::from_secs(30))
        .await;
    assert!(ensemble.all_success());
    assert_eq!(ensemble.best_result().unwrap().engine_id(), "easyocr");
}

#[tokio::test(start_paused = true)]
async fn test_quality_improves_with_more_successes() {
    let finished = Arc::new(AtomicUsize::new(0));
    let coordinator =
        EnsembleCoordinator::new(engines(&finished), "paddleocr", true, Duration::from_secs(30));

    let short = coordinator
        .extract_parallel(b"image", Duration::from_secs(2))
        .await;
    let medium = coordinator
        .extract_parallel(b"image", Duration::from_secs(6))
        .await;

    assert_eq!(short.success_count(), 1);
    assert_eq!(medium.success_count(), 2);
    assert!(short.quality_score() <= medium.quality_score());
    assert!((0.0..=1.0).contains(&medium.quality_score()));
}
