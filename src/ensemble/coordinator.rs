// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Parallel fan-out over every OCR engine with a shared deadline

use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use super::result::EnsembleResult;
use crate::config::OcrConfig;
use crate::engines::{EngineResult, OcrEngine};

/// Runs all engines on one image and reconciles their results
pub struct EnsembleCoordinator {
    engines: Vec<Arc<dyn OcrEngine>>,
    primary_engine: String,
    ensemble_enabled: bool,
    timeout: Duration,
}

impl EnsembleCoordinator {
    /// `engines` must already be in priority order
    pub fn new(
        engines: Vec<Arc<dyn OcrEngine>>,
        primary_engine: impl Into<String>,
        ensemble_enabled: bool,
        timeout: Duration,
    ) -> Self {
        let primary_engine = primary_engine.into();
        info!(
            "Ensemble coordinator initialized (enabled: {}, timeout: {}s, engines: {}, primary: {})",
            ensemble_enabled,
            timeout.as_secs(),
            engines.len(),
            primary_engine
        );
        Self {
            engines,
            primary_engine,
            ensemble_enabled,
            timeout,
        }
    }

    pub fn from_config(engines: Vec<Arc<dyn OcrEngine>>, config: &OcrConfig) -> Self {
        Self::new(
            engines,
            config.primary_engine.clone(),
            config.ensemble_enabled,
            Duration::from_secs(config.ensemble_timeout_secs),
        )
    }

    pub fn engines(&self) -> &[Arc<dyn OcrEngine>] {
        &self.engines
    }

    pub fn ensemble_enabled(&self) -> bool {
        self.ensemble_enabled
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn primary_engine(&self) -> Option<&Arc<dyn OcrEngine>> {
        self.engines
            .iter()
            .find(|e| e.engine_id() == self.primary_engine)
    }

    /// Run every engine concurrently and collect one result per engine
    ///
    /// Engines still running at the deadline are recorded as "Timeout" and
    /// left to finish in the background; their output is discarded.
    pub async fn extract_parallel(&self, image_bytes: &[u8], timeout: Duration) -> EnsembleResult {
        info!(
            "=== Ensemble OCR start ({} engines in parallel) ===",
            self.engines.len()
        );
        let start = Instant::now();
        let deadline = start + timeout;
        let image: Arc<[u8]> = Arc::from(image_bytes);

        let handles: Vec<_> = self
            .engines
            .iter()
            .map(|engine| {
                let engine = Arc::clone(engine);
                let image = Arc::clone(&image);
                tokio::spawn(async move {
                    info!("[{}] start...", engine.display_name());
                    engine.extract_text(&image).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (engine, mut handle) in self.engines.iter().zip(handles) {
            let result = match timeout_at(deadline, &mut handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) => {
                    error!("[{}] task failed: {}", engine.display_name(), join_error);
                    EngineResult::failure(
                        engine.engine_id(),
                        engine.display_name(),
                        format!("Engine task failed: {}", join_error),
                        start.elapsed().as_millis() as u64,
                    )
                }
                Err(_) => {
                    warn!("[{}] timed out after {}s", engine.display_name(), timeout.as_secs());
                    // dropping the handle detaches the task
                    EngineResult::timeout(
                        engine.engine_id(),
                        engine.display_name(),
                        start.elapsed().as_millis() as u64,
                    )
                }
            };
            results.push(result);
        }

        let elapsed = start.elapsed().as_millis() as u64;
        let ensemble = EnsembleResult::new(results, elapsed);

        info!("=== Ensemble OCR done ({}ms) ===", elapsed);
        info!("  success: {}/{}", ensemble.success_count(), self.engines.len());
        for result in ensemble.results() {
            info!(
                "  {}: {}",
                result.engine_name(),
                if result.is_success() { "✓" } else { "✗" }
            );
        }
        info!("  {}", ensemble.quality_report());

        ensemble
    }

    /// Single-result API
    ///
    /// With the ensemble enabled, returns the best Korean result, else the
    /// most confident one, else the primary engine's (failed) result. With
    /// the ensemble disabled only the primary engine runs.
    pub async fn extract_text(&self, image_bytes: &[u8]) -> EngineResult {
        if !self.ensemble_enabled {
            return self.extract_primary(image_bytes).await;
        }

        let ensemble = self.extract_parallel(image_bytes, self.timeout).await;
        self.select(&ensemble)
    }

    /// Pick the single result reported for an ensemble run
    pub fn select(&self, ensemble: &EnsembleResult) -> EngineResult {
        ensemble
            .best_korean_result()
            .or_else(|| ensemble.best_result())
            .or_else(|| ensemble.result_for(&self.primary_engine))
            .or_else(|| ensemble.results().first())
            .cloned()
            .unwrap_or_else(|| self.missing_primary())
    }

    /// Run the primary engine alone, bounded only by its own timeout
    pub async fn extract_primary(&self, image_bytes: &[u8]) -> EngineResult {
        match self.primary_engine() {
            Some(engine) => engine.extract_text(image_bytes).await,
            None => self.missing_primary(),
        }
    }

    fn missing_primary(&self) -> EngineResult {
        EngineResult::failure(
            &self.primary_engine,
            &self.primary_engine,
            format!("Primary engine '{}' is not configured", self.primary_engine),
            0,
        )
    }

    /// Check every engine concurrently; a failed or panicking check is `false`
    pub async fn check_health(&self) -> BTreeMap<String, bool> {
        let checks = self.engines.iter().map(|engine| {
            let engine = Arc::clone(engine);
            let id = engine.engine_id().to_string();
            let handle = tokio::spawn(async move { engine.is_healthy().await });
            async move {
                let healthy = match handle.await {
                    Ok(healthy) => healthy,
                    Err(e) => {
                        warn!("Health check for {} failed: {}", id, e);
                        false
                    }
                };
                (id, healthy)
            }
        });

        join_all(checks).await.into_iter().collect()
    }
}
