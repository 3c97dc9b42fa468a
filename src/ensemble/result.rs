// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ensemble result, selection and quality scoring

use serde::Serialize;

use crate::engines::{EngineResult, UNKNOWN_ERROR_MESSAGE};
use crate::vision::ocr::hangul::is_hangul_syllable;

/// Scores below this are flagged as low quality
pub const LOW_QUALITY_THRESHOLD: f64 = 0.3;

/// Average text length that earns the full length score
const TARGET_TEXT_LENGTH: f64 = 100.0;

/// Share of Hangul syllables among non-whitespace characters
pub fn korean_ratio(text: &str) -> f64 {
    if text.trim().is_empty() {
        return 0.0;
    }

    let (korean, total) = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .fold((0usize, 0usize), |(korean, total), c| {
            (korean + is_hangul_syllable(c) as usize, total + 1)
        });

    if total == 0 {
        0.0
    } else {
        korean as f64 / total as f64
    }
}

/// One result per configured engine, in engine (priority) order
///
/// The success count and quality score are derived from `results` once, in
/// [`EnsembleResult::new`]; there is no other way to build one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleResult {
    results: Vec<EngineResult>,
    success_count: usize,
    quality_score: f64,
    elapsed_ms: u64,
}

impl EnsembleResult {
    pub fn new(results: Vec<EngineResult>, elapsed_ms: u64) -> Self {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        let quality_score = compute_quality_score(&results, success_count);
        Self {
            results,
            success_count,
            quality_score,
            elapsed_ms,
        }
    }

    pub fn results(&self) -> &[EngineResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<EngineResult> {
        self.results
    }

    pub fn result_for(&self, engine_id: &str) -> Option<&EngineResult> {
        self.results.iter().find(|r| r.engine_id() == engine_id)
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn all_success(&self) -> bool {
        !self.results.is_empty() && self.success_count == self.results.len()
    }

    pub fn successful_results(&self) -> impl Iterator<Item = &EngineResult> {
        self.results.iter().filter(|r| r.is_success())
    }

    /// Highest-confidence success; ties go to the earlier engine
    pub fn best_result(&self) -> Option<&EngineResult> {
        max_by_strict(self.successful_results(), |r| r.confidence() as f64)
    }

    /// Success with the highest Hangul ratio; ties go to the earlier engine
    pub fn best_korean_result(&self) -> Option<&EngineResult> {
        max_by_strict(self.successful_results(), |r| korean_ratio(r.full_text()))
    }

    /// `0.4 * success rate + 0.3 * length score + 0.3 * mean Korean ratio`
    pub fn quality_score(&self) -> f64 {
        self.quality_score
    }

    pub fn is_low_quality(&self) -> bool {
        self.quality_score < LOW_QUALITY_THRESHOLD
    }

    pub fn average_text_length(&self) -> f64 {
        average(self.successful_results().map(|r| r.full_text().chars().count() as f64))
    }

    pub fn average_korean_ratio(&self) -> f64 {
        average(self.successful_results().map(|r| korean_ratio(r.full_text())))
    }

    /// One-line summary for logs
    pub fn quality_report(&self) -> String {
        format!(
            "quality: {:.1}%, engines: {}/{}, avg length: {} chars, korean ratio: {:.1}%",
            self.quality_score * 100.0,
            self.success_count,
            self.results.len(),
            self.average_text_length() as u64,
            self.average_korean_ratio() * 100.0
        )
    }

    /// Combined text handed to the cross-validation stage
    ///
    /// Each engine contributes `[Name]\n<text or (실패: error)>\n`; sections
    /// are separated by a blank line.
    pub fn to_prompt_format(&self) -> String {
        self.results
            .iter()
            .map(|r| {
                let body = if r.is_success() {
                    r.full_text().to_string()
                } else {
                    format!("(실패: {})", r.error_message().unwrap_or(UNKNOWN_ERROR_MESSAGE))
                };
                format!("[{}]\n{}\n", r.engine_name(), body)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn max_by_strict<'a, I, F>(items: I, key: F) -> Option<&'a EngineResult>
where
    I: Iterator<Item = &'a EngineResult>,
    F: Fn(&EngineResult) -> f64,
{
    let mut best: Option<(&EngineResult, f64)> = None;
    for item in items {
        let value = key(item);
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((item, value)),
        }
    }
    best.map(|(item, _)| item)
}

fn average<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn compute_quality_score(results: &[EngineResult], success_count: usize) -> f64 {
    if results.is_empty() {
        return 0.0;
    }

    let successes = || results.iter().filter(|r| r.is_success());
    let success_rate = success_count as f64 / results.len() as f64;
    let avg_length = average(successes().map(|r| r.full_text().chars().count() as f64));
    let length_score = (avg_length / TARGET_TEXT_LENGTH).min(1.0);
    let avg_korean = average(successes().map(|r| korean_ratio(r.full_text())));

    success_rate * 0.4 + length_score * 0.3 + avg_korean * 0.3
}
