// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Best-path CTC decoding over synthetic probability matrices

use kordoc_ocr_node::vision::ocr::recognition::ctc_decode;
use ndarray::Array2;

/// One row per timestep, `confidence` on the forced class
fn forced(sequence: &[usize], classes: usize, confidence: f32) -> Array2<f32> {
    let rest = (1.0 - confidence) / (classes - 1) as f32;
    let mut probs = Array2::from_elem((sequence.len(), classes), rest);
    for (t, &class) in sequence.iter().enumerate() {
        probs[[t, class]] = confidence;
    }
    probs
}

fn vocab(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_repeats_collapse_and_blanks_drop() {
    let vocabulary = vocab(&["a", "b", "c"]);
    let probs = forced(&[0, 1, 1, 0, 2, 2, 2, 0, 0, 3], 4, 0.9);
    assert_eq!(ctc_decode(probs.view(), &vocabulary).text, "abc");
}

#[test]
fn test_blank_separates_repeated_characters() {
    let vocabulary = vocab(&["1", "2"]);
    let probs = forced(&[1, 0, 1, 1, 0, 2], 3, 0.8);
    assert_eq!(ctc_decode(probs.view(), &vocabulary).text, "112");
}

#[test]
fn test_jamo_output_is_composed() {
    let vocabulary = vocab(&["ㄱ", "ㅏ", "ㅁ", " "]);
    let probs = forced(&[1, 1, 0, 2, 3, 3, 4, 1, 2], 5, 0.95);
    assert_eq!(ctc_decode(probs.view(), &vocabulary).text, "감 가");
}

#[test]
fn test_decode_depends_only_on_argmax() {
    let vocabulary = vocab(&["x", "y"]);
    let sequence = [1, 0, 2, 2];
    let confident = ctc_decode(forced(&sequence, 3, 0.99).view(), &vocabulary);
    let hesitant = ctc_decode(forced(&sequence, 3, 0.5).view(), &vocabulary);

    assert_eq!(confident.text, hesitant.text);
    assert!(confident.confidence > hesitant.confidence);
    assert!((confident.confidence - 0.99).abs() < 1e-5);
    assert_eq!(confident.char_confidences.len(), 2);
}

#[test]
fn test_all_blank_is_empty() {
    let vocabulary = vocab(&["a"]);
    let result = ctc_decode(forced(&[0, 0, 0], 2, 0.9).view(), &vocabulary);
    assert!(result.is_empty());
    assert_eq!(result.confidence, 0.0);
}

#[test]
fn test_classes_beyond_vocabulary_ignored() {
    let vocabulary = vocab(&["a"]);
    let result = ctc_decode(forced(&[1, 0, 3, 1], 4, 0.9).view(), &vocabulary);
    assert_eq!(result.text, "aa");
}
