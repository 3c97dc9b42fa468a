// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Local pipeline plumbing: model discovery, crops, per-region recognition

use image::{DynamicImage, Rgb, RgbImage};
use kordoc_ocr_node::config::LocalOcrConfig;
use kordoc_ocr_node::vision::ocr::detection::TextRegion;
use kordoc_ocr_node::vision::ocr::model::{crop_region, recognize_regions, resolve_model_dir};
use kordoc_ocr_node::vision::ocr::preprocessing::preprocess_for_detection;
use kordoc_ocr_node::vision::ocr::{OcrError, PaddleOcrModel, RecognizedText};
use std::fs;

fn page(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
}

fn region(x1: u32, y1: u32, x2: u32, y2: u32) -> TextRegion {
    TextRegion { x1, y1, x2, y2 }
}

#[test]
fn test_resolve_model_dir_picks_first_complete_dir() {
    let incomplete = tempfile::tempdir().unwrap();
    let complete = tempfile::tempdir().unwrap();
    let config = LocalOcrConfig::default();

    fs::write(incomplete.path().join(&config.detection_model), b"onnx").unwrap();
    for file in [
        &config.detection_model,
        &config.recognition_model,
        &config.vocabulary_file,
    ] {
        fs::write(complete.path().join(file), b"x").unwrap();
    }

    let config = LocalOcrConfig {
        model_dirs: vec![incomplete.path().to_path_buf(), complete.path().to_path_buf()],
        ..LocalOcrConfig::default()
    };
    assert_eq!(resolve_model_dir(&config).unwrap(), complete.path());
}

#[tokio::test]
async fn test_load_without_models_is_configuration_error() {
    let config = LocalOcrConfig {
        model_dirs: vec!["/nonexistent/paddleocr".into()],
        ..LocalOcrConfig::default()
    };
    match PaddleOcrModel::load(&config).await {
        Err(OcrError::Configuration(message)) => assert!(message.contains("No model directory")),
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("models should not load"),
    }
}

#[test]
fn test_crop_region_clamps_to_image() {
    let image = page(100, 50);
    let crop = crop_region(&image, &region(80, 40, 130, 70)).unwrap();
    assert_eq!((crop.width(), crop.height()), (20, 10));
    assert!(crop_region(&image, &region(100, 0, 120, 10)).is_none());
}

#[test]
fn test_recognize_regions_skips_blank_and_failed() {
    let image = page(200, 100);
    let regions = [
        region(0, 0, 50, 20),
        region(0, 30, 50, 50),
        region(0, 60, 50, 80),
        region(60, 0, 160, 30),
    ];

    let mut calls = 0;
    let lines = recognize_regions(&image, &regions, |crop| {
        calls += 1;
        match calls {
            1 => Ok(RecognizedText::new("상호".to_string(), 0.9)),
            2 => Ok(RecognizedText::new(String::new(), 0.0)),
            3 => Err(OcrError::Inference("bad output".to_string())),
            _ => {
                assert_eq!(crop.width(), 100);
                Ok(RecognizedText::new("테스트".to_string(), 0.7))
            }
        }
    });

    assert_eq!(calls, 4);
    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["상호", "테스트"]);
    assert_eq!(lines[1].bounding_box.x, 60);
    assert_eq!(lines[1].bounding_box.width, 100);
}

#[test]
fn test_detection_tensor_shape() {
    let (tensor, resized) = preprocess_for_detection(&page(1200, 800));
    assert_eq!(resized, (960, 640));
    assert_eq!(tensor.shape(), &[1, 3, 640, 960]);
}

#[tokio::test]
#[ignore] // Requires model files under ./models/paddleocr
async fn test_blank_page_has_no_text() {
    let model = PaddleOcrModel::load(&LocalOcrConfig::default()).await.unwrap();
    let output = model.process(&page(800, 600)).unwrap();
    assert!(output.lines.is_empty());
    assert!(output.full_text.is_empty());
}
