// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tensor preparation for the detection and recognition models

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

/// Longest side limit for the detection input
pub const DET_MAX_SIDE: u32 = 960;

/// Detection input dimensions are rounded up to a multiple of this
pub const DET_SIZE_MULTIPLE: u32 = 32;

/// Recognition model input height
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Maximum width for recognition model input
pub const REC_MAX_WIDTH: u32 = 320;

/// Minimum width for recognition model input
pub const REC_MIN_WIDTH: u32 = 10;

/// Mean values for normalization (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for normalization (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Detection input dimensions for a `width` x `height` image
///
/// Scales by `min(960 / w, 960 / h)` (truncating) and rounds each side up
/// to a multiple of 32, never below 32.
pub fn detection_input_size(width: u32, height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (DET_SIZE_MULTIPLE, DET_SIZE_MULTIPLE);
    }

    let scale = (DET_MAX_SIDE as f32 / width as f32).min(DET_MAX_SIDE as f32 / height as f32);
    let round_up = |side: f32| {
        let side = side as u32;
        (side.div_ceil(DET_SIZE_MULTIPLE) * DET_SIZE_MULTIPLE).max(DET_SIZE_MULTIPLE)
    };

    (round_up(width as f32 * scale), round_up(height as f32 * scale))
}

/// Preprocess an image for text detection
///
/// Returns the NCHW tensor `[1, 3, H, W]` normalized with ImageNet mean/std
/// and the resized `(W, H)` needed to map boxes back.
pub fn preprocess_for_detection(image: &DynamicImage) -> (Array4<f32>, (u32, u32)) {
    let (width, height) = detection_input_size(image.width(), image.height());
    let rgb = image
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    (tensor, (width, height))
}

/// Recognition input width for a crop of `width` x `height`
///
/// Height is fixed at 48; width keeps the aspect ratio (truncated), capped at
/// 320 and floored at 10.
pub fn recognition_input_width(width: u32, height: u32) -> u32 {
    if height == 0 {
        return REC_MIN_WIDTH;
    }
    let scaled = (width as f32 * REC_INPUT_HEIGHT as f32 / height as f32) as u32;
    scaled.clamp(REC_MIN_WIDTH, REC_MAX_WIDTH)
}

/// Preprocess a cropped text region for recognition
///
/// Output is `[1, 3, 48, W]` with every channel mapped to `[-1, 1]` by
/// `(p / 255 - 0.5) / 0.5`.
pub fn preprocess_for_recognition(image: &DynamicImage) -> Array4<f32> {
    let (orig_w, orig_h) = image.dimensions();
    let width = recognition_input_width(orig_w, orig_h);
    let rgb = image
        .resize_exact(width, REC_INPUT_HEIGHT, FilterType::Triangle)
        .to_rgb8();

    let mut tensor = Array4::zeros((1, 3, REC_INPUT_HEIGHT as usize, width as usize));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 / 255.0 - 0.5) / 0.5;
        }
    }

    tensor
}
