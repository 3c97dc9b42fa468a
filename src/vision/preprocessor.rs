// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document photo normalization applied before any OCR engine sees the image
//!
//! - Grayscale conversion removes colour noise from phone photos
//! - Linear contrast stretch separates ink from paper
//! - Minimum-width upscaling keeps small captures legible for the detectors
//!
//! Every entry point is defensive: if the bytes cannot be decoded or
//! re-encoded, the input is handed back untouched.

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::{debug, error, info};

use super::image_utils::{decode_image_bytes, encode_png};
use crate::config::PreprocessingConfig;

/// Default contrast multiplier
pub const DEFAULT_CONTRAST_FACTOR: f32 = 1.3;

/// Default minimum width in pixels
pub const DEFAULT_MIN_WIDTH: u32 = 1000;

/// Grayscale + contrast enhancement on encoded bytes
///
/// Returns PNG bytes, or `image_bytes` unchanged when decoding fails.
pub fn preprocess(image_bytes: &[u8], grayscale: bool, contrast_factor: f32) -> Vec<u8> {
    let image = match decode_image_bytes(image_bytes) {
        Ok((image, info)) => {
            debug!("Preprocessing {}x{} image", info.width, info.height);
            image
        }
        Err(e) => {
            error!("Image preprocessing failed: {}, returning original", e);
            return image_bytes.to_vec();
        }
    };

    let enhanced = enhance(&image, grayscale, contrast_factor);
    match encode_png(&enhanced) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Image preprocessing failed: {}, returning original", e);
            image_bytes.to_vec()
        }
    }
}

/// Upsample images narrower than `min_width`, preserving aspect ratio
///
/// Returns `image_bytes` unchanged when the image is already wide enough or
/// cannot be decoded.
pub fn ensure_minimum_size(image_bytes: &[u8], min_width: u32) -> Vec<u8> {
    let image = match decode_image_bytes(image_bytes) {
        Ok((image, _)) => image,
        Err(e) => {
            error!("Image resize failed: {}", e);
            return image_bytes.to_vec();
        }
    };

    let Some(scaled) = upscale_to_min_width(&image, min_width) else {
        return image_bytes.to_vec();
    };

    match encode_png(&scaled) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Image resize failed: {}", e);
            image_bytes.to_vec()
        }
    }
}

/// In-memory grayscale + contrast
pub fn enhance(image: &DynamicImage, grayscale: bool, contrast_factor: f32) -> DynamicImage {
    let base = if grayscale {
        DynamicImage::ImageLuma8(image.to_luma8())
    } else {
        image.clone()
    };
    apply_contrast(base, contrast_factor)
}

/// In-memory bilinear upscale; `None` when the image is already wide enough
pub fn upscale_to_min_width(image: &DynamicImage, min_width: u32) -> Option<DynamicImage> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || width >= min_width {
        return None;
    }

    let scale = min_width as f64 / width as f64;
    let new_height = ((height as f64 * scale) as u32).max(1);
    info!(
        "Upscaling image: {}x{} -> {}x{}",
        width, height, min_width, new_height
    );

    Some(image.resize_exact(min_width, new_height, FilterType::Triangle))
}

/// `p' = clamp(p * factor, 0, 255)` on every colour component (rounded), alpha untouched
fn apply_contrast(image: DynamicImage, factor: f32) -> DynamicImage {
    let scale = |p: u8| (p as f32 * factor).round().clamp(0.0, 255.0) as u8;

    match image {
        DynamicImage::ImageLuma8(mut buf) => {
            for px in buf.pixels_mut() {
                px.0[0] = scale(px.0[0]);
            }
            DynamicImage::ImageLuma8(buf)
        }
        DynamicImage::ImageLumaA8(mut buf) => {
            for px in buf.pixels_mut() {
                px.0[0] = scale(px.0[0]);
            }
            DynamicImage::ImageLumaA8(buf)
        }
        DynamicImage::ImageRgb8(mut buf) => {
            for px in buf.pixels_mut() {
                for c in px.0.iter_mut() {
                    *c = scale(*c);
                }
            }
            DynamicImage::ImageRgb8(buf)
        }
        DynamicImage::ImageRgba8(mut buf) => {
            for px in buf.pixels_mut() {
                for c in px.0[..3].iter_mut() {
                    *c = scale(*c);
                }
            }
            DynamicImage::ImageRgba8(buf)
        }
        other => apply_contrast(DynamicImage::ImageRgba8(other.to_rgba8()), factor),
    }
}

/// Preprocessing settings bundled for the request path
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePreprocessor {
    pub grayscale: bool,
    pub contrast_factor: f32,
    pub min_width: u32,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self {
            grayscale: true,
            contrast_factor: DEFAULT_CONTRAST_FACTOR,
            min_width: DEFAULT_MIN_WIDTH,
        }
    }
}

impl From<&PreprocessingConfig> for ImagePreprocessor {
    fn from(config: &PreprocessingConfig) -> Self {
        Self {
            grayscale: config.grayscale,
            contrast_factor: config.contrast_factor,
            min_width: config.min_width,
        }
    }
}

impl ImagePreprocessor {
    /// Upscale, then grayscale + contrast, with a single decode/encode
    pub fn prepare(&self, image_bytes: &[u8]) -> Vec<u8> {
        let image = match decode_image_bytes(image_bytes) {
            Ok((image, _)) => image,
            Err(e) => {
                error!("Image preprocessing failed: {}, returning original", e);
                return image_bytes.to_vec();
            }
        };

        let sized = upscale_to_min_width(&image, self.min_width).unwrap_or(image);
        let enhanced = enhance(&sized, self.grayscale, self.contrast_factor);

        encode_png(&enhanced).unwrap_or_else(|e| {
            error!("Image preprocessing failed: {}, returning original", e);
            image_bytes.to_vec()
        })
    }
}
