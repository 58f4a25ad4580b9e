use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::filter::box_filter;
use imageproc::map::map_colors2;

use crate::config::{BoundaryMode, PreprocessConfig};
use crate::error::{GridError, Result, Stage};

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply a box blur to reduce noise
pub fn apply_blur(img: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return img.clone();
    }
    box_filter(img, radius, radius)
}

pub fn invert(img: &GrayImage) -> GrayImage {
    let mut inverted = img.clone();
    image::imageops::invert(&mut inverted);
    inverted
}

/// Local mean threshold: a pixel becomes 255 when it exceeds the mean of its
/// `(2 * block_radius + 1)^2` neighbourhood by more than `offset`.
pub fn adaptive_threshold(img: &GrayImage, block_radius: u32, offset: i32) -> GrayImage {
    let local_mean = box_filter(img, block_radius, block_radius);
    map_colors2(img, &local_mean, |p, mean| {
        if p[0] as i32 > mean[0] as i32 + offset {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Detect edges using Canny edge detector
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Grayscale, blur, invert and threshold so that dark ink becomes 255 on a 0 background.
pub fn binarize(img: &DynamicImage, config: &PreprocessConfig) -> Result<GrayImage> {
    ensure_not_empty(img, Stage::Preprocess)?;
    let gray = to_grayscale(img);
    let blurred = apply_blur(&gray, config.blur_radius);
    let inverted = invert(&blurred);
    Ok(adaptive_threshold(
        &inverted,
        config.threshold_block_radius,
        config.threshold_offset,
    ))
}

/// Mask searched for the outer grid boundary.
pub fn boundary_mask(
    img: &DynamicImage,
    mode: BoundaryMode,
    config: &PreprocessConfig,
) -> Result<GrayImage> {
    match mode {
        BoundaryMode::Adaptive => binarize(img, config),
        BoundaryMode::Canny { low } => {
            ensure_not_empty(img, Stage::Preprocess)?;
            let blurred = apply_blur(&to_grayscale(img), config.blur_radius);
            Ok(detect_edges(&blurred, low, low * 2.0))
        }
    }
}

/// Shrink images wider than `max_width` by the integer ratio `width / max_width`.
pub fn normalize_scale(img: &DynamicImage, max_width: u32) -> DynamicImage {
    if max_width == 0 || img.width() <= max_width {
        return img.clone();
    }
    let ratio = img.width() / max_width;
    if ratio <= 1 {
        return img.clone();
    }
    img.resize_exact(img.width() / ratio, img.height() / ratio, FilterType::Triangle)
}

pub fn ensure_not_empty(img: &DynamicImage, stage: Stage) -> Result<()> {
    if img.width() == 0 || img.height() == 0 {
        return Err(GridError::EmptyImage { stage });
    }
    Ok(())
}
