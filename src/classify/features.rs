use image::imageops::{FilterType, resize};
use image::{DynamicImage, GrayImage};
use imageproc::hog::{HogOptions, hog};

use crate::error::{GridError, Result, Stage};

/// Side of the square every glyph is resized to before description.
pub const GLYPH_SIZE: u32 = 32;
/// HOG cell side in pixels.
pub const HOG_CELL_SIDE: usize = 8;
/// HOG block side in cells.
pub const HOG_BLOCK_SIDE: usize = 2;
/// HOG block stride in cells.
pub const HOG_BLOCK_STRIDE: usize = 1;
/// Unsigned orientation bins over [0, pi).
pub const HOG_ORIENTATIONS: usize = 9;

const CELLS_PER_SIDE: usize = GLYPH_SIZE as usize / HOG_CELL_SIDE;
const BLOCKS_PER_SIDE: usize = (CELLS_PER_SIDE - HOG_BLOCK_SIDE) / HOG_BLOCK_STRIDE + 1;

/// Length of every descriptor produced by [`describe`].
pub const FEATURE_LEN: usize =
    BLOCKS_PER_SIDE * BLOCKS_PER_SIDE * HOG_BLOCK_SIDE * HOG_BLOCK_SIDE * HOG_ORIENTATIONS;

fn hog_options() -> HogOptions {
    HogOptions::new(
        HOG_ORIENTATIONS,
        false,
        HOG_CELL_SIDE,
        HOG_BLOCK_SIDE,
        HOG_BLOCK_STRIDE,
    )
}

/// Resize to the canonical glyph size.
pub fn normalize_glyph(img: &GrayImage) -> GrayImage {
    resize(img, GLYPH_SIZE, GLYPH_SIZE, FilterType::Triangle)
}

/// Histogram-of-oriented-gradients descriptor of a glyph image.
///
/// Orientations are unsigned, so dark-on-light and light-on-dark renderings
/// of the same glyph describe alike.
pub fn describe(img: &GrayImage) -> Result<Vec<f32>> {
    if img.width() == 0 || img.height() == 0 {
        return Err(GridError::EmptyImage {
            stage: Stage::Classify,
        });
    }
    let mut descriptor = hog(&normalize_glyph(img), hog_options()).map_err(GridError::Features)?;
    if descriptor.len() != FEATURE_LEN {
        return Err(GridError::Features(format!(
            "descriptor has {} values, expected {FEATURE_LEN}",
            descriptor.len()
        )));
    }
    // flat patches normalise to 0/0
    for value in descriptor.iter_mut().filter(|v| !v.is_finite()) {
        *value = 0.0;
    }
    Ok(descriptor)
}

pub fn describe_image(img: &DynamicImage) -> Result<Vec<f32>> {
    describe(&img.to_luma8())
}
