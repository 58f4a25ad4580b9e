use image::GrayImage;
use image::imageops::crop_imm;
use log::debug;

use crate::config::GlyphConfig;
use crate::detection::contours::find_contours;
use crate::models::{BorderKind, BoundingBox, GlyphCandidate};

/// Keep the blobs of `cleaned` that are sized like glyphs and crop each of
/// them out of `source`.
///
/// `cleaned` is the binarized grid with ruling lines removed; `source` is the
/// intensity image the crops are taken from and must have the same size.
/// Holes are skipped: a hole always sits inside the outer border of its own glyph.
pub fn find_glyph_candidates(
    cleaned: &GrayImage,
    source: &GrayImage,
    config: &GlyphConfig,
) -> Vec<GlyphCandidate> {
    let contours = find_contours(cleaned);
    let (width, height) = source.dimensions();

    let candidates: Vec<GlyphCandidate> = contours
        .iter()
        .filter(|c| c.kind == BorderKind::Outer)
        .filter_map(|c| c.bounding_box())
        .filter(|bbox| is_glyph_sized(bbox, config))
        .map(|bbox| {
            let crop = bbox.padded(config.crop_margin, width, height);
            GlyphCandidate {
                bbox,
                image: crop_imm(source, crop.x, crop.y, crop.width, crop.height).to_image(),
            }
        })
        .collect();

    debug!(
        "{} glyph candidates out of {} contours",
        candidates.len(),
        contours.len()
    );
    candidates
}

pub fn is_glyph_sized(bbox: &BoundingBox, config: &GlyphConfig) -> bool {
    (config.min_width..=config.max_width).contains(&bbox.width)
        && (config.min_height..=config.max_height).contains(&bbox.height)
}
