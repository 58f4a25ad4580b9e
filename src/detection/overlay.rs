use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::detection::lines::GridLines;
use crate::models::{Axis, BoundingBox, Contour, GlyphCandidate, Quadrilateral};

const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 160, 255]);
const QUAD_COLOR: Rgb<u8> = Rgb([255, 40, 40]);
const HORIZONTAL_COLOR: Rgb<u8> = Rgb([220, 0, 0]);
const VERTICAL_COLOR: Rgb<u8> = Rgb([0, 0, 220]);
const GLYPH_COLOR: Rgb<u8> = Rgb([0, 180, 0]);

fn to_rgb(img: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(img.clone()).to_rgb8()
}

fn draw_polygon(canvas: &mut RgbImage, points: &[(f32, f32)], color: Rgb<u8>) {
    for (i, &start) in points.iter().enumerate() {
        let end = points[(i + 1) % points.len()];
        draw_line_segment_mut(canvas, start, end, color);
    }
}

fn draw_box(canvas: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    let (x0, y0) = (bbox.x as f32, bbox.y as f32);
    let (x1, y1) = (bbox.right() as f32, bbox.bottom() as f32);
    draw_polygon(canvas, &[(x0, y0), (x1, y0), (x1, y1), (x0, y1)], color);
}

/// All contours over the mask they were traced on, with the chosen boundary on top.
pub fn draw_contours(mask: &GrayImage, contours: &[Contour], quad: &Quadrilateral) -> RgbImage {
    let mut canvas = to_rgb(mask);
    for contour in contours.iter().filter(|c| c.points.len() > 1) {
        let points: Vec<(f32, f32)> = contour
            .points
            .iter()
            .map(|p| (p.x as f32, p.y as f32))
            .collect();
        draw_polygon(&mut canvas, &points, CONTOUR_COLOR);
    }
    draw_polygon(&mut canvas, &quad.corners.map(|p| (p.x, p.y)), QUAD_COLOR);
    canvas
}

/// Detected lines drawn across the rectified image.
pub fn draw_grid_lines(img: &GrayImage, lines: &GridLines) -> RgbImage {
    let mut canvas = to_rgb(img);
    for (set, color) in [
        (&lines.horizontal, HORIZONTAL_COLOR),
        (&lines.vertical, VERTICAL_COLOR),
    ] {
        for line in &set.lines {
            draw_line_segment_mut(
                &mut canvas,
                (line.start.x, line.start.y),
                (line.end.x, line.end.y),
                color,
            );
        }
    }
    canvas
}

/// Glyph boxes over the rectified image.
pub fn draw_glyphs(img: &GrayImage, glyphs: &[GlyphCandidate]) -> RgbImage {
    let mut canvas = to_rgb(img);
    for glyph in glyphs {
        draw_box(&mut canvas, &glyph.bbox, GLYPH_COLOR);
    }
    canvas
}

/// Mask of one axis as a viewable image, line pixels dark.
pub fn line_mask_view(lines: &GridLines, axis: Axis) -> GrayImage {
    let mask = match axis {
        Axis::Horizontal => &lines.horizontal_mask,
        Axis::Vertical => &lines.vertical_mask,
    };
    let mut view = mask.clone();
    image::imageops::invert(&mut view);
    view
}
