use std::ops::RangeInclusive;
use std::sync::Arc;

use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::geometric_transformations::{Interpolation, Projection, warp};
use imageproc::rect::Rect;
use seegrid::{ClassifierModel, DigitClassifier, LabeledSample};

pub const WHITE: Luma<u8> = Luma([255]);
pub const INK: Luma<u8> = Luma([0]);

/// Block digits, five columns by seven rows, every stroke 4-connected.
const FONT: [[&str; 7]; 10] = [
    ["11111", "10001", "10001", "10001", "10001", "10001", "11111"],
    ["00100", "01100", "00100", "00100", "00100", "00100", "01110"],
    ["11111", "00001", "00001", "11111", "10000", "10000", "11111"],
    ["11111", "00001", "00001", "01111", "00001", "00001", "11111"],
    ["10001", "10001", "10001", "11111", "00001", "00001", "00001"],
    ["11111", "10000", "10000", "11111", "00001", "00001", "11111"],
    ["11111", "10000", "10000", "11111", "10001", "10001", "11111"],
    ["11111", "00001", "00001", "00001", "00001", "00001", "00001"],
    ["11111", "10001", "10001", "11111", "10001", "10001", "11111"],
    ["11111", "10001", "10001", "11111", "00001", "00001", "11111"],
];

pub const FONT_WIDTH: u32 = 5;
pub const FONT_HEIGHT: u32 = 7;

pub fn blank(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, WHITE)
}

/// Draw `digit` with its top-left corner at `(x, y)`, each font pixel a `scale` square.
pub fn draw_digit(img: &mut GrayImage, digit: u8, x: u32, y: u32, scale: u32) {
    for (row, bits) in FONT[digit as usize].iter().enumerate() {
        for (col, bit) in bits.chars().enumerate() {
            if bit == '1' {
                let rect = Rect::at((x + col as u32 * scale) as i32, (y + row as u32 * scale) as i32)
                    .of_size(scale, scale);
                draw_filled_rect_mut(img, rect, INK);
            }
        }
    }
}

/// A single digit on white with `margin` pixels around the ink.
pub fn render_digit(digit: u8, scale: u32, margin: u32) -> GrayImage {
    let mut img = blank(FONT_WIDTH * scale + 2 * margin, FONT_HEIGHT * scale + 2 * margin);
    draw_digit(&mut img, digit, margin, margin, scale);
    img
}

/// Every digit at every scale in `scales`.
pub fn synthetic_samples(scales: RangeInclusive<u32>) -> Vec<LabeledSample> {
    let mut samples = Vec::new();
    for digit in 0..=9u8 {
        for scale in scales.clone() {
            samples.push(LabeledSample::new(
                digit,
                DynamicImage::ImageLuma8(render_digit(digit, scale, 3)),
            ));
        }
    }
    samples
}

pub fn trained_model() -> Arc<ClassifierModel> {
    Arc::new(ClassifierModel::train(&synthetic_samples(3..=7)).expect("training on synthetic digits"))
}

pub fn trained_classifier(k: usize) -> DigitClassifier {
    DigitClassifier::with_model(trained_model(), k)
}

/// Layout of a printed grid.
#[derive(Debug, Clone, Copy)]
pub struct GridSpec {
    pub width: u32,
    pub height: u32,
    /// Top-left corner of the outer border.
    pub origin: u32,
    pub cell: u32,
    pub cells: u32,
    pub border: u32,
    pub line: u32,
    pub digit_scale: u32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            width: 600,
            height: 600,
            origin: 30,
            cell: 60,
            cells: 9,
            border: 3,
            line: 2,
            digit_scale: 4,
        }
    }
}

/// Ruled grid with `(row, col, digit)` printed centred in their cells.
pub fn render_grid(spec: &GridSpec, digits: &[(u32, u32, u8)]) -> GrayImage {
    let mut img = blank(spec.width, spec.height);
    let extent = spec.cells * spec.cell + spec.border;
    for k in 0..=spec.cells {
        let thickness = if k == 0 || k == spec.cells {
            spec.border
        } else {
            spec.line
        };
        let p = (spec.origin + k * spec.cell) as i32;
        let o = spec.origin as i32;
        draw_filled_rect_mut(&mut img, Rect::at(o, p).of_size(extent, thickness), INK);
        draw_filled_rect_mut(&mut img, Rect::at(p, o).of_size(thickness, extent), INK);
    }
    for &(row, col, digit) in digits {
        let x = spec.origin + col * spec.cell + (spec.cell - FONT_WIDTH * spec.digit_scale) / 2;
        let y = spec.origin + row * spec.cell + (spec.cell - FONT_HEIGHT * spec.digit_scale) / 2;
        draw_digit(&mut img, digit, x, y, spec.digit_scale);
    }
    img
}

/// White image with a dark rectangle outline from `(x0, y0)` to `(x1, y1)` inclusive.
pub fn rectangle_outline(
    width: u32,
    height: u32,
    (x0, y0): (u32, u32),
    (x1, y1): (u32, u32),
    thickness: u32,
) -> GrayImage {
    let mut img = blank(width, height);
    let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);
    let (x0, y0) = (x0 as i32, y0 as i32);
    draw_filled_rect_mut(&mut img, Rect::at(x0, y0).of_size(w, thickness), INK);
    draw_filled_rect_mut(&mut img, Rect::at(x0, y1 as i32 + 1 - thickness as i32).of_size(w, thickness), INK);
    draw_filled_rect_mut(&mut img, Rect::at(x0, y0).of_size(thickness, h), INK);
    draw_filled_rect_mut(&mut img, Rect::at(x1 as i32 + 1 - thickness as i32, y0).of_size(thickness, h), INK);
    img
}

/// Project the image corners onto `corners` (top-left, top-right,
/// bottom-right, bottom-left), as if photographed at an angle.
pub fn tilt(img: &GrayImage, corners: [(f32, f32); 4]) -> GrayImage {
    let (w, h) = (img.width() as f32 - 1.0, img.height() as f32 - 1.0);
    let projection = Projection::from_control_points([(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)], corners)
        .expect("tilt corners form a proper quadrilateral");
    warp(img, &projection, Interpolation::Bilinear, WHITE)
}
