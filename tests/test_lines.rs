mod common;

use common::*;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use seegrid::config::{LineConfig, PreprocessConfig};
use seegrid::detection::cells::{interval_index, locate_cell};
use seegrid::detection::lines::{detect_grid_lines, merge_lines};
use seegrid::detection::morphology::{dilate_line, erode_line, open_line};
use seegrid::detection::preprocessing::binarize;

const ON: Luma<u8> = Luma([255]);

fn binary_grid(digits: &[(u32, u32, u8)]) -> GrayImage {
    let img = render_grid(&GridSpec::default(), digits);
    binarize(&DynamicImage::ImageLuma8(img), &PreprocessConfig::default()).unwrap()
}

fn horizontal(ys: &[f32]) -> GridLineSet {
    GridLineSet::new(
        Axis::Horizontal,
        ys.iter()
            .map(|&y| Line::new(Point::new(0.0, y), Point::new(100.0, y)))
            .collect(),
    )
}

fn vertical(xs: &[f32]) -> GridLineSet {
    GridLineSet::new(
        Axis::Vertical,
        xs.iter()
            .map(|&x| Line::new(Point::new(x, 0.0), Point::new(x, 100.0)))
            .collect(),
    )
}

#[test]
fn opening_keeps_long_runs_only() {
    let mut mask = GrayImage::new(60, 20);
    draw_filled_rect_mut(&mut mask, Rect::at(5, 5).of_size(40, 2), ON);
    draw_filled_rect_mut(&mut mask, Rect::at(50, 12).of_size(6, 6), ON);

    let opened = open_line(&mask, Axis::Horizontal, 10);
    assert_eq!(opened.get_pixel(5, 5)[0], 255);
    assert_eq!(opened.get_pixel(44, 6)[0], 255);
    assert_eq!(opened.get_pixel(52, 14)[0], 0, "short blob is erased");
}

#[test]
fn erosion_and_dilation_are_directional() {
    let mut mask = GrayImage::new(30, 30);
    draw_filled_rect_mut(&mut mask, Rect::at(10, 0).of_size(2, 30), ON);

    // a vertical bar is thin horizontally
    assert!(erode_line(&mask, Axis::Horizontal, 5).pixels().all(|p| p[0] == 0));
    let eroded = erode_line(&mask, Axis::Vertical, 5);
    assert_eq!(eroded.get_pixel(10, 15)[0], 255);

    let dilated = dilate_line(&mask, Axis::Horizontal, 5);
    assert_eq!(dilated.get_pixel(8, 15)[0], 255);
    assert_eq!(dilated.get_pixel(13, 15)[0], 255);
    assert_eq!(dilated.get_pixel(10, 15)[0], 255);
}

#[test]
fn finds_every_ruling_line_of_a_nine_by_nine_grid() {
    let lines = detect_grid_lines(&binary_grid(&[]), &LineConfig::default()).unwrap();

    assert_eq!(lines.horizontal.len(), 10);
    assert_eq!(lines.vertical.len(), 10);
    assert_eq!(lines.horizontal.intervals(), 9);

    let spec = GridSpec::default();
    for (k, y) in lines.horizontal.positions().into_iter().enumerate() {
        let expected = (spec.origin + k as u32 * spec.cell) as f32;
        assert!((y - expected).abs() <= 3.0, "line {k} at {y}, expected near {expected}");
    }
    for pair in lines.vertical.positions().windows(2) {
        assert!(pair[0] < pair[1]);
    }
}

#[test]
fn square_grid_on_a_wide_page_keeps_both_axes() {
    let spec = GridSpec {
        width: 1199,
        height: 580,
        origin: 20,
        ..GridSpec::default()
    };
    let binary = binarize(
        &DynamicImage::ImageLuma8(render_grid(&spec, &[])),
        &PreprocessConfig::default(),
    )
    .unwrap();
    let lines = detect_grid_lines(&binary, &LineConfig::default()).unwrap();

    assert_eq!(lines.horizontal.len(), 10);
    assert_eq!(lines.vertical.len(), 10);
    // and the same page turned on its side
    let tall = image::imageops::rotate90(&binary);
    let lines = detect_grid_lines(&tall, &LineConfig::default()).unwrap();
    assert_eq!(lines.horizontal.len(), 10);
    assert_eq!(lines.vertical.len(), 10);
}

#[test]
fn tall_digit_strokes_are_not_lines_and_survive_removal() {
    let binary = binary_grid(&[(4, 4, 1), (2, 6, 7), (6, 1, 2)]);
    let lines = detect_grid_lines(&binary, &LineConfig::default()).unwrap();
    assert_eq!(lines.horizontal.len(), 10);
    assert_eq!(lines.vertical.len(), 10);

    let cleaned = lines.remove_from(&binary);
    let spec = GridSpec::default();
    // stem of the "1" in cell (4, 4): font column 2, scale 4
    let x = spec.origin + 4 * spec.cell + (spec.cell - 5 * spec.digit_scale) / 2 + 2 * spec.digit_scale + 1;
    let y = spec.origin + 4 * spec.cell + spec.cell / 2;
    assert_eq!(cleaned.get_pixel(x, y)[0], 255);
    // a ruling line away from any digit is gone
    assert_eq!(cleaned.get_pixel(spec.origin + spec.cell / 2, spec.origin + 3 * spec.cell)[0], 0);
}

#[test]
fn broken_line_is_merged_into_one() {
    let mut mask = GrayImage::new(400, 400);
    draw_filled_rect_mut(&mut mask, Rect::at(10, 100).of_size(180, 2), ON);
    draw_filled_rect_mut(&mut mask, Rect::at(200, 102).of_size(190, 2), ON);

    let lines = detect_grid_lines(&mask, &LineConfig::default()).unwrap();
    assert_eq!(lines.horizontal.len(), 1);
    let line = lines.horizontal.lines[0];
    assert_eq!(line.start.x, 10.0);
    assert_eq!(line.end.x, 389.0);
    assert!(lines.vertical.is_empty());
}

#[test]
fn merging_is_idempotent() {
    let set = horizontal(&[10.0, 12.0, 50.0, 53.0, 56.0, 100.0]);
    let merged = merge_lines(&set, 5.0);
    assert_eq!(merged.positions(), vec![11.0, 53.0, 100.0]);
    assert_eq!(merge_lines(&merged, 5.0), merged);
}

#[test]
fn empty_mask_and_bad_divisor_are_rejected() {
    let err = detect_grid_lines(&GrayImage::new(0, 0), &LineConfig::default()).unwrap_err();
    assert!(matches!(err, GridError::EmptyImage { .. }));

    let config = LineConfig {
        length_divisor: 0,
        ..LineConfig::default()
    };
    let err = detect_grid_lines(&GrayImage::new(10, 10), &config).unwrap_err();
    assert!(matches!(err, GridError::Config(_)));
}

#[test]
fn locates_cells_between_consecutive_lines() {
    let rows = horizontal(&[10.0, 70.0, 130.0]);
    let cols = vertical(&[10.0, 70.0, 130.0]);

    // center (40, 100)
    let bbox = BoundingBox::new(30, 90, 20, 20);
    assert_eq!(locate_cell(&bbox, &rows, &cols), Some((1, 0)));
}

#[test]
fn glyph_outside_every_interval_has_no_cell() {
    let rows = horizontal(&[10.0, 70.0, 130.0]);
    let cols = vertical(&[10.0, 70.0, 130.0]);

    assert_eq!(locate_cell(&BoundingBox::new(200, 200, 10, 10), &rows, &cols), None);
    assert_eq!(locate_cell(&BoundingBox::new(0, 0, 6, 6), &rows, &cols), None);
    assert_eq!(locate_cell(&BoundingBox::new(40, 40, 10, 10), &horizontal(&[]), &cols), None);
}

#[test]
fn interval_is_half_open() {
    let positions = [10.0, 70.0, 130.0];
    assert_eq!(interval_index(&positions, 10.0), Some(0));
    assert_eq!(interval_index(&positions, 70.0), Some(1));
    assert_eq!(interval_index(&positions, 130.0), None);
    assert_eq!(interval_index(&[10.0], 10.0), None);
}
