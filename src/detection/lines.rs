use image::{GrayImage, Luma};
use log::debug;

use crate::config::LineConfig;
use crate::detection::contours::find_contours;
use crate::detection::morphology::{open_line, subtract, union};
use crate::error::{GridError, Result, Stage};
use crate::models::{Axis, BorderKind, BoundingBox, GridLineSet, Line, Point};

/// Ruling lines found on a binarized, rectified grid.
#[derive(Debug, Clone)]
pub struct GridLines {
    pub horizontal: GridLineSet,
    pub vertical: GridLineSet,
    /// Structures that survived the horizontal opening.
    pub horizontal_mask: GrayImage,
    /// Structures that survived the vertical opening.
    pub vertical_mask: GrayImage,
}

impl GridLines {
    /// `binary` with both line masks removed, leaving glyphs and noise.
    pub fn remove_from(&self, binary: &GrayImage) -> GrayImage {
        subtract(binary, &union(&self.horizontal_mask, &self.vertical_mask))
    }
}

/// Detect horizontal and vertical ruling lines.
///
/// For each axis the mask is opened with a one-pixel-thick line element
/// `extent / length_divisor` long, which erases glyphs and speckle and keeps
/// long thin structures. The bounding boxes of what survives are merged when
/// their centerlines are within `merge_tolerance`, and each merged box
/// yields its midline.
///
/// Merged lines shorter than `min_span_ratio` of the shorter image side are
/// dropped. A rectified grid fills a square, so on a wide or tall page the
/// full extent of the long axis is not the length of its ruling lines.
pub fn detect_grid_lines(binary: &GrayImage, config: &LineConfig) -> Result<GridLines> {
    if binary.width() == 0 || binary.height() == 0 {
        return Err(GridError::EmptyImage {
            stage: Stage::GridLines,
        });
    }
    if config.length_divisor == 0 {
        return Err(GridError::Config("lines.length_divisor must be positive".to_string()));
    }

    let (horizontal, horizontal_mask) = detect_axis(binary, Axis::Horizontal, config);
    let (vertical, vertical_mask) = detect_axis(binary, Axis::Vertical, config);
    Ok(GridLines {
        horizontal,
        vertical,
        horizontal_mask,
        vertical_mask,
    })
}

fn detect_axis(binary: &GrayImage, axis: Axis, config: &LineConfig) -> (GridLineSet, GrayImage) {
    let extent = match axis {
        Axis::Horizontal => binary.width(),
        Axis::Vertical => binary.height(),
    };
    let length = (extent / config.length_divisor).max(1);
    let opened = open_line(binary, axis, length);

    let spans: Vec<LineSpan> = find_contours(&opened)
        .iter()
        .filter(|c| c.kind == BorderKind::Outer)
        .filter_map(|c| c.bounding_box())
        .map(|bbox| LineSpan::from_box(bbox, axis))
        .collect();
    let fragments = spans.len();

    let side = binary.width().min(binary.height());
    let min_length = config.min_span_ratio * side as f32;
    let kept: Vec<LineSpan> = merge_spans(spans, config.merge_tolerance)
        .into_iter()
        .filter(|span| span.length() >= min_length)
        .collect();
    debug!(
        "{:?}: element length {}, {} fragments merged into {} lines",
        axis,
        length,
        fragments,
        kept.len()
    );

    // only fragments of accepted lines belong to the mask; long glyph strokes stay out of it
    let mut mask = GrayImage::new(binary.width(), binary.height());
    for bbox in kept.iter().flat_map(|span| &span.fragments) {
        for y in bbox.y..=bbox.bottom() {
            for x in bbox.x..=bbox.right() {
                if opened.get_pixel(x, y)[0] > 0 {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
    }
    let lines = kept.iter().map(|span| span.midline(axis)).collect();
    (GridLineSet::new(axis, lines), mask)
}

/// Merge lines of a set whose positions are within `tolerance` of each other.
///
/// Merging is repeated until nothing changes, so merging a merged set again
/// returns it unchanged.
pub fn merge_lines(set: &GridLineSet, tolerance: f32) -> GridLineSet {
    let spans = set
        .lines
        .iter()
        .map(|line| LineSpan::from_line(line, set.axis))
        .collect();
    let lines = merge_spans(spans, tolerance)
        .into_iter()
        .map(|span| span.midline(set.axis))
        .collect();
    GridLineSet::new(set.axis, lines)
}

/// Extent of a line-like structure: `across` is orthogonal to its axis, `along` follows it.
#[derive(Debug, Clone, PartialEq)]
struct LineSpan {
    across: (f32, f32),
    along: (f32, f32),
    /// Mask fragments merged into this span.
    fragments: Vec<BoundingBox>,
}

impl LineSpan {
    fn from_box(bbox: BoundingBox, axis: Axis) -> Self {
        let xs = (bbox.x as f32, bbox.right() as f32);
        let ys = (bbox.y as f32, bbox.bottom() as f32);
        let (across, along) = match axis {
            Axis::Horizontal => (ys, xs),
            Axis::Vertical => (xs, ys),
        };
        Self {
            across,
            along,
            fragments: vec![bbox],
        }
    }

    fn from_line(line: &Line, axis: Axis) -> Self {
        let position = line.position(axis);
        let (a, b) = match axis {
            Axis::Horizontal => (line.start.x, line.end.x),
            Axis::Vertical => (line.start.y, line.end.y),
        };
        Self {
            across: (position, position),
            along: (a.min(b), a.max(b)),
            fragments: Vec::new(),
        }
    }

    fn center(&self) -> f32 {
        (self.across.0 + self.across.1) / 2.0
    }

    fn length(&self) -> f32 {
        self.along.1 - self.along.0 + 1.0
    }

    fn absorb(&mut self, other: LineSpan) {
        *self = LineSpan {
            across: (
                self.across.0.min(other.across.0),
                self.across.1.max(other.across.1),
            ),
            along: (
                self.along.0.min(other.along.0),
                self.along.1.max(other.along.1),
            ),
            fragments: self.fragments.drain(..).chain(other.fragments).collect(),
        };
    }

    fn midline(&self, axis: Axis) -> Line {
        let c = self.center();
        match axis {
            Axis::Horizontal => Line::new(Point::new(self.along.0, c), Point::new(self.along.1, c)),
            Axis::Vertical => Line::new(Point::new(c, self.along.0), Point::new(c, self.along.1)),
        }
    }
}

fn merge_spans(mut spans: Vec<LineSpan>, tolerance: f32) -> Vec<LineSpan> {
    loop {
        let before = spans.len();
        spans = merge_pass(spans, tolerance);
        if spans.len() == before {
            return spans;
        }
    }
}

fn merge_pass(mut spans: Vec<LineSpan>, tolerance: f32) -> Vec<LineSpan> {
    spans.sort_by(|a, b| a.center().total_cmp(&b.center()));
    let mut merged: Vec<LineSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(current) if (span.center() - current.center()).abs() <= tolerance => {
                current.absorb(span);
            }
            _ => merged.push(span),
        }
    }
    merged
}
