use image::{DynamicImage, GrayImage};
use imageproc::geometry::arc_length;
pub use imageproc::point::Point;

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest box holding every point; negative coordinates are clamped to zero.
    pub fn from_points(points: &[Point<i32>]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let (min_x, min_y) = (min_x.max(0), min_y.max(0));
        let (max_x, max_y) = (max_x.max(min_x), max_y.max(min_y));
        Some(Self {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        })
    }

    pub fn right(&self) -> u32 {
        self.x + self.width - 1
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height - 1
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x + 1, bottom - y + 1)
    }

    /// Grow by `padding` on every side, clamped to an image of the given size.
    pub fn padded(&self, padding: u32, img_width: u32, img_height: u32) -> BoundingBox {
        let x = self.x.saturating_sub(padding);
        let y = self.y.saturating_sub(padding);
        let max_x = (self.right() + padding).min(img_width.saturating_sub(1));
        let max_y = (self.bottom() + padding).min(img_height.saturating_sub(1));
        BoundingBox::new(x, y, max_x.saturating_sub(x) + 1, max_y.saturating_sub(y) + 1)
    }
}

/// Whether a traced border is the outside of a region or the edge of a hole in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderKind {
    Outer,
    Hole,
}

/// A closed traced boundary. `points` holds only the vertices needed to
/// redraw the polygon; `parent` indexes the enclosing contour in the same list.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
    pub parent: Option<usize>,
    pub kind: BorderKind,
}

impl Contour {
    /// Enclosed area of the polygon (shoelace formula).
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
            })
            .sum();
        twice.abs() as f64 / 2.0
    }

    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        arc_length(&self.points, true)
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }
}

/// Four corners of one closed polygon, in no particular order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    pub corners: [Point<f32>; 4],
}

impl Quadrilateral {
    pub fn new(corners: [Point<f32>; 4]) -> Self {
        Self { corners }
    }

    pub fn from_contour_points(points: &[Point<i32>]) -> Option<Self> {
        match points {
            [a, b, c, d] => Some(Self::new([a, b, c, d].map(|p| Point::new(p.x as f32, p.y as f32)))),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// One ruling line of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Point<f32>,
    pub end: Point<f32>,
}

impl Line {
    pub fn new(start: Point<f32>, end: Point<f32>) -> Self {
        Self { start, end }
    }

    /// Coordinate of the midpoint across the given axis: y for horizontal lines, x for vertical ones.
    pub fn position(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => (self.start.y + self.end.y) / 2.0,
            Axis::Vertical => (self.start.x + self.end.x) / 2.0,
        }
    }
}

/// Lines of one axis sorted by position, strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLineSet {
    pub axis: Axis,
    pub lines: Vec<Line>,
}

impl GridLineSet {
    pub fn new(axis: Axis, lines: Vec<Line>) -> Self {
        Self { axis, lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn positions(&self) -> Vec<f32> {
        self.lines.iter().map(|l| l.position(self.axis)).collect()
    }

    /// Number of cells between consecutive lines.
    pub fn intervals(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }
}

/// An ink blob that is sized like a glyph, cropped out of the rectified image.
#[derive(Debug, Clone)]
pub struct GlyphCandidate {
    /// Tight box of the blob in the rectified image.
    pub bbox: BoundingBox,
    /// Crop of `bbox` grown by the configured margin.
    pub image: GrayImage,
}

/// Reference image of a known digit.
#[derive(Debug, Clone)]
pub struct LabeledSample {
    pub label: u8,
    pub image: DynamicImage,
}

impl LabeledSample {
    pub fn new(label: u8, image: DynamicImage) -> Self {
        Self { label, image }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// All k neighbours agreed.
    Certain,
    /// The neighbours disagreed; the majority label was used.
    Uncertain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionedDigit {
    pub row: usize,
    pub col: usize,
    pub label: u8,
    pub confidence: Confidence,
}
