use image::{DynamicImage, Luma, Rgb};
use imageproc::geometric_transformations::{Interpolation, Projection, warp};
use log::debug;

use crate::config::RectifyConfig;
use crate::error::{GridError, Result, Stage};
use crate::detection::preprocessing::ensure_not_empty;
use crate::models::{Point, Quadrilateral};

/// Sine of the smallest corner angle accepted before a quadrilateral is
/// treated as collapsed onto a line.
const MIN_CORNER_SINE: f32 = 1e-3;

/// Output of the perspective correction.
#[derive(Debug, Clone)]
pub struct Rectification {
    /// Resampled image, same size as the input.
    pub image: DynamicImage,
    /// Maps input coordinates to rectified coordinates.
    pub projection: Projection,
    /// Source corners ordered top-left, top-right, bottom-right, bottom-left.
    pub source: [Point<f32>; 4],
    /// Corners of the canonical square, in the same order.
    pub target: [Point<f32>; 4],
}

impl Rectification {
    pub fn to_rectified(&self, p: Point<f32>) -> Point<f32> {
        let (x, y) = self.projection * (p.x, p.y);
        Point::new(x, y)
    }

    pub fn to_source(&self, p: Point<f32>) -> Point<f32> {
        let (x, y) = self.projection.invert() * (p.x, p.y);
        Point::new(x, y)
    }
}

/// Warp `img` so that `quad` becomes an axis-aligned square inset by the
/// configured margin.
pub fn rectify(
    img: &DynamicImage,
    quad: &Quadrilateral,
    config: &RectifyConfig,
) -> Result<Rectification> {
    ensure_not_empty(img, Stage::Rectify)?;
    let (width, height) = (img.width(), img.height());
    let target = canonical_square(width, height, config.margin)?;
    let source = order_corners(&quad.corners);
    check_not_degenerate(&source)?;

    let projection = Projection::from_control_points(
        source.map(|p| (p.x, p.y)),
        target.map(|p| (p.x, p.y)),
    )
    .ok_or_else(|| GridError::Rectification {
        reason: "corner correspondence has no unique homography".to_string(),
    })?;

    let image = match img {
        DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(warp(
            gray,
            &projection,
            Interpolation::Bilinear,
            Luma([255u8]),
        )),
        other => DynamicImage::ImageRgb8(warp(
            &other.to_rgb8(),
            &projection,
            Interpolation::Bilinear,
            Rgb([255u8, 255, 255]),
        )),
    };
    debug!(
        "rectified {:?} onto square {:?}..{:?}",
        source, target[0], target[2]
    );

    Ok(Rectification {
        image,
        projection,
        source,
        target,
    })
}

/// Corners of the largest square that fits inside the image with `margin` on every side.
pub fn canonical_square(width: u32, height: u32, margin: u32) -> Result<[Point<f32>; 4]> {
    let side = width.min(height) as i64 - 2 * margin as i64;
    if side <= 1 {
        return Err(GridError::Rectification {
            reason: format!("{width}x{height} image leaves no room for a {margin}px margin"),
        });
    }
    let (lo, hi) = (margin as f32, (margin as i64 + side - 1) as f32);
    Ok([
        Point::new(lo, lo),
        Point::new(hi, lo),
        Point::new(hi, hi),
        Point::new(lo, hi),
    ])
}

/// Sort corners clockwise around their centroid, starting with the one closest
/// to the image origin.
pub fn order_corners(corners: &[Point<f32>; 4]) -> [Point<f32>; 4] {
    let cx = corners.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let cy = corners.iter().map(|p| p.y).sum::<f32>() / 4.0;
    let mut sorted = *corners;
    // y grows downwards, so increasing angle runs clockwise on screen
    sorted.sort_by(|a, b| {
        let ta = (a.y - cy).atan2(a.x - cx);
        let tb = (b.y - cy).atan2(b.x - cx);
        ta.total_cmp(&tb)
    });
    let first = (0..4)
        .min_by(|&i, &j| {
            let si = sorted[i].x + sorted[i].y;
            let sj = sorted[j].x + sorted[j].y;
            si.total_cmp(&sj)
        })
        .unwrap_or(0);
    sorted.rotate_left(first);
    sorted
}

fn check_not_degenerate(corners: &[Point<f32>; 4]) -> Result<()> {
    let area = polygon_area(corners);
    if area < 1.0 {
        return Err(GridError::Rectification {
            reason: format!("quadrilateral area {area:.2} is too small"),
        });
    }
    for i in 0..4 {
        let prev = corners[(i + 3) % 4];
        let cur = corners[i];
        let next = corners[(i + 1) % 4];
        let (ax, ay) = (prev.x - cur.x, prev.y - cur.y);
        let (bx, by) = (next.x - cur.x, next.y - cur.y);
        let lengths = (ax * ax + ay * ay).sqrt() * (bx * bx + by * by).sqrt();
        if lengths == 0.0 || (ax * by - ay * bx).abs() / lengths < MIN_CORNER_SINE {
            return Err(GridError::Rectification {
                reason: format!("corners around ({:.1}, {:.1}) are collinear", cur.x, cur.y),
            });
        }
    }
    Ok(())
}

fn polygon_area(corners: &[Point<f32>; 4]) -> f32 {
    let twice: f32 = (0..4)
        .map(|i| {
            let a = corners[i];
            let b = corners[(i + 1) % 4];
            a.x * b.y - b.x * a.y
        })
        .sum();
    twice.abs() / 2.0
}
