use image::GrayImage;
use imageproc::contours::{self, BorderType};

use crate::models::{BorderKind, Contour, Point};

/// Trace every border of the non-zero regions of `mask`, keeping the full
/// nesting tree. Each contour is reduced to the points where the border
/// changes direction.
pub fn find_contours(mask: &GrayImage) -> Vec<Contour> {
    contours::find_contours::<i32>(mask)
        .into_iter()
        .map(|traced| Contour {
            points: simplify_chain(&traced.points),
            parent: traced.parent,
            kind: match traced.border_type {
                BorderType::Outer => BorderKind::Outer,
                BorderType::Hole => BorderKind::Hole,
            },
        })
        .collect()
}

/// Indices of the contours whose parent is `index`.
pub fn children(contours: &[Contour], index: usize) -> Vec<usize> {
    contours
        .iter()
        .enumerate()
        .filter(|(_, c)| c.parent == Some(index))
        .map(|(i, _)| i)
        .collect()
}

/// Drop the points lying in the middle of straight runs of a closed chain.
pub fn simplify_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            (cur.x - prev.x, cur.y - prev.y) != (next.x - cur.x, next.y - cur.y)
        })
        .map(|i| points[i])
        .collect()
}
