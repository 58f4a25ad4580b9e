use imageproc::geometry::approximate_polygon_dp;
use log::debug;

use crate::config::QuadConfig;
use crate::error::{GridError, Result};
use crate::models::{Contour, Point, Quadrilateral};

/// Simplify the largest contour to a polygon and require it to be a quadrilateral.
///
/// The simplification tolerance is `approx_ratio` times the perimeter of that
/// contour, so it scales with the size of the grid in the image.
pub fn find_quadrilateral(contours: &[Contour], config: &QuadConfig) -> Result<Quadrilateral> {
    let largest =
        largest_contour(contours).ok_or(GridError::GridBoundaryAmbiguous { vertices: 0 })?;
    let perimeter = largest.perimeter();
    let polygon = approximate_closed(&largest.points, config.approx_ratio * perimeter);
    debug!(
        "largest contour: area={:.0}, perimeter={:.1}, {} vertices after simplification",
        largest.area(),
        perimeter,
        polygon.len()
    );
    Quadrilateral::from_contour_points(&polygon).ok_or(GridError::GridBoundaryAmbiguous {
        vertices: polygon.len(),
    })
}

/// Contour enclosing the largest area; the first one wins a tie.
pub fn largest_contour(contours: &[Contour]) -> Option<&Contour> {
    let mut best: Option<(&Contour, f64)> = None;
    for contour in contours {
        let area = contour.area();
        if best.is_none_or(|(_, best_area)| area > best_area) {
            best = Some((contour, area));
        }
    }
    best.map(|(contour, _)| contour)
}

/// Douglas-Peucker simplification of a closed chain.
///
/// The chain is cut at two mutually distant points and each of the two arcs
/// is simplified on its own, so the result does not depend on where tracing
/// started.
pub fn approximate_closed(points: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    if points.len() < 3 || epsilon <= 0.0 {
        return points.to_vec();
    }
    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    let (start, end) = (a.min(b), a.max(b));
    if start == end {
        return vec![points[start]];
    }

    let forward = &points[start..=end];
    let backward: Vec<Point<i32>> = points[end..]
        .iter()
        .chain(&points[..=start])
        .copied()
        .collect();

    let mut polygon = approximate_polygon_dp(forward, epsilon, false);
    // last point of each arc is the first point of the other
    polygon.pop();
    let mut rest = approximate_polygon_dp(&backward, epsilon, false);
    rest.pop();
    polygon.extend(rest);
    polygon
}

fn farthest_from(points: &[Point<i32>], origin: Point<i32>) -> usize {
    let mut best = 0;
    let mut best_dist = -1i64;
    for (i, p) in points.iter().enumerate() {
        let (dx, dy) = ((p.x - origin.x) as i64, (p.y - origin.y) as i64);
        let dist = dx * dx + dy * dy;
        if dist > best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}
