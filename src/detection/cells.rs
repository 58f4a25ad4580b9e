use crate::models::{BoundingBox, GridLineSet};

/// Row and column of the cell holding the center of `bbox`.
///
/// Returns `None` when the center is not between two consecutive lines on
/// either axis. A center exactly on line `i` belongs to the cell after it.
pub fn locate_cell(
    bbox: &BoundingBox,
    horizontal: &GridLineSet,
    vertical: &GridLineSet,
) -> Option<(usize, usize)> {
    let (cx, cy) = bbox.center();
    let row = interval_index(&horizontal.positions(), cy)?;
    let col = interval_index(&vertical.positions(), cx)?;
    Some((row, col))
}

/// Index `i` such that `positions[i] <= value < positions[i + 1]`.
pub fn interval_index(positions: &[f32], value: f32) -> Option<usize> {
    positions
        .windows(2)
        .position(|pair| pair[0] <= value && value < pair[1])
}
