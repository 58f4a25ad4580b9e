use std::fmt;

use log::warn;

use crate::models::{Confidence, PositionedDigit};

/// Square grid of optional digits; `None` is an empty cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<Option<PositionedDigit>>,
    duplicates: usize,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
            duplicates: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&PositionedDigit> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells[row * self.size + col].as_ref()
    }

    /// Put `digit` in its cell unless the cell is outside the grid or already
    /// taken. Returns whether it was stored.
    pub fn insert(&mut self, digit: PositionedDigit) -> bool {
        if digit.row >= self.size || digit.col >= self.size {
            return false;
        }
        let cell = &mut self.cells[digit.row * self.size + digit.col];
        if cell.is_some() {
            return false;
        }
        *cell = Some(digit);
        true
    }

    pub fn digits(&self) -> impl Iterator<Item = &PositionedDigit> {
        self.cells.iter().flatten()
    }

    /// Digits [`assemble`] dropped because their cell was already taken.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn filled(&self) -> usize {
        self.digits().count()
    }

    pub fn uncertain_cells(&self) -> Vec<(usize, usize)> {
        self.digits()
            .filter(|d| d.confidence == Confidence::Uncertain)
            .map(|d| (d.row, d.col))
            .collect()
    }

    /// Rows of labels, `None` for empty cells.
    pub fn to_rows(&self) -> Vec<Vec<Option<u8>>> {
        (0..self.size)
            .map(|r| {
                (0..self.size)
                    .map(|c| self.get(r, c).map(|d| d.label))
                    .collect()
            })
            .collect()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.to_rows() {
            let line: Vec<String> = row
                .iter()
                .map(|cell| cell.map_or_else(|| ".".to_string(), |d| d.to_string()))
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

/// Build a `size` x `size` grid from located digits. When two digits land in
/// the same cell the first one is kept, the clash is logged and counted in
/// [`Grid::duplicates`].
pub fn assemble(size: usize, digits: &[PositionedDigit]) -> Grid {
    let mut grid = Grid::new(size);
    for digit in digits {
        if digit.row >= size || digit.col >= size {
            warn!(
                "digit {} at ({}, {}) is outside the {size}x{size} grid",
                digit.label, digit.row, digit.col
            );
            continue;
        }
        if !grid.insert(*digit) {
            grid.duplicates += 1;
            let kept = grid.get(digit.row, digit.col).map(|d| d.label);
            warn!(
                "cell ({}, {}) already holds {:?}; ignoring second glyph read as {}",
                digit.row, digit.col, kept, digit.label
            );
        }
    }
    grid
}
