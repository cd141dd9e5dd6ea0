//! The binary cell matrix evolved by the engines.
//!
//! A [`Grid`] is a `width × height` matrix of cells, each either dead (`0`)
//! or alive (`1`). Cells are addressed as `(row, col)` with
//! `row < height` and `col < width`. The grid itself does not enforce
//! non-empty dimensions: engines check shape at their boundary so that an
//! empty grid surfaces as an error instead of a panic at construction.

use crate::core::error::{EngineError, Result};
use nalgebra::DMatrix;
use std::fmt;
use std::str::FromStr;

/// State value of a dead cell.
pub const DEAD: u8 = 0;

/// State value of a live cell.
pub const ALIVE: u8 = 1;

/// A two-dimensional binary cell matrix.
///
/// With the `serde` feature a grid serializes as its matrix and
/// deserialization rejects cell states other than 0 and 1.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "DMatrix<u8>", into = "DMatrix<u8>"))]
pub struct Grid {
    /// `height` rows by `width` columns.
    cells: DMatrix<u8>,
}

impl Grid {
    /// Creates an all-dead grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            cells: DMatrix::zeros(height, width),
        }
    }

    /// Creates a grid from row-major cell states.
    ///
    /// Fails if `cells.len() != width * height` or if any value is not 0 or 1.
    pub fn from_row_major(width: usize, height: usize, cells: &[u8]) -> Result<Self> {
        if cells.len() != width * height {
            return Err(EngineError::invalid_grid(format!(
                "expected {} cells for a {}x{} grid, got {}",
                width * height,
                width,
                height,
                cells.len()
            )));
        }
        check_states(cells.iter().copied())?;

        Ok(Self {
            cells: DMatrix::from_row_slice(height, width, cells),
        })
    }

    /// Creates a grid with the given `(row, col)` cells alive.
    pub fn with_live_cells(width: usize, height: usize, live: &[(usize, usize)]) -> Result<Self> {
        let mut grid = Self::new(width, height);
        for &(row, col) in live {
            if row >= height || col >= width {
                return Err(EngineError::invalid_grid(format!(
                    "live cell ({}, {}) outside {}x{} grid",
                    row, col, width, height
                )));
            }
            grid.set(row, col, true);
        }
        Ok(grid)
    }

    /// Wraps an existing matrix (`rows = height`, `columns = width`).
    pub fn from_matrix(cells: DMatrix<u8>) -> Result<Self> {
        check_states(cells.iter().copied())?;
        Ok(Self { cells })
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.cells.ncols()
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.cells.nrows()
    }

    /// Total number of cells.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Whether either dimension is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// State of the cell at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[(row, col)]
    }

    /// Whether the cell at `(row, col)` is alive.
    #[inline]
    pub fn is_alive(&self, row: usize, col: usize) -> bool {
        self.get(row, col) == ALIVE
    }

    /// Sets the cell at `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, alive: bool) {
        self.cells[(row, col)] = if alive { ALIVE } else { DEAD };
    }

    /// Number of live cells.
    pub fn population(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell == ALIVE).count()
    }

    /// Copies row `row` into `dst`, which must be at least `width` long.
    pub fn copy_row_into(&self, row: usize, dst: &mut [u8]) {
        for (out, &cell) in dst.iter_mut().zip(self.cells.row(row).iter()) {
            *out = cell;
        }
    }

    /// Row-major copy of all cells.
    pub fn to_row_major(&self) -> Vec<u8> {
        let width = self.width();
        let mut out = vec![DEAD; self.cell_count()];
        if width > 0 {
            for (row, chunk) in out.chunks_exact_mut(width).enumerate() {
                self.copy_row_into(row, chunk);
            }
        }
        out
    }

    /// The underlying matrix.
    pub fn as_matrix(&self) -> &DMatrix<u8> {
        &self.cells
    }

    /// Returns a copy shifted by `(d_row, d_col)` with toroidal wraparound.
    pub fn translated(&self, d_row: isize, d_col: isize) -> Self {
        let (width, height) = (self.width(), self.height());
        let mut out = Self::new(width, height);
        if self.is_empty() {
            return out;
        }
        for row in 0..height {
            for col in 0..width {
                let r = wrap(row as isize + d_row, height);
                let c = wrap(col as isize + d_col, width);
                out.cells[(r, c)] = self.cells[(row, col)];
            }
        }
        out
    }
}

impl TryFrom<DMatrix<u8>> for Grid {
    type Error = EngineError;

    fn try_from(cells: DMatrix<u8>) -> Result<Self> {
        Self::from_matrix(cells)
    }
}

impl From<Grid> for DMatrix<u8> {
    fn from(grid: Grid) -> Self {
        grid.cells
    }
}

fn wrap(index: isize, extent: usize) -> usize {
    index.rem_euclid(extent as isize) as usize
}

fn check_states(cells: impl Iterator<Item = u8>) -> Result<()> {
    for cell in cells {
        if cell > ALIVE {
            return Err(EngineError::invalid_grid(format!(
                "cell state {} is neither 0 nor 1",
                cell
            )));
        }
    }
    Ok(())
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.height() {
            for col in 0..self.width() {
                f.write_str(if self.is_alive(row, col) { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Parses the `#`/`.` rendering produced by `Display`.
///
/// `#`, `O` and `1` are alive; `.` and `0` are dead. Blank lines are skipped
/// and all rows must have the same length.
impl FromStr for Grid {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let rows: Vec<&str> = s
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let width = rows.first().map_or(0, |row| row.chars().count());

        let mut cells = Vec::with_capacity(width * rows.len());
        for (index, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(EngineError::invalid_grid(format!(
                    "row {} has {} cells, expected {}",
                    index,
                    row.chars().count(),
                    width
                )));
            }
            for ch in row.chars() {
                let state = match ch {
                    '#' | 'O' | '1' => ALIVE,
                    '.' | '0' => DEAD,
                    other => {
                        return Err(EngineError::invalid_grid(format!(
                            "unexpected character {:?} in row {}",
                            other, index
                        )))
                    }
                };
                cells.push(state);
            }
        }

        Self::from_row_major(width, rows.len(), &cells)
    }
}
