//! Well-known Life patterns for tests, benches and demos.

use crate::core::grid::Grid;

/// A pattern given as live-cell offsets from its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    /// Pattern name.
    pub name: &'static str,
    /// Live cells as `(row, col)` offsets.
    pub cells: &'static [(usize, usize)],
    /// Generations after which the pattern repeats, up to translation.
    pub period: usize,
}

impl Pattern {
    /// Sets the pattern's cells alive in `grid` with its top-left corner at
    /// `(row, col)`, wrapping around the edges.
    pub fn stamp(&self, grid: &mut Grid, row: usize, col: usize) {
        let (width, height) = (grid.width(), grid.height());
        if width == 0 || height == 0 {
            return;
        }
        for &(dr, dc) in self.cells {
            grid.set((row + dr) % height, (col + dc) % width, true);
        }
    }

    /// A `width × height` grid holding only this pattern at `(row, col)`.
    pub fn on_grid(&self, width: usize, height: usize, row: usize, col: usize) -> Grid {
        let mut grid = Grid::new(width, height);
        self.stamp(&mut grid, row, col);
        grid
    }
}

/// 2×2 still life.
pub const BLOCK: Pattern = Pattern {
    name: "block",
    cells: &[(0, 0), (0, 1), (1, 0), (1, 1)],
    period: 1,
};

/// Six-cell still life.
pub const BEEHIVE: Pattern = Pattern {
    name: "beehive",
    cells: &[(0, 1), (0, 2), (1, 0), (1, 3), (2, 1), (2, 2)],
    period: 1,
};

/// Vertical period-2 oscillator.
pub const BLINKER: Pattern = Pattern {
    name: "blinker",
    cells: &[(0, 1), (1, 1), (2, 1)],
    period: 2,
};

/// Period-2 oscillator of two offset rows.
pub const TOAD: Pattern = Pattern {
    name: "toad",
    cells: &[(1, 1), (1, 2), (1, 3), (2, 0), (2, 1), (2, 2)],
    period: 2,
};

/// Spaceship moving one cell down and one right every 4 generations.
pub const GLIDER: Pattern = Pattern {
    name: "glider",
    cells: &[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)],
    period: 4,
};

/// All patterns of this module.
pub const ALL: [Pattern; 5] = [BLOCK, BEEHIVE, BLINKER, TOAD, GLIDER];
