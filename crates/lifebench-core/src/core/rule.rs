//! The B3/S23 update rule on a torus.
//!
//! Both engines evolve cells through [`evolve_cell`]; the CUDA kernel in
//! `kernels/life_step.cu` mirrors it line for line. Neighbor indices wrap on
//! each axis independently, using the global grid dimensions.

use crate::core::grid::{Grid, ALIVE, DEAD};

/// Index before `index` on an axis of length `extent`, wrapping at 0.
#[inline(always)]
pub fn wrap_prev(index: usize, extent: usize) -> usize {
    (index + extent - 1) % extent
}

/// Index after `index` on an axis of length `extent`, wrapping at the end.
#[inline(always)]
pub fn wrap_next(index: usize, extent: usize) -> usize {
    (index + 1) % extent
}

/// Next state of a cell given its current state and live neighbor count.
#[inline(always)]
pub fn next_state(current: u8, live_neighbors: u8) -> u8 {
    if live_neighbors == 3 || (live_neighbors == 2 && current == ALIVE) {
        ALIVE
    } else {
        DEAD
    }
}

/// Computes the next state of `(row, col)` reading cells through `read`.
///
/// `read(row, col)` must return 0 or 1 for every in-range coordinate. The
/// accessor lets the same rule run over a [`Grid`] and over raw device
/// memory in either layout.
#[inline(always)]
pub fn evolve_cell<F>(read: F, row: usize, col: usize, width: usize, height: usize) -> u8
where
    F: Fn(usize, usize) -> u8,
{
    let up = wrap_prev(row, height);
    let down = wrap_next(row, height);
    let left = wrap_prev(col, width);
    let right = wrap_next(col, width);

    let live = read(up, left)
        + read(up, col)
        + read(up, right)
        + read(row, left)
        + read(row, right)
        + read(down, left)
        + read(down, col)
        + read(down, right);

    next_state(read(row, col), live)
}

/// Number of live cells among the eight toroidal neighbors of `(row, col)`.
pub fn live_neighbors(grid: &Grid, row: usize, col: usize) -> u8 {
    let (width, height) = (grid.width(), grid.height());
    let up = wrap_prev(row, height);
    let down = wrap_next(row, height);
    let left = wrap_prev(col, width);
    let right = wrap_next(col, width);

    [
        (up, left),
        (up, col),
        (up, right),
        (row, left),
        (row, right),
        (down, left),
        (down, col),
        (down, right),
    ]
    .iter()
    .map(|&(r, c)| grid.get(r, c))
    .sum()
}

/// Writes generation `current + 1` into `next`.
///
/// Both grids must have the same non-empty shape.
pub fn step_into(current: &Grid, next: &mut Grid) {
    debug_assert_eq!(current.width(), next.width());
    debug_assert_eq!(current.height(), next.height());

    let (width, height) = (current.width(), current.height());
    let read = |r: usize, c: usize| current.get(r, c);
    for row in 0..height {
        for col in 0..width {
            let state = evolve_cell(read, row, col, width, height);
            next.set(row, col, state == ALIVE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_table() {
        for neighbors in 0..=8u8 {
            let born = next_state(DEAD, neighbors);
            let survives = next_state(ALIVE, neighbors);
            assert_eq!(born == ALIVE, neighbors == 3, "birth with {} neighbors", neighbors);
            assert_eq!(
                survives == ALIVE,
                neighbors == 2 || neighbors == 3,
                "survival with {} neighbors",
                neighbors
            );
        }
    }

    #[test]
    fn test_wrap_helpers() {
        assert_eq!(wrap_prev(0, 5), 4);
        assert_eq!(wrap_prev(3, 5), 2);
        assert_eq!(wrap_next(4, 5), 0);
        assert_eq!(wrap_next(1, 5), 2);
        // A single-cell axis wraps onto itself.
        assert_eq!(wrap_prev(0, 1), 0);
        assert_eq!(wrap_next(0, 1), 0);
    }

    #[test]
    fn test_corner_counts_opposite_corners() {
        let grid = Grid::with_live_cells(6, 4, &[(0, 0)]).unwrap();
        assert_eq!(live_neighbors(&grid, 3, 5), 1);
        assert_eq!(live_neighbors(&grid, 3, 0), 1);
        assert_eq!(live_neighbors(&grid, 0, 5), 1);
        assert_eq!(live_neighbors(&grid, 1, 1), 1);
        assert_eq!(live_neighbors(&grid, 2, 2), 0);
        // A cell is never its own neighbor.
        assert_eq!(live_neighbors(&grid, 0, 0), 0);
    }

    #[test]
    fn test_evolve_cell_matches_neighbor_count() {
        let grid: Grid = "#..#\n.#..\n..#.\n#...".parse().unwrap();
        let read = |r: usize, c: usize| grid.get(r, c);
        for row in 0..4 {
            for col in 0..4 {
                let expected = next_state(grid.get(row, col), live_neighbors(&grid, row, col));
                assert_eq!(evolve_cell(read, row, col, 4, 4), expected);
            }
        }
    }

    #[test]
    fn test_step_into_blinker() {
        let horizontal: Grid = ".....\n.....\n.###.\n.....\n.....".parse().unwrap();
        let vertical: Grid = ".....\n..#..\n..#..\n..#..\n.....".parse().unwrap();

        let mut next = Grid::new(5, 5);
        step_into(&horizontal, &mut next);
        assert_eq!(next, vertical);
    }
}
