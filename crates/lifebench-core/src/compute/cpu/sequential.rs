//! Single-threaded host engine.

use crate::{
    compute::backend::ComputeBackend,
    core::{
        error::Result,
        grid::Grid,
        rule,
    },
};
use tracing::{debug, trace};

/// Host engine evolving a grid with two ping-pong buffers.
///
/// Each generation is written into the spare buffer and the buffers are
/// swapped, so no allocation happens inside the iteration loop.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialEngine;

impl SequentialEngine {
    /// Creates a new sequential engine.
    pub fn new() -> Self {
        Self
    }
}

impl ComputeBackend for SequentialEngine {
    fn name(&self) -> &str {
        "sequential"
    }

    fn evolve(&self, grid: &Grid, iterations: usize) -> Result<Grid> {
        self.validate(grid)?;
        debug!(
            width = grid.width(),
            height = grid.height(),
            iterations,
            "sequential evolve"
        );

        let mut current = grid.clone();
        let mut next = Grid::new(grid.width(), grid.height());

        for generation in 0..iterations {
            rule::step_into(&current, &mut next);
            std::mem::swap(&mut current, &mut next);
            trace!(generation = generation + 1, "generation complete");
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_cell_dies() {
        let grid = Grid::with_live_cells(3, 3, &[(1, 1)]).unwrap();
        let result = SequentialEngine::new().evolve(&grid, 1).unwrap();
        assert_eq!(result, Grid::new(3, 3));
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let grid: Grid = "#..#\n.##.\n#...".parse().unwrap();
        let result = SequentialEngine::new().evolve(&grid, 0).unwrap();
        assert_eq!(result, grid);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let grid: Grid = ".....\n..#..\n..#..\n..#..\n.....".parse().unwrap();
        let snapshot = grid.clone();
        let _ = SequentialEngine::new().evolve(&grid, 3).unwrap();
        assert_eq!(grid, snapshot);
    }

    #[test]
    fn test_blinker_period_two() {
        let grid: Grid = ".....\n..#..\n..#..\n..#..\n.....".parse().unwrap();
        let engine = SequentialEngine::new();
        assert_ne!(engine.evolve(&grid, 1).unwrap(), grid);
        assert_eq!(engine.evolve(&grid, 2).unwrap(), grid);
        assert_eq!(engine.evolve(&grid, 10).unwrap(), grid);
    }

    #[test]
    fn test_rejects_empty_grid() {
        let err = SequentialEngine::new().evolve(&Grid::new(0, 4), 1).unwrap_err();
        assert!(err.is_invalid_grid());
    }

    #[test]
    fn test_accepts_unaligned_grid() {
        // Only the device engine needs tile alignment.
        let grid = Grid::with_live_cells(5, 7, &[(0, 0), (0, 1), (0, 2)]).unwrap();
        assert!(SequentialEngine::new().evolve(&grid, 4).is_ok());
    }
}
