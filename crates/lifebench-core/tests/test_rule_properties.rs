//! Tests for the B3/S23 rule on a torus.
//!
//! Every property is checked against both engines: the sequential engine
//! and the parallel engine running on the emulated device.

use lifebench_core::prelude::*;
use pretty_assertions::assert_eq;

fn engines(tile: usize) -> Vec<Box<dyn ComputeBackend>> {
    let config = EngineConfigBuilder::new().tile(tile, tile).build();
    let rows = EngineConfigBuilder::new()
        .tile(tile, tile)
        .layout(DeviceLayout::RowIndirect)
        .build();
    vec![
        Box::new(SequentialEngine::new()),
        Box::new(ParallelEngine::emulated(config).unwrap()),
        Box::new(ParallelEngine::emulated(rows).unwrap()),
    ]
}

#[test]
fn test_lonely_cell_dies() {
    let grid = Grid::with_live_cells(3, 3, &[(1, 1)]).unwrap();
    for engine in engines(3) {
        assert_eq!(engine.evolve(&grid, 1).unwrap(), Grid::new(3, 3), "{}", engine.name());
    }
}

#[test]
fn test_glider_translates_diagonally() {
    let grid = GLIDER.on_grid(16, 16, 0, 0);
    for engine in engines(16) {
        let result = engine.evolve(&grid, GLIDER.period).unwrap();
        assert_eq!(result, grid.translated(1, 1), "{}", engine.name());
    }
}

#[test]
fn test_glider_returns_after_full_lap() {
    // 16 cells per axis at one cell per 4 generations.
    let grid = GLIDER.on_grid(16, 16, 5, 9);
    for engine in engines(8) {
        assert_eq!(engine.evolve(&grid, 64).unwrap(), grid, "{}", engine.name());
    }
}

#[test]
fn test_zero_iterations_is_identity() {
    let grid: Grid = "#..#....\n.##.....\n....#..#\n#.......\n\
                      ...##...\n.....#..\n#......#\n..#.#..."
        .parse()
        .unwrap();
    for engine in engines(4) {
        assert_eq!(engine.evolve(&grid, 0).unwrap(), grid, "{}", engine.name());
    }
}

#[test]
fn test_still_lifes_are_fixed() {
    for pattern in [BLOCK, BEEHIVE] {
        assert_eq!(pattern.period, 1);
        let grid = pattern.on_grid(8, 8, 2, 2);
        for engine in engines(4) {
            assert_eq!(engine.evolve(&grid, 7).unwrap(), grid, "{} / {}", pattern.name, engine.name());
        }
    }
}

#[test]
fn test_oscillators_have_period_two() {
    for pattern in [BLINKER, TOAD] {
        assert_eq!(pattern.period, 2);
        let grid = pattern.on_grid(8, 8, 2, 2);
        for engine in engines(4) {
            assert_ne!(engine.evolve(&grid, 1).unwrap(), grid);
            let result = engine.evolve(&grid, pattern.period).unwrap();
            assert_eq!(result, grid, "{} / {}", pattern.name, engine.name());
        }
    }
}

#[test]
fn test_block_across_every_corner() {
    // A block split over the four corners survives only through wraparound.
    let grid = Grid::with_live_cells(8, 8, &[(0, 0), (0, 7), (7, 0), (7, 7)]).unwrap();
    for engine in engines(4) {
        assert_eq!(engine.evolve(&grid, 3).unwrap(), grid, "{}", engine.name());
    }
}

#[test]
fn test_blinker_across_edges() {
    // Vertical blinker through row 0 turns horizontal across the column seam.
    let grid = Grid::with_live_cells(8, 8, &[(7, 0), (0, 0), (1, 0)]).unwrap();
    let expected = Grid::with_live_cells(8, 8, &[(0, 7), (0, 0), (0, 1)]).unwrap();
    for engine in engines(4) {
        assert_eq!(engine.evolve(&grid, 1).unwrap(), expected, "{}", engine.name());
        assert_eq!(engine.evolve(&grid, 2).unwrap(), grid, "{}", engine.name());
    }
}

#[test]
fn test_engines_never_mutate_input() {
    let grid = GLIDER.on_grid(8, 8, 1, 1);
    let snapshot = grid.clone();
    for engine in engines(4) {
        engine.evolve(&grid, 5).unwrap();
        assert_eq!(grid, snapshot);
    }
}
