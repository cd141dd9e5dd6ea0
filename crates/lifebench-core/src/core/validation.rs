//! Shape checks applied at the engine boundary.

use crate::core::error::{EngineError, Result};
use crate::core::grid::Grid;

/// Shape constraints an engine imposes on its input grid.
///
/// Every engine requires a non-empty grid. Tiled engines additionally
/// require both dimensions to be multiples of the tile and the cell count
/// to stay within the device budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConstraints {
    /// Required `(tile_width, tile_height)` divisibility, if any.
    pub tile: Option<(usize, usize)>,
    /// Upper bound on `width * height`, if any.
    pub max_cells: Option<usize>,
}

impl GridConstraints {
    /// Only the non-empty check.
    pub const fn universal() -> Self {
        Self {
            tile: None,
            max_cells: None,
        }
    }

    /// Non-empty, tile-aligned and bounded.
    pub const fn tiled(tile_width: usize, tile_height: usize, max_cells: usize) -> Self {
        Self {
            tile: Some((tile_width, tile_height)),
            max_cells: Some(max_cells),
        }
    }

    /// Checks `grid` against the constraints.
    pub fn check(&self, grid: &Grid) -> Result<()> {
        let (width, height) = (grid.width(), grid.height());

        if width == 0 || height == 0 {
            return Err(EngineError::invalid_grid(format!(
                "grid must be non-empty, got {}x{}",
                width, height
            )));
        }

        if let Some((tile_width, tile_height)) = self.tile {
            if tile_width == 0 || tile_height == 0 {
                return Err(EngineError::backend_unavailable(format!(
                    "tile dimensions must be positive, got {}x{}",
                    tile_width, tile_height
                )));
            }
            if width % tile_width != 0 {
                return Err(EngineError::invalid_grid(format!(
                    "width {} is not a multiple of the tile width {}",
                    width, tile_width
                )));
            }
            if height % tile_height != 0 {
                return Err(EngineError::invalid_grid(format!(
                    "height {} is not a multiple of the tile height {}",
                    height, tile_height
                )));
            }
        }

        if let Some(max_cells) = self.max_cells {
            let cells = width * height;
            if cells > max_cells {
                return Err(EngineError::invalid_grid(format!(
                    "{}x{} grid has {} cells, the limit is {}",
                    width, height, cells, max_cells
                )));
            }
        }

        Ok(())
    }
}

impl Default for GridConstraints {
    fn default() -> Self {
        Self::universal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universal_rejects_empty() {
        let constraints = GridConstraints::universal();
        assert!(constraints.check(&Grid::new(0, 4)).is_err());
        assert!(constraints.check(&Grid::new(4, 0)).is_err());
        assert!(constraints.check(&Grid::new(3, 5)).is_ok());
    }

    #[test]
    fn test_tiled_requires_alignment() {
        let constraints = GridConstraints::tiled(16, 16, 64 * 64);
        assert!(constraints.check(&Grid::new(32, 16)).is_ok());
        assert!(constraints.check(&Grid::new(24, 16)).unwrap_err().is_invalid_grid());
        assert!(constraints.check(&Grid::new(16, 8)).unwrap_err().is_invalid_grid());
        assert!(constraints.check(&Grid::new(0, 16)).unwrap_err().is_invalid_grid());
    }

    #[test]
    fn test_tiled_enforces_cell_budget() {
        let constraints = GridConstraints::tiled(16, 16, 32 * 32);
        assert!(constraints.check(&Grid::new(32, 32)).is_ok());

        let err = constraints.check(&Grid::new(48, 32)).unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn test_zero_tile_is_an_error() {
        let err = GridConstraints::tiled(0, 16, 1024).check(&Grid::new(16, 16)).unwrap_err();
        assert!(!err.is_invalid_grid());
        assert!(err.to_string().contains("tile dimensions must be positive"));
        assert!(GridConstraints::tiled(16, 0, 1024).check(&Grid::new(16, 16)).is_err());
    }
}
