//! Toroidal Game-of-Life engines.
//!
//! This crate evolves a binary cell grid under the B3/S23 rule on a torus
//! with two interchangeable backends and reports identical results from
//! both, so they can be timed against each other.
//!
//! # Key Concepts
//!
//! - **Grid**: a `width × height` matrix of dead (`0`) and alive (`1`) cells
//! - **Backend**: anything implementing [`ComputeBackend`], which evolves a
//!   grid by a number of generations and returns a new grid
//! - **Device executor**: the allocate / copy / launch / synchronize
//!   interface the tiled engine runs on, either CUDA or the host emulation
//!
//! # Modules
//!
//! - [`core`]: grid, update rule, shape validation and errors
//! - [`compute`]: the sequential and parallel engines
//! - [`config`]: engine configuration
//! - [`gpu`]: kernel image preparation and the CUDA executor
//! - [`utils`]: well-known patterns

pub mod compute;
pub mod config;
pub mod core;
pub mod gpu;
pub mod utils;

// Re-export commonly used items at the crate root
pub use crate::compute::{ComputeBackend, ParallelEngine, SequentialEngine};
pub use crate::core::{EngineError, Grid, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use lifebench_core::prelude::*;
///
/// let grid = GLIDER.on_grid(16, 16, 0, 0);
/// let moved = SequentialEngine::new().evolve(&grid, 4).unwrap();
/// assert_eq!(moved, grid.translated(1, 1));
/// ```
pub mod prelude {
    pub use crate::compute::{
        first_divergence, ComputeBackend, DeviceContext, DeviceExecutor, EmulatedDevice,
        ParallelEngine, SequentialEngine,
    };
    pub use crate::config::{
        engine_config, DeviceLayout, EngineConfig, EngineConfigBuilder, ImageCachePolicy,
        KernelConfig,
    };
    pub use crate::core::{DeviceOp, EngineError, Grid, GridConstraints, Result};
    pub use crate::utils::patterns::{Pattern, BEEHIVE, BLINKER, BLOCK, GLIDER, TOAD};
}
