//! Device-resident evolution.
//!
//! The device engine talks to hardware through [`DeviceExecutor`], a small
//! allocate / copy / launch / synchronize interface. Two executors ship with
//! the crate: the CUDA executor (`gpu::cuda`, behind the `cuda` feature) and
//! [`EmulatedDevice`], which runs the same tiled launch on the host and keeps
//! an allocation ledger so the engine can be exercised without a GPU.
//!
//! # Resource model
//!
//! - [`DeviceContext`] is created once per process and shared by `Arc`. It
//!   owns the executor and the loaded kernel and is never mutated afterwards.
//! - [`DeviceBufferSet`] owns the ping-pong generations of a single call.
//!   Its buffers release their device memory on `Drop`, so every exit path
//!   of a call, including `?` on a failed copy, frees what was acquired.

pub mod emulated;
pub mod layout;
pub mod parallel;

pub use emulated::{DeviceStats, EmulatedBuffer, EmulatedDevice};
pub use layout::{DeviceBufferSet, DeviceGrid};
pub use parallel::ParallelEngine;

use crate::config::EngineConfig;
use crate::core::error::Result;
use tracing::info;

/// Grid and block dimensions of one kernel launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchShape {
    /// Number of blocks along x, y, z.
    pub grid_dim: (u32, u32, u32),
    /// Threads per block along x, y, z.
    pub block_dim: (u32, u32, u32),
}

impl LaunchShape {
    /// One thread per cell, `tile_width × tile_height` threads per block.
    pub fn for_grid(width: usize, height: usize, tile_width: usize, tile_height: usize) -> Self {
        Self {
            grid_dim: (
                width.div_ceil(tile_width) as u32,
                height.div_ceil(tile_height) as u32,
                1,
            ),
            block_dim: (tile_width as u32, tile_height as u32, 1),
        }
    }

    /// Number of blocks in the launch.
    pub fn blocks(&self) -> usize {
        self.grid_dim.0 as usize * self.grid_dim.1 as usize * self.grid_dim.2 as usize
    }

    /// Total number of threads in the launch.
    pub fn threads(&self) -> usize {
        self.blocks()
            * self.block_dim.0 as usize
            * self.block_dim.1 as usize
            * self.block_dim.2 as usize
    }
}

/// Arguments of one generation step, per device layout.
#[derive(Debug)]
pub enum StepArgs<'a, B> {
    /// Single allocation per generation.
    Flat {
        /// Current generation.
        src: &'a B,
        /// Next generation, written by the kernel.
        dst: &'a mut B,
        /// Columns.
        width: usize,
        /// Rows.
        height: usize,
        /// Bytes between the starts of consecutive rows.
        stride: usize,
    },
    /// Row tables of the current and next generation.
    RowIndirect {
        /// Device table of row addresses of the current generation.
        src_rows: &'a B,
        /// Device table of row addresses of the next generation.
        dst_rows: &'a B,
        /// Columns.
        width: usize,
        /// Rows.
        height: usize,
    },
}

/// Execution collaborator of the device engine.
///
/// All methods complete before returning except [`launch_step`], which may
/// only enqueue work; callers must [`synchronize`] before reading results or
/// launching the next step.
///
/// [`launch_step`]: DeviceExecutor::launch_step
/// [`synchronize`]: DeviceExecutor::synchronize
pub trait DeviceExecutor: Send + Sync {
    /// Device memory handle. Dropping it frees the allocation.
    type Buffer: Send + Sync;

    /// Executor name for identification.
    fn name(&self) -> &str;

    /// Allocates `len` zeroed bytes.
    fn alloc(&self, len: usize) -> Result<Self::Buffer>;

    /// Copies `src` into the start of `dst`.
    fn upload(&self, src: &[u8], dst: &mut Self::Buffer) -> Result<()>;

    /// Copies the first `dst.len()` bytes of `src` to the host.
    fn download(&self, src: &Self::Buffer, dst: &mut [u8]) -> Result<()>;

    /// Device address of the start of `buffer`, as stored in row tables.
    fn address_of(&self, buffer: &Self::Buffer) -> u64;

    /// Launches the generation kernel.
    fn launch_step(&self, shape: &LaunchShape, args: StepArgs<'_, Self::Buffer>) -> Result<()>;

    /// Blocks until all previously issued work has completed.
    fn synchronize(&self) -> Result<()>;
}

/// Process-lifetime device resources: the executor with its loaded kernel
/// and the configuration it was set up with.
pub struct DeviceContext<E: DeviceExecutor> {
    executor: E,
    config: EngineConfig,
}

impl<E: DeviceExecutor> DeviceContext<E> {
    /// Wraps an initialized executor.
    pub fn new(executor: E, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        info!(
            executor = executor.name(),
            tile_width = config.tile_width,
            tile_height = config.tile_height,
            layout = config.layout.as_str(),
            "device context ready"
        );
        Ok(Self { executor, config })
    }

    /// The executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl<E: DeviceExecutor> std::fmt::Debug for DeviceContext<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceContext")
            .field("executor", &self.executor.name())
            .field("config", &self.config)
            .finish()
    }
}

impl<E: DeviceExecutor> Drop for DeviceContext<E> {
    fn drop(&mut self) {
        info!(executor = self.executor.name(), "device context released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_shape_exact_tiling() {
        let shape = LaunchShape::for_grid(64, 32, 16, 16);
        assert_eq!(shape.grid_dim, (4, 2, 1));
        assert_eq!(shape.block_dim, (16, 16, 1));
        assert_eq!(shape.blocks(), 8);
        assert_eq!(shape.threads(), 64 * 32);
    }

    #[test]
    fn test_launch_shape_rounds_up() {
        let shape = LaunchShape::for_grid(20, 17, 16, 16);
        assert_eq!(shape.grid_dim, (2, 2, 1));
        assert!(shape.threads() >= 20 * 17);
    }

    #[test]
    fn test_context_rejects_bad_config() {
        let config = crate::config::EngineConfigBuilder::new().tile(16, 0).build();
        assert!(DeviceContext::new(EmulatedDevice::new(), config).is_err());
    }
}
