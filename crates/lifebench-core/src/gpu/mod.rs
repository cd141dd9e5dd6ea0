//! GPU support.
//!
//! Kernel image preparation is always compiled so the toolchain handling
//! can be tested on machines without a GPU. The CUDA executor itself
//! requires the `cuda` feature flag and a CUDA toolkit.
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "cuda")]
//! # {
//! use lifebench_core::prelude::*;
//! use lifebench_core::gpu::cuda::CudaExecutor;
//!
//! let engine = ParallelEngine::<CudaExecutor>::cuda(EngineConfig::from_env());
//! let grid = Grid::new(256, 256);
//! let next = engine.evolve(&grid, 100).unwrap();
//! # }
//! ```

#[cfg(feature = "cuda")]
pub mod cuda;

pub mod kernels;

pub use kernels::{image_path_for, prepare_image};
