//! Evolution backends.

pub mod backend;
pub mod cpu;
pub mod device;

// Re-export backends
pub use backend::{first_divergence, ComputeBackend};
pub use cpu::*;
pub use device::{DeviceContext, DeviceExecutor, EmulatedDevice, ParallelEngine};
