//! Engine selection and configuration loading.

use crate::error::BenchResult;
use lifebench_core::config::{engine_config, EngineConfig};
use lifebench_core::ComputeBackend;
use lifebench_core::ParallelEngine;
use std::path::Path;
use tracing::{debug, info};

/// Executor the parallel engine runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DeviceKind {
    /// Host emulation of the device.
    #[default]
    Emulated,
    /// CUDA device.
    Cuda,
}

/// Loads the engine configuration from a JSON file with `LIFEBENCH_*`
/// environment overrides applied on top. Without a file this is the
/// process-wide configuration.
pub fn load_engine_config(path: Option<&Path>) -> BenchResult<EngineConfig> {
    let Some(path) = path else {
        return Ok(engine_config().clone());
    };
    let text = std::fs::read_to_string(path)?;
    let config = serde_json::from_str::<EngineConfig>(&text)?;
    debug!(path = %path.display(), "loaded engine configuration");
    Ok(config.with_env_overrides())
}

/// Builds the parallel engine on the requested executor.
///
/// A CUDA engine that cannot be initialized is still returned; it reports
/// the initialization failure on its first call.
pub fn parallel_engine(kind: DeviceKind, config: EngineConfig) -> BenchResult<Box<dyn ComputeBackend>> {
    info!(device = ?kind, layout = config.layout.as_str(), "building parallel engine");
    let engine: Box<dyn ComputeBackend> = match kind {
        DeviceKind::Emulated => Box::new(ParallelEngine::emulated(config)?),
        DeviceKind::Cuda => cuda_engine(config),
    };
    Ok(engine)
}

#[cfg(feature = "cuda")]
fn cuda_engine(config: EngineConfig) -> Box<dyn ComputeBackend> {
    use lifebench_core::gpu::cuda::CudaExecutor;
    Box::new(ParallelEngine::<CudaExecutor>::cuda(config))
}

#[cfg(not(feature = "cuda"))]
fn cuda_engine(config: EngineConfig) -> Box<dyn ComputeBackend> {
    use lifebench_core::compute::EmulatedDevice;
    Box::new(ParallelEngine::<EmulatedDevice>::unavailable(
        &config,
        "lifebench was built without the `cuda` feature",
    ))
}
