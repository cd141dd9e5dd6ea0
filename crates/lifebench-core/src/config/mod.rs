//! Configuration for the engines.

pub mod engine;

// Re-export key items
pub use engine::{
    engine_config, DeviceLayout, EngineConfig, EngineConfigBuilder, ImageCachePolicy,
    KernelConfig, DEFAULT_MAX_CELLS, DEFAULT_TILE_HEIGHT, DEFAULT_TILE_WIDTH,
};
