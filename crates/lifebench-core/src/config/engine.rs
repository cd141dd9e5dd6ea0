//! Engine configuration.
//!
//! Tile dimensions, the device cell budget, the device memory layout and
//! the kernel toolchain settings. Defaults are the benchmark setup
//! (16×16 tiles, at most 2048×2048 cells, flat layout, `nvcc`); every field
//! can be overridden programmatically through [`EngineConfigBuilder`] or
//! from `LIFEBENCH_*` environment variables.

use crate::core::error::{EngineError, Result};
use crate::core::validation::GridConstraints;
use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::str::FromStr;

/// Default tile width in cells (threads per block along x).
pub const DEFAULT_TILE_WIDTH: usize = 16;

/// Default tile height in cells (threads per block along y).
pub const DEFAULT_TILE_HEIGHT: usize = 16;

/// Default upper bound on the number of cells the device engine accepts.
pub const DEFAULT_MAX_CELLS: usize = 2048 * 2048;

/// Default external kernel compiler.
pub const DEFAULT_COMPILER: &str = "nvcc";

/// Kernel source shipped with the crate.
pub const DEFAULT_KERNEL_SOURCE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/kernels/life_step.cu");

/// How a grid is laid out in device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DeviceLayout {
    /// One allocation, `offset = row * stride + col`.
    #[default]
    Flat,
    /// One allocation per row plus a device table of row addresses.
    RowIndirect,
}

impl DeviceLayout {
    /// Short name used on the command line and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::RowIndirect => "rows",
        }
    }
}

impl FromStr for DeviceLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "rows" | "row-indirect" | "row_indirect" => Ok(Self::RowIndirect),
            other => Err(format!("unknown device layout '{}'", other)),
        }
    }
}

/// When a previously compiled kernel image may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ImageCachePolicy {
    /// Reuse any existing image without checking it against the source.
    #[default]
    ReuseExisting,
    /// Reuse only if the recorded source hash still matches.
    SourceHash,
}

impl FromStr for ImageCachePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reuse" | "reuse-existing" | "reuse_existing" => Ok(Self::ReuseExisting),
            "hash" | "source-hash" | "source_hash" => Ok(Self::SourceHash),
            other => Err(format!("unknown kernel cache policy '{}'", other)),
        }
    }
}

/// Kernel source and toolchain settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KernelConfig {
    /// CUDA source file; the image is cached next to it.
    pub source: PathBuf,
    /// Compiler executable.
    pub compiler: String,
    /// Extra arguments placed before the generated ones.
    pub compiler_args: Vec<String>,
    /// Image reuse policy.
    pub cache_policy: ImageCachePolicy,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from(DEFAULT_KERNEL_SOURCE),
            compiler: DEFAULT_COMPILER.to_string(),
            compiler_args: Vec::new(),
            cache_policy: ImageCachePolicy::default(),
        }
    }
}

/// Configuration of the device engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Tile width in cells.
    pub tile_width: usize,
    /// Tile height in cells.
    pub tile_height: usize,
    /// Largest accepted `width * height`.
    pub max_cells: usize,
    /// Device memory layout.
    pub layout: DeviceLayout,
    /// Device ordinal for the CUDA executor.
    pub device_ordinal: usize,
    /// Kernel toolchain.
    pub kernel: KernelConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_WIDTH,
            tile_height: DEFAULT_TILE_HEIGHT,
            max_cells: DEFAULT_MAX_CELLS,
            layout: DeviceLayout::default(),
            device_ordinal: 0,
            kernel: KernelConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies `LIFEBENCH_*` environment overrides.
    ///
    /// Unparseable values are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(value) = env_parse::<usize>("LIFEBENCH_TILE_WIDTH") {
            self.tile_width = value;
        }
        if let Some(value) = env_parse::<usize>("LIFEBENCH_TILE_HEIGHT") {
            self.tile_height = value;
        }
        if let Some(value) = env_parse::<usize>("LIFEBENCH_MAX_CELLS") {
            self.max_cells = value;
        }
        if let Some(value) = env_parse::<DeviceLayout>("LIFEBENCH_LAYOUT") {
            self.layout = value;
        }
        if let Some(value) = env_parse::<usize>("LIFEBENCH_DEVICE") {
            self.device_ordinal = value;
        }
        if let Some(value) = env_parse::<ImageCachePolicy>("LIFEBENCH_KERNEL_CACHE") {
            self.kernel.cache_policy = value;
        }
        if let Ok(value) = std::env::var("LIFEBENCH_KERNEL_SOURCE") {
            self.kernel.source = PathBuf::from(value);
        }
        if let Ok(value) = std::env::var("LIFEBENCH_NVCC") {
            self.kernel.compiler = value;
        }
        self
    }

    /// Checks that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(EngineError::backend_unavailable(format!(
                "tile dimensions must be positive, got {}x{}",
                self.tile_width, self.tile_height
            )));
        }
        if self.max_cells == 0 {
            return Err(EngineError::backend_unavailable(
                "max_cells must be positive",
            ));
        }
        Ok(())
    }

    /// Grid constraints enforced by the device engine.
    pub fn constraints(&self) -> GridConstraints {
        GridConstraints::tiled(self.tile_width, self.tile_height, self.max_cells)
    }
}

fn env_parse<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}

/// Process-wide configuration read from the environment on first use.
pub static ENGINE_CONFIG: Lazy<EngineConfig> = Lazy::new(EngineConfig::from_env);

/// Get the process-wide engine configuration.
pub fn engine_config() -> &'static EngineConfig {
    &ENGINE_CONFIG
}

/// Builder for creating a custom engine configuration.
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Set the tile dimensions.
    pub fn tile(mut self, width: usize, height: usize) -> Self {
        self.config.tile_width = width;
        self.config.tile_height = height;
        self
    }

    /// Set the maximum number of cells.
    pub fn max_cells(mut self, max_cells: usize) -> Self {
        self.config.max_cells = max_cells;
        self
    }

    /// Set the device memory layout.
    pub fn layout(mut self, layout: DeviceLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Set the CUDA device ordinal.
    pub fn device_ordinal(mut self, ordinal: usize) -> Self {
        self.config.device_ordinal = ordinal;
        self
    }

    /// Set the kernel source file.
    pub fn kernel_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.config.kernel.source = source.into();
        self
    }

    /// Set the kernel compiler executable and its extra arguments.
    pub fn compiler(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.config.kernel.compiler = program.into();
        self.config.kernel.compiler_args = args;
        self
    }

    /// Set the kernel image reuse policy.
    pub fn cache_policy(mut self, policy: ImageCachePolicy) -> Self {
        self.config.kernel.cache_policy = policy;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tile_width, 16);
        assert_eq!(config.tile_height, 16);
        assert_eq!(config.max_cells, 2048 * 2048);
        assert_eq!(config.layout, DeviceLayout::Flat);
        assert_eq!(config.kernel.cache_policy, ImageCachePolicy::ReuseExisting);
        assert!(config.kernel.source.ends_with("kernels/life_step.cu"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfigBuilder::new()
            .tile(8, 4)
            .max_cells(1024)
            .layout(DeviceLayout::RowIndirect)
            .compiler("clang", vec!["--cuda-gpu-arch=sm_80".to_string()])
            .cache_policy(ImageCachePolicy::SourceHash)
            .build();

        assert_eq!((config.tile_width, config.tile_height), (8, 4));
        assert_eq!(config.constraints(), GridConstraints::tiled(8, 4, 1024));
        assert_eq!(config.kernel.compiler, "clang");
        assert_eq!(config.kernel.compiler_args.len(), 1);
    }

    #[test]
    fn test_invalid_tile_is_rejected() {
        let config = EngineConfigBuilder::new().tile(0, 16).build();
        assert!(matches!(
            config.validate(),
            Err(EngineError::BackendUnavailable { .. })
        ));
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("flat".parse::<DeviceLayout>(), Ok(DeviceLayout::Flat));
        assert_eq!("ROWS".parse::<DeviceLayout>(), Ok(DeviceLayout::RowIndirect));
        assert!("tiles".parse::<DeviceLayout>().is_err());
        assert_eq!(
            "hash".parse::<ImageCachePolicy>(),
            Ok(ImageCachePolicy::SourceHash)
        );
        assert_eq!(DeviceLayout::RowIndirect.as_str(), "rows");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "layout": "row_indirect", "kernel": { "compiler": "nvcc-12" } }"#)
                .unwrap();
        assert_eq!(config.layout, DeviceLayout::RowIndirect);
        assert_eq!(config.kernel.compiler, "nvcc-12");
        assert_eq!(config.tile_width, DEFAULT_TILE_WIDTH);
    }
}
