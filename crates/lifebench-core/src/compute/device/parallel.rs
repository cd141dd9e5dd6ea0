//! Tiled device engine.

use super::{DeviceBufferSet, DeviceContext, DeviceExecutor, EmulatedDevice, LaunchShape};
use crate::{
    compute::backend::ComputeBackend,
    config::{DeviceLayout, EngineConfig},
    core::{
        error::{EngineError, Result},
        grid::Grid,
        validation::GridConstraints,
    },
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

enum EngineState<E: DeviceExecutor> {
    Ready(Arc<DeviceContext<E>>),
    Unavailable(String),
}

/// Engine evolving a grid on a device, one thread per cell.
///
/// The engine is built either from a ready [`DeviceContext`] or from the
/// reason the context could not be created. In the latter case every call
/// fails with [`EngineError::BackendUnavailable`] without touching the
/// device.
///
/// Calls on one engine are serialized; concurrent callers block until the
/// previous call has released its buffers.
///
/// # Example
///
/// ```
/// use lifebench_core::prelude::*;
///
/// let engine = ParallelEngine::emulated(EngineConfig::default()).unwrap();
/// let grid = Grid::new(32, 32);
/// let next = engine.evolve(&grid, 10).unwrap();
/// assert_eq!(next, grid);
/// ```
pub struct ParallelEngine<E: DeviceExecutor> {
    state: EngineState<E>,
    constraints: GridConstraints,
    tile: (usize, usize),
    layout: DeviceLayout,
    in_flight: Mutex<()>,
    name: String,
}

impl<E: DeviceExecutor> ParallelEngine<E> {
    /// Creates an engine on a ready device context.
    pub fn new(context: Arc<DeviceContext<E>>) -> Self {
        let config = context.config();
        let name = format!("parallel-{}", context.executor().name());
        Self {
            constraints: config.constraints(),
            tile: (config.tile_width, config.tile_height),
            layout: config.layout,
            state: EngineState::Ready(context),
            in_flight: Mutex::new(()),
            name,
        }
    }

    /// Creates an engine that reports `reason` on every call.
    ///
    /// The tile constraints of `config` are only enforced if `config` itself
    /// is valid; otherwise just the non-empty check remains.
    pub fn unavailable(config: &EngineConfig, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(%reason, "parallel engine unavailable");
        let constraints = match config.validate() {
            Ok(()) => config.constraints(),
            Err(_) => GridConstraints::universal(),
        };
        Self {
            state: EngineState::Unavailable(reason),
            constraints,
            tile: (config.tile_width, config.tile_height),
            layout: config.layout,
            in_flight: Mutex::new(()),
            name: "parallel".to_string(),
        }
    }

    /// Creates an engine from the outcome of context initialization.
    pub fn from_initialization(
        config: &EngineConfig,
        initialized: Result<Arc<DeviceContext<E>>>,
    ) -> Self {
        match initialized {
            Ok(context) => Self::new(context),
            Err(e) => Self::unavailable(config, e.to_string()),
        }
    }

    /// Whether the device context is ready.
    pub fn is_available(&self) -> bool {
        matches!(self.state, EngineState::Ready(_))
    }

    /// The shared device context, if ready.
    pub fn context(&self) -> Option<&Arc<DeviceContext<E>>> {
        match &self.state {
            EngineState::Ready(context) => Some(context),
            EngineState::Unavailable(_) => None,
        }
    }

    /// Device memory layout used for each call.
    pub fn layout(&self) -> DeviceLayout {
        self.layout
    }

    fn ready_context(&self) -> Result<&Arc<DeviceContext<E>>> {
        match &self.state {
            EngineState::Ready(context) => Ok(context),
            EngineState::Unavailable(reason) => Err(EngineError::backend_unavailable(reason.clone())),
        }
    }
}

impl ParallelEngine<EmulatedDevice> {
    /// Creates an engine on a fresh [`EmulatedDevice`].
    pub fn emulated(config: EngineConfig) -> Result<Self> {
        Self::on_emulated(EmulatedDevice::new(), config)
    }

    /// Creates an engine on `device`. Clones of `device` share its memory
    /// and counters, so a caller can keep one to inspect them.
    pub fn on_emulated(device: EmulatedDevice, config: EngineConfig) -> Result<Self> {
        let context = DeviceContext::new(device, config)?;
        Ok(Self::new(Arc::new(context)))
    }
}

impl<E: DeviceExecutor> fmt::Debug for ParallelEngine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ParallelEngine");
        s.field("name", &self.name)
            .field("tile", &self.tile)
            .field("layout", &self.layout);
        match &self.state {
            EngineState::Ready(context) => s.field("context", context),
            EngineState::Unavailable(reason) => s.field("unavailable", reason),
        };
        s.finish()
    }
}

impl<E: DeviceExecutor> ComputeBackend for ParallelEngine<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn constraints(&self) -> GridConstraints {
        self.constraints
    }

    fn evolve(&self, grid: &Grid, iterations: usize) -> Result<Grid> {
        self.validate(grid)?;
        let context = self.ready_context()?;
        let executor = context.executor();

        let _guard = self.in_flight.lock();
        let (width, height) = (grid.width(), grid.height());
        let shape = LaunchShape::for_grid(width, height, self.tile.0, self.tile.1);
        debug!(
            width,
            height,
            iterations,
            blocks = shape.blocks(),
            layout = self.layout.as_str(),
            "parallel evolve"
        );

        let mut buffers = DeviceBufferSet::upload(executor, grid, self.layout)?;
        for generation in 0..iterations {
            executor.launch_step(&shape, buffers.step_args()?)?;
            executor.synchronize()?;
            buffers.swap();
            trace!(generation = generation + 1, "generation complete");
        }

        buffers.download(executor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::cpu::SequentialEngine;
    use crate::config::EngineConfigBuilder;
    use pretty_assertions::assert_eq;

    fn small_tiles() -> EngineConfig {
        EngineConfigBuilder::new().tile(4, 4).build()
    }

    fn glider_8x8() -> Grid {
        Grid::with_live_cells(8, 8, &[(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)]).unwrap()
    }

    #[test]
    fn test_matches_sequential_flat() {
        let engine = ParallelEngine::emulated(small_tiles()).unwrap();
        let grid = glider_8x8();
        for iterations in [0, 1, 4, 17] {
            assert_eq!(
                engine.evolve(&grid, iterations).unwrap(),
                SequentialEngine::new().evolve(&grid, iterations).unwrap()
            );
        }
    }

    #[test]
    fn test_matches_sequential_rows() {
        let config = EngineConfigBuilder::new()
            .tile(4, 2)
            .layout(DeviceLayout::RowIndirect)
            .build();
        let engine = ParallelEngine::emulated(config).unwrap();
        assert_eq!(engine.layout(), DeviceLayout::RowIndirect);

        let grid = glider_8x8();
        assert_eq!(
            engine.evolve(&grid, 9).unwrap(),
            SequentialEngine::new().evolve(&grid, 9).unwrap()
        );
    }

    #[test]
    fn test_rejects_unaligned_grid() {
        let engine = ParallelEngine::emulated(small_tiles()).unwrap();
        let err = engine.evolve(&Grid::new(6, 8), 1).unwrap_err();
        assert!(err.is_invalid_grid());
    }

    #[test]
    fn test_rejects_oversized_grid() {
        let config = EngineConfigBuilder::new().tile(4, 4).max_cells(32).build();
        let engine = ParallelEngine::emulated(config).unwrap();
        assert!(engine.evolve(&Grid::new(8, 8), 1).unwrap_err().is_invalid_grid());
    }

    #[test]
    fn test_unavailable_engine_fails_fast() {
        let engine: ParallelEngine<EmulatedDevice> =
            ParallelEngine::unavailable(&EngineConfig::default(), "no device");
        assert!(!engine.is_available());
        assert!(engine.context().is_none());

        let err = engine.evolve(&Grid::new(16, 16), 1).unwrap_err();
        assert_eq!(err, EngineError::backend_unavailable("no device"));
    }

    #[test]
    fn test_validation_precedes_availability() {
        let engine: ParallelEngine<EmulatedDevice> =
            ParallelEngine::unavailable(&EngineConfig::default(), "no device");
        assert!(engine.evolve(&Grid::new(0, 0), 1).unwrap_err().is_invalid_grid());
    }

    #[test]
    fn test_from_failed_initialization() {
        let config = EngineConfig::default();
        let engine: ParallelEngine<EmulatedDevice> = ParallelEngine::from_initialization(
            &config,
            Err(EngineError::backend_unavailable("driver missing")),
        );
        let err = engine.evolve(&Grid::new(16, 16), 1).unwrap_err();
        assert!(err.to_string().contains("driver missing"));
    }

    #[test]
    fn test_failed_initialization_with_invalid_config() {
        for config in [
            EngineConfigBuilder::new().tile(0, 16).build(),
            EngineConfigBuilder::new().max_cells(0).build(),
        ] {
            let initialized = DeviceContext::new(EmulatedDevice::new(), config.clone()).map(Arc::new);
            assert!(initialized.is_err());

            let engine = ParallelEngine::from_initialization(&config, initialized);
            let err = engine.evolve(&Grid::new(16, 16), 1).unwrap_err();
            assert!(matches!(err, EngineError::BackendUnavailable { .. }), "{:?}", err);
            assert!(engine.evolve(&Grid::new(0, 16), 1).unwrap_err().is_invalid_grid());
        }
    }

    #[test]
    fn test_name_includes_executor() {
        let engine = ParallelEngine::emulated(EngineConfig::default()).unwrap();
        assert_eq!(engine.name(), "parallel-emulated");
        assert!(format!("{:?}", engine).contains("ParallelEngine"));
    }
}
