//! CUDA executor.

use super::kernels::{self, FLAT_ENTRY, MODULE_NAME, ROWS_ENTRY};
use crate::compute::device::{DeviceContext, DeviceExecutor, LaunchShape, ParallelEngine, StepArgs};
use crate::config::EngineConfig;
use crate::core::error::{DeviceOp, EngineError, Result};
use cudarc::driver::{CudaDevice, CudaFunction, CudaSlice, DevicePtr, LaunchAsync, LaunchConfig};
use cudarc::nvrtc::Ptx;
use std::sync::Arc;
use tracing::info;

/// Executor launching the step kernels on a CUDA device.
pub struct CudaExecutor {
    device: Arc<CudaDevice>,
    flat: CudaFunction,
    rows: CudaFunction,
}

impl CudaExecutor {
    /// Opens the configured device and loads the kernel image, compiling it
    /// first if needed.
    pub fn initialize(config: &EngineConfig) -> Result<Self> {
        let image = kernels::prepare_image(&config.kernel)?;

        let device = CudaDevice::new(config.device_ordinal).map_err(|e| {
            EngineError::backend_unavailable(format!(
                "cannot open CUDA device {}: {}",
                config.device_ordinal, e
            ))
        })?;

        device
            .load_ptx(Ptx::from_file(&image), MODULE_NAME, &[FLAT_ENTRY, ROWS_ENTRY])
            .map_err(|e| {
                EngineError::backend_unavailable(format!(
                    "cannot load kernel image {}: {}",
                    image.display(),
                    e
                ))
            })?;

        let function = |entry: &str| {
            device.get_func(MODULE_NAME, entry).ok_or_else(|| {
                EngineError::backend_unavailable(format!("kernel entry point {} missing", entry))
            })
        };
        let flat = function(FLAT_ENTRY)?;
        let rows = function(ROWS_ENTRY)?;

        info!(
            ordinal = config.device_ordinal,
            image = %image.display(),
            "CUDA device initialized"
        );
        Ok(Self { device, flat, rows })
    }
}

impl std::fmt::Debug for CudaExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaExecutor")
            .field("ordinal", &self.device.ordinal())
            .finish()
    }
}

fn dimension(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        EngineError::device_execution(DeviceOp::Launch, format!("dimension {} exceeds kernel range", value))
    })
}

impl DeviceExecutor for CudaExecutor {
    type Buffer = CudaSlice<u8>;

    fn name(&self) -> &str {
        "cuda"
    }

    fn alloc(&self, len: usize) -> Result<Self::Buffer> {
        self.device
            .alloc_zeros::<u8>(len)
            .map_err(|e| EngineError::device_execution(DeviceOp::Allocate, e.to_string()))
    }

    fn upload(&self, src: &[u8], dst: &mut Self::Buffer) -> Result<()> {
        if src.len() > dst.len() {
            return Err(EngineError::device_execution(
                DeviceOp::HostToDevice,
                format!("copy of {} bytes overflows {}-byte allocation", src.len(), dst.len()),
            ));
        }
        let mut target = dst.slice_mut(0..src.len());
        self.device
            .htod_sync_copy_into(src, &mut target)
            .map_err(|e| EngineError::device_execution(DeviceOp::HostToDevice, e.to_string()))
    }

    fn download(&self, src: &Self::Buffer, dst: &mut [u8]) -> Result<()> {
        if dst.len() > src.len() {
            return Err(EngineError::device_execution(
                DeviceOp::DeviceToHost,
                format!("copy of {} bytes reads past {}-byte allocation", dst.len(), src.len()),
            ));
        }
        self.device
            .dtoh_sync_copy_into(&src.slice(0..dst.len()), dst)
            .map_err(|e| EngineError::device_execution(DeviceOp::DeviceToHost, e.to_string()))
    }

    fn address_of(&self, buffer: &Self::Buffer) -> u64 {
        *buffer.device_ptr()
    }

    #[allow(unsafe_code)]
    fn launch_step(&self, shape: &LaunchShape, args: StepArgs<'_, Self::Buffer>) -> Result<()> {
        let cfg = LaunchConfig {
            grid_dim: shape.grid_dim,
            block_dim: shape.block_dim,
            shared_mem_bytes: 0,
        };

        // SAFETY: argument order and types match the kernel signatures in
        // kernels/life_step.cu, and every buffer covers `height` rows of
        // `stride` (flat) or `width` (rows) bytes.
        let launched = match args {
            StepArgs::Flat {
                src,
                dst,
                width,
                height,
                stride,
            } => {
                let params = (src, dst, dimension(width)?, dimension(height)?, dimension(stride)?);
                unsafe { self.flat.clone().launch(cfg, params) }
            }
            StepArgs::RowIndirect {
                src_rows,
                dst_rows,
                width,
                height,
            } => {
                let params = (src_rows, dst_rows, dimension(width)?, dimension(height)?);
                unsafe { self.rows.clone().launch(cfg, params) }
            }
        };

        launched.map_err(|e| EngineError::device_execution(DeviceOp::Launch, e.to_string()))
    }

    fn synchronize(&self) -> Result<()> {
        self.device
            .synchronize()
            .map_err(|e| EngineError::device_execution(DeviceOp::Synchronize, e.to_string()))
    }
}

impl ParallelEngine<CudaExecutor> {
    /// Creates an engine on the configured CUDA device.
    ///
    /// Initialization failures do not abort: the engine is returned in the
    /// unavailable state and reports the failure on every call.
    pub fn cuda(config: EngineConfig) -> Self {
        let initialized = CudaExecutor::initialize(&config)
            .and_then(|executor| DeviceContext::new(executor, config.clone()))
            .map(Arc::new);
        Self::from_initialization(&config, initialized)
    }
}
