//! Error types for the Game-of-Life engines.
//!
//! Every failure an engine can report falls into one of three classes:
//! the caller handed in a grid the engine cannot process, the device
//! backend could not be brought up, or a device operation failed while a
//! call was in flight.

use std::fmt;
use thiserror::Error;

/// Device-side operation that produced a [`EngineError::DeviceExecution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceOp {
    /// Device memory allocation.
    Allocate,
    /// Host to device copy.
    HostToDevice,
    /// Device to host copy.
    DeviceToHost,
    /// Kernel launch.
    Launch,
    /// Waiting for the device to drain its queue.
    Synchronize,
}

impl fmt::Display for DeviceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Allocate => "allocation",
            Self::HostToDevice => "host-to-device copy",
            Self::DeviceToHost => "device-to-host copy",
            Self::Launch => "kernel launch",
            Self::Synchronize => "synchronization",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while evolving a grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The grid violates a shape or size constraint of the engine.
    ///
    /// Raised before any resource is acquired. The caller has to fix
    /// the input; engines never retry.
    #[error("Invalid grid: {reason}")]
    InvalidGrid {
        /// Description of the violated constraint
        reason: String,
    },

    /// The device, its context, or the kernel image could not be initialized.
    ///
    /// Once an engine is in this state every call fails with this error.
    #[error("Backend unavailable: {reason}")]
    BackendUnavailable {
        /// Underlying diagnostic
        reason: String,
    },

    /// A device operation failed in the middle of a call.
    ///
    /// All device memory acquired by the call has been released by the
    /// time this error reaches the caller.
    #[error("Device {operation} failed: {reason}")]
    DeviceExecution {
        /// Operation that failed
        operation: DeviceOp,
        /// Underlying diagnostic
        reason: String,
    },
}

impl EngineError {
    /// Create an InvalidGrid error with a custom reason.
    pub fn invalid_grid<S: Into<String>>(reason: S) -> Self {
        Self::InvalidGrid {
            reason: reason.into(),
        }
    }

    /// Create a BackendUnavailable error with a custom reason.
    pub fn backend_unavailable<S: Into<String>>(reason: S) -> Self {
        Self::BackendUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a DeviceExecution error for the given operation.
    pub fn device_execution<S: Into<String>>(operation: DeviceOp, reason: S) -> Self {
        Self::DeviceExecution {
            operation,
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's input.
    pub fn is_invalid_grid(&self) -> bool {
        matches!(self, Self::InvalidGrid { .. })
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = EngineError::invalid_grid("width must be positive");
        assert!(err.is_invalid_grid());
        assert_eq!(err.to_string(), "Invalid grid: width must be positive");

        let err = EngineError::backend_unavailable("no CUDA device");
        assert!(matches!(err, EngineError::BackendUnavailable { .. }));
        assert_eq!(err.to_string(), "Backend unavailable: no CUDA device");
    }

    #[test]
    fn test_device_error_carries_operation() {
        let err = EngineError::device_execution(DeviceOp::HostToDevice, "out of memory");
        assert!(!err.is_invalid_grid());
        assert_eq!(
            err.to_string(),
            "Device host-to-device copy failed: out of memory"
        );

        if let EngineError::DeviceExecution { operation, reason } = err {
            assert_eq!(operation, DeviceOp::HostToDevice);
            assert_eq!(reason, "out of memory");
        } else {
            panic!("Expected DeviceExecution variant");
        }
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            EngineError::invalid_grid("not tile aligned"),
            EngineError::backend_unavailable("nvcc exited with status 1"),
            EngineError::device_execution(DeviceOp::Allocate, "CUDA_ERROR_OUT_OF_MEMORY"),
            EngineError::device_execution(DeviceOp::Launch, "invalid configuration"),
            EngineError::device_execution(DeviceOp::Synchronize, "illegal address"),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
