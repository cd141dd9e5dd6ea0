//! Error types for the benchmark driver.

use lifebench_core::EngineError;
use thiserror::Error;

/// Driver result type alias.
pub type BenchResult<T> = Result<T, BenchError>;

/// Benchmark driver error type.
#[derive(Error, Debug)]
pub enum BenchError {
    /// An engine rejected the grid or failed on the device.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// IO error while reading configuration or writing the report.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON configuration or report serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backends produced different grids.
    #[error("Backends disagree on a {size}x{size} grid after {iterations} iterations")]
    Mismatch {
        /// Grid side length.
        size: usize,
        /// Iteration count.
        iterations: usize,
    },

    /// Invalid experiment parameters.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BenchError {
    /// Create a configuration error.
    pub fn config<S: Into<String>>(reason: S) -> Self {
        Self::Config(reason.into())
    }
}
