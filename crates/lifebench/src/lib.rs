//! Benchmark driver comparing the sequential and parallel Game-of-Life
//! engines.
//!
//! The driver sweeps a matrix of iteration counts and square grid sizes,
//! times both engines on the same random grid for a number of trials, and
//! reports the median time of each engine per configuration.
//!
//! # Modules
//!
//! - [`engines`]: executor selection and engine configuration loading
//! - [`experiment`]: trials and the sweep
//! - [`stats`]: median aggregation
//! - [`report`]: table and JSON output
//! - [`error`]: driver error type

pub mod engines;
pub mod error;
pub mod experiment;
pub mod report;
pub mod stats;

pub use engines::{load_engine_config, parallel_engine, DeviceKind};
pub use error::{BenchError, BenchResult};
pub use experiment::{random_grid, run_trial, Experiment, ExperimentConfig};
pub use report::{OutputFormat, Report, ReportRow};
pub use stats::{median, Measurement, TrialSample};
