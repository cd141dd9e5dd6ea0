//! Timing experiments.
//!
//! For every `(iterations, size)` pair the experiment runs a number of
//! trials. Each trial draws a fresh random square grid, evolves it with the
//! parallel backend and then with the sequential backend, and records both
//! wall-clock durations. A configuration is reported as the median of its
//! trials for each backend.

use crate::error::{BenchError, BenchResult};
use crate::report::{Report, ReportRow};
use crate::stats::{nanos, Measurement, TrialSample};
use lifebench_core::{ComputeBackend, Grid};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Distribution};
use std::time::Instant;
use tracing::{debug, info};

/// Grid side lengths swept by default.
pub const DEFAULT_SIZES: [usize; 8] = [16, 32, 64, 128, 256, 512, 1024, 2048];

/// Iteration counts swept by default.
pub const DEFAULT_ITERATIONS: [usize; 7] = [10, 50, 100, 500, 1000, 5000, 10000];

/// Trials per configuration by default.
pub const DEFAULT_TRIALS: usize = 10;

/// Parameters of a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentConfig {
    /// Grid side lengths, swept in the inner loop.
    pub sizes: Vec<usize>,
    /// Iteration counts, swept in the outer loop.
    pub iterations: Vec<usize>,
    /// Trials per configuration.
    pub trials: usize,
    /// Seed of the grid generator; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Compare the two results of every trial.
    pub verify: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            sizes: DEFAULT_SIZES.to_vec(),
            iterations: DEFAULT_ITERATIONS.to_vec(),
            trials: DEFAULT_TRIALS,
            seed: None,
            verify: false,
        }
    }
}

impl ExperimentConfig {
    /// Checks that the sweep is non-empty.
    pub fn validate(&self) -> BenchResult<()> {
        if self.trials == 0 {
            return Err(BenchError::config("at least one trial is required"));
        }
        if self.sizes.is_empty() || self.iterations.is_empty() {
            return Err(BenchError::config("sizes and iterations must not be empty"));
        }
        if self.sizes.contains(&0) {
            return Err(BenchError::config("grid sizes must be positive"));
        }
        Ok(())
    }
}

/// Square grid of side `size` with every cell alive with probability 1/2.
pub fn random_grid<R: Rng + ?Sized>(size: usize, rng: &mut R) -> BenchResult<Grid> {
    let coin = Bernoulli::new(0.5).map_err(|e| BenchError::config(e.to_string()))?;
    let cells: Vec<u8> = (0..size * size).map(|_| u8::from(coin.sample(rng))).collect();
    Ok(Grid::from_row_major(size, size, &cells)?)
}

/// Times one evolution of `grid` on each backend, parallel first.
///
/// With `verify`, fails with [`BenchError::Mismatch`] if the results differ.
pub fn run_trial(
    parallel: &dyn ComputeBackend,
    sequential: &dyn ComputeBackend,
    grid: &Grid,
    iterations: usize,
    verify: bool,
) -> BenchResult<TrialSample> {
    let start = Instant::now();
    let parallel_result = parallel.evolve(grid, iterations)?;
    let parallel_ns = nanos(start.elapsed());

    let start = Instant::now();
    let sequential_result = sequential.evolve(grid, iterations)?;
    let sequential_ns = nanos(start.elapsed());

    if verify && parallel_result != sequential_result {
        return Err(BenchError::Mismatch {
            size: grid.width(),
            iterations,
        });
    }

    Ok(TrialSample {
        parallel_ns,
        sequential_ns,
    })
}

/// A sweep over two backends.
#[derive(Debug)]
pub struct Experiment<'a> {
    parallel: &'a dyn ComputeBackend,
    sequential: &'a dyn ComputeBackend,
    config: ExperimentConfig,
}

impl<'a> Experiment<'a> {
    /// Creates an experiment comparing `parallel` against `sequential`.
    pub fn new(
        parallel: &'a dyn ComputeBackend,
        sequential: &'a dyn ComputeBackend,
        config: ExperimentConfig,
    ) -> BenchResult<Self> {
        config.validate()?;
        Ok(Self {
            parallel,
            sequential,
            config,
        })
    }

    /// The sweep parameters.
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Empty report labelled with the backend names.
    pub fn empty_report(&self) -> Report {
        Report::new(self.parallel.name(), self.sequential.name())
    }

    /// Measures one configuration over the configured number of trials.
    pub fn measure<R: Rng + ?Sized>(
        &self,
        size: usize,
        iterations: usize,
        rng: &mut R,
    ) -> BenchResult<Measurement> {
        let samples = (0..self.config.trials)
            .map(|_| {
                let grid = random_grid(size, &mut *rng)?;
                run_trial(self.parallel, self.sequential, &grid, iterations, self.config.verify)
            })
            .collect::<BenchResult<Vec<_>>>()?;

        Measurement::from_samples(&samples)
            .ok_or_else(|| BenchError::config("at least one trial is required"))
    }

    /// Runs the full sweep, calling `on_row` as each row completes.
    pub fn run<F>(&self, mut on_row: F) -> BenchResult<Report>
    where
        F: FnMut(&ReportRow) -> BenchResult<()>,
    {
        let mut rng = match self.config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        info!(
            parallel = self.parallel.name(),
            sequential = self.sequential.name(),
            configurations = self.config.sizes.len() * self.config.iterations.len(),
            trials = self.config.trials,
            "starting sweep"
        );

        let mut report = self.empty_report();
        for &iterations in &self.config.iterations {
            for &size in &self.config.sizes {
                let measurement = self.measure(size, iterations, &mut rng)?;
                debug!(size, iterations, ?measurement, "configuration measured");

                let row = ReportRow {
                    size,
                    iterations,
                    measurement,
                };
                on_row(&row)?;
                report.rows.push(row);
            }
        }
        Ok(report)
    }
}
