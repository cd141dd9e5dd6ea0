//! lifebench - times the sequential and parallel Game-of-Life engines.
//!
//! # Examples
//!
//! ```bash
//! # Full default sweep on the emulated device
//! lifebench
//!
//! # Quick run on CUDA, checking that both engines agree
//! lifebench --device cuda --sizes 64,256 --iterations 10,100 --trials 3 --verify
//!
//! # Row-table layout, JSON output
//! lifebench --layout rows --format json > results.json
//! ```

use clap::Parser;
use lifebench::experiment::{DEFAULT_ITERATIONS, DEFAULT_SIZES, DEFAULT_TRIALS};
use lifebench::report::format_row;
use lifebench::{
    load_engine_config, parallel_engine, BenchResult, DeviceKind, Experiment, ExperimentConfig,
    OutputFormat,
};
use lifebench_core::config::DeviceLayout;
use lifebench_core::SequentialEngine;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Compare sequential and parallel Game-of-Life engines
#[derive(Parser, Debug)]
#[command(name = "lifebench")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Grid side lengths (comma-separated)
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_SIZES)]
    sizes: Vec<usize>,

    /// Iteration counts (comma-separated)
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_ITERATIONS)]
    iterations: Vec<usize>,

    /// Trials per configuration
    #[arg(long, default_value_t = DEFAULT_TRIALS)]
    trials: usize,

    /// Seed for the random grids
    #[arg(long)]
    seed: Option<u64>,

    /// Device memory layout (flat, rows)
    #[arg(long)]
    layout: Option<DeviceLayout>,

    /// Executor of the parallel engine
    #[arg(long, value_enum, default_value_t = DeviceKind::Emulated)]
    device: DeviceKind,

    /// CUDA device ordinal
    #[arg(long)]
    ordinal: Option<usize>,

    /// Check that both engines return the same grid
    #[arg(long)]
    verify: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> BenchResult<()> {
    let mut engine_config = load_engine_config(cli.config.as_deref())?;
    if let Some(layout) = cli.layout {
        engine_config.layout = layout;
    }
    if let Some(ordinal) = cli.ordinal {
        engine_config.device_ordinal = ordinal;
    }

    let parallel = parallel_engine(cli.device, engine_config)?;
    let sequential = SequentialEngine::new();
    let experiment = Experiment::new(
        parallel.as_ref(),
        &sequential,
        ExperimentConfig {
            sizes: cli.sizes,
            iterations: cli.iterations,
            trials: cli.trials,
            seed: cli.seed,
            verify: cli.verify,
        },
    )?;

    let stdout = std::io::stdout();
    match cli.format {
        OutputFormat::Table => {
            let mut out = stdout.lock();
            writeln!(out, "{}", experiment.empty_report().header())?;
            experiment.run(|row| {
                writeln!(out, "{}", format_row(row))?;
                out.flush()?;
                Ok(())
            })?;
        }
        OutputFormat::Json => {
            let report = experiment.run(|_| Ok(()))?;
            report.write_to(OutputFormat::Json, &mut stdout.lock())?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
