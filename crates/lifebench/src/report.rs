//! Result table and JSON report.
//!
//! The table prints one row per configuration with every column
//! right-aligned in an 18-character field:
//!
//! ```text
//!               SIZE        ITERATIONS PARALLEL-EMULATED        SEQUENTIAL
//!                 16                10            183211             41520
//! ```

use crate::error::BenchResult;
use crate::stats::Measurement;
use serde::Serialize;
use std::io::Write;

/// Width of every table column.
pub const COLUMN_WIDTH: usize = 18;

/// Output format of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Fixed-width text table, printed row by row.
    #[default]
    Table,
    /// JSON document, printed once all rows are measured.
    Json,
}

/// One measured configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    /// Grid side length.
    pub size: usize,
    /// Generations per call.
    pub iterations: usize,
    /// Median timings.
    #[serde(flatten)]
    pub measurement: Measurement,
}

/// All rows of a run with the names of the compared backends.
///
/// Serializes as `{ parallel, sequential, rows: [..] }` with flat row objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Name of the parallel backend.
    pub parallel: String,
    /// Name of the sequential backend.
    pub sequential: String,
    /// Rows in measurement order.
    pub rows: Vec<ReportRow>,
}

impl Report {
    /// Empty report for the named backends.
    pub fn new(parallel: impl Into<String>, sequential: impl Into<String>) -> Self {
        Self {
            parallel: parallel.into(),
            sequential: sequential.into(),
            rows: Vec::new(),
        }
    }

    /// Header line of the table.
    pub fn header(&self) -> String {
        format!(
            "{:>w$}{:>w$}{:>w$}{:>w$}",
            "SIZE",
            "ITERATIONS",
            self.parallel.to_uppercase(),
            self.sequential.to_uppercase(),
            w = COLUMN_WIDTH
        )
    }

    /// Full table: header followed by every row.
    pub fn to_table(&self) -> String {
        let mut out = self.header();
        out.push('\n');
        for row in &self.rows {
            out.push_str(&format_row(row));
            out.push('\n');
        }
        out
    }

    /// Pretty-printed JSON document.
    pub fn to_json(&self) -> BenchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the report in `format`.
    pub fn write_to<W: Write>(&self, format: OutputFormat, out: &mut W) -> BenchResult<()> {
        match format {
            OutputFormat::Table => out.write_all(self.to_table().as_bytes())?,
            OutputFormat::Json => writeln!(out, "{}", self.to_json()?)?,
        }
        Ok(())
    }
}

/// One table line.
pub fn format_row(row: &ReportRow) -> String {
    format!(
        "{:>w$}{:>w$}{:>w$}{:>w$}",
        row.size,
        row.iterations,
        row.measurement.parallel_ns,
        row.measurement.sequential_ns,
        w = COLUMN_WIDTH
    )
}
