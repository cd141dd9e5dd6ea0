//! Aggregation of timing samples.

use serde::Serialize;
use std::time::Duration;

/// Upper median of `samples`: element `n / 2` of the sorted samples.
///
/// Returns `None` for an empty slice.
pub fn median(samples: &[u64]) -> Option<u64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    Some(sorted[sorted.len() / 2])
}

/// Nanoseconds in `duration`, saturating at `u64::MAX`.
pub fn nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Timings of both backends in one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrialSample {
    /// Parallel backend, nanoseconds.
    pub parallel_ns: u64,
    /// Sequential backend, nanoseconds.
    pub sequential_ns: u64,
}

/// Median timings of both backends over a set of trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Measurement {
    /// Median of the parallel samples.
    pub parallel_ns: u64,
    /// Median of the sequential samples.
    pub sequential_ns: u64,
    /// Number of trials.
    pub trials: usize,
}

impl Measurement {
    /// Aggregates `samples`, taking each backend's median independently.
    pub fn from_samples(samples: &[TrialSample]) -> Option<Self> {
        let parallel: Vec<u64> = samples.iter().map(|s| s.parallel_ns).collect();
        let sequential: Vec<u64> = samples.iter().map(|s| s.sequential_ns).collect();
        Some(Self {
            parallel_ns: median(&parallel)?,
            sequential_ns: median(&sequential)?,
            trials: samples.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[5, 1, 3]), Some(3));
        // Even counts take the upper of the two middle values.
        assert_eq!(median(&[4, 1, 3, 2]), Some(3));
        assert_eq!(median(&[7]), Some(7));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_median_ignores_outliers() {
        assert_eq!(median(&[10, 11, 9, 10_000, 10]), Some(10));
    }

    #[test]
    fn test_backends_aggregate_independently() {
        let samples = [
            TrialSample { parallel_ns: 30, sequential_ns: 100 },
            TrialSample { parallel_ns: 10, sequential_ns: 300 },
            TrialSample { parallel_ns: 20, sequential_ns: 200 },
        ];
        let measurement = Measurement::from_samples(&samples).unwrap();
        assert_eq!(measurement.parallel_ns, 20);
        assert_eq!(measurement.sequential_ns, 200);
        assert_eq!(measurement.trials, 3);
        assert_eq!(Measurement::from_samples(&[]), None);
    }

    #[test]
    fn test_nanos_saturates() {
        assert_eq!(nanos(Duration::from_micros(3)), 3_000);
        assert_eq!(nanos(Duration::MAX), u64::MAX);
    }
}
