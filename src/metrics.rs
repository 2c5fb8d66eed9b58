//! Per-run timing samples and their reduction into summary statistics.

use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Runs shorter than this are excluded from the throughput mean to
/// avoid division blow-up; they still count as successful runs.
const MIN_ELAPSED_SECS: f64 = 1e-6;

/// Failure detail attached to a failed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    pub kind: FailureKind,
    pub message: String,
}

/// Result of one timed streaming exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSample {
    /// Seconds from request start to the first non-empty content delta,
    /// absent if no content ever arrived
    pub ttfu_secs: Option<f64>,
    /// Seconds from request start to stream termination (or failure)
    pub elapsed_secs: f64,
    /// Content deltas observed; a proxy for tokens, not tokenizer output
    pub units: u64,
    /// Present iff the run failed
    pub error: Option<RunError>,
}

impl RunSample {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Per-run throughput in units/second, if the run lasted long
    /// enough to divide by
    pub fn throughput(&self) -> Option<f64> {
        if self.elapsed_secs < MIN_ELAPSED_SECS {
            None
        } else {
            Some(self.units as f64 / self.elapsed_secs)
        }
    }
}

/// Distribution summary over one metric's samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub p90: f64,
    pub p99: f64,
    pub std_dev: f64,
}

impl Stats {
    /// Compute summary statistics; all zeros for an empty slice.
    pub fn from_samples(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                avg: 0.0,
                min: 0.0,
                max: 0.0,
                median: 0.0,
                p90: 0.0,
                p99: 0.0,
                std_dev: 0.0,
            };
        }

        let mut sorted = data.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = sorted.len();
        let avg = sorted.iter().sum::<f64>() / n as f64;
        let std_dev = if n >= 2 {
            let var = sorted.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / (n - 1) as f64;
            var.sqrt()
        } else {
            0.0
        };

        Self {
            avg,
            min: sorted[0],
            max: sorted[n - 1],
            median: percentile(&sorted, 50.0),
            p90: percentile(&sorted, 90.0),
            p99: percentile(&sorted, 99.0),
            std_dev,
        }
    }
}

/// Linear-interpolation percentile over a sorted slice
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let k = (n - 1) as f64 * (pct / 100.0);
    let f = k.floor() as usize;
    let c = k.ceil() as usize;
    if f == c {
        sorted[f]
    } else {
        sorted[f] * (c as f64 - k) + sorted[c] * (k - f as f64)
    }
}

/// Summary metrics for one target, derived from its successful runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    /// Mean time-to-first-unit over successful runs, seconds
    pub mean_ttft_secs: f64,
    /// Mean over runs of (units / elapsed), units per second
    pub mean_throughput: f64,
    pub successful_runs: usize,
    pub failed_runs: usize,
    pub ttft_stats: Stats,
    pub throughput_stats: Stats,
    /// Total exchange duration over successful runs, seconds
    pub response_time_stats: Stats,
}

/// Reduce a run's samples into aggregate metrics.
///
/// Pure function of its input. Returns `None` when no run succeeded;
/// the caller reports the target as fully failed instead of emitting
/// zero-valued metrics.
pub fn aggregate(samples: &[RunSample]) -> Option<AggregateMetrics> {
    let successful: Vec<&RunSample> = samples.iter().filter(|s| s.is_success()).collect();
    let failed_runs = samples.len() - successful.len();

    if successful.is_empty() {
        return None;
    }

    let ttft: Vec<f64> = successful.iter().filter_map(|s| s.ttfu_secs).collect();
    let throughput: Vec<f64> = successful.iter().filter_map(|s| s.throughput()).collect();
    let elapsed: Vec<f64> = successful.iter().map(|s| s.elapsed_secs).collect();

    let mean = |v: &[f64]| {
        if v.is_empty() {
            0.0
        } else {
            v.iter().sum::<f64>() / v.len() as f64
        }
    };

    Some(AggregateMetrics {
        mean_ttft_secs: mean(&ttft),
        mean_throughput: mean(&throughput),
        successful_runs: successful.len(),
        failed_runs,
        ttft_stats: Stats::from_samples(&ttft),
        throughput_stats: Stats::from_samples(&throughput),
        response_time_stats: Stats::from_samples(&elapsed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ok_run(ttfu: f64, elapsed: f64, units: u64) -> RunSample {
        RunSample {
            ttfu_secs: Some(ttfu),
            elapsed_secs: elapsed,
            units,
            error: None,
        }
    }

    fn failed_run(kind: FailureKind) -> RunSample {
        RunSample {
            ttfu_secs: None,
            elapsed_secs: 0.5,
            units: 0,
            error: Some(RunError {
                kind,
                message: "boom".to_string(),
            }),
        }
    }

    #[test]
    fn test_uniform_runs() {
        // 3 runs, 5 units over 1.0s each, ttfu 0.2s
        let samples = vec![
            ok_run(0.2, 1.0, 5),
            ok_run(0.2, 1.0, 5),
            ok_run(0.2, 1.0, 5),
        ];

        let m = aggregate(&samples).unwrap();
        assert!((m.mean_ttft_secs - 0.2).abs() < 1e-9);
        assert!((m.mean_throughput - 5.0).abs() < 1e-9);
        assert_eq!(m.successful_runs, 3);
        assert_eq!(m.failed_runs, 0);
    }

    #[test]
    fn test_partial_failure() {
        // 2 succeed (4 units / 0.8s, ttfu 0.1s), 1 times out
        let samples = vec![
            ok_run(0.1, 0.8, 4),
            failed_run(FailureKind::Timeout),
            ok_run(0.1, 0.8, 4),
        ];

        let m = aggregate(&samples).unwrap();
        assert_eq!(m.successful_runs, 2);
        assert_eq!(m.failed_runs, 1);
        assert!((m.mean_ttft_secs - 0.1).abs() < 1e-9);
        assert!((m.mean_throughput - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_failed_yields_none() {
        let samples = vec![
            failed_run(FailureKind::Network),
            failed_run(FailureKind::HttpStatus),
        ];
        assert!(aggregate(&samples).is_none());
    }

    #[test]
    fn test_empty_yields_none() {
        assert!(aggregate(&[]).is_none());
    }

    #[test]
    fn test_zero_elapsed_excluded_from_throughput_but_counted() {
        let samples = vec![ok_run(0.1, 0.0, 3), ok_run(0.2, 1.0, 10)];

        let m = aggregate(&samples).unwrap();
        assert_eq!(m.successful_runs, 2);
        // Only the 1.0s run feeds the throughput mean
        assert!((m.mean_throughput - 10.0).abs() < 1e-9);
        // But both feed the latency mean
        assert!((m.mean_ttft_secs - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_elapsed_gives_zero_throughput() {
        let samples = vec![ok_run(0.1, 0.0, 3)];
        let m = aggregate(&samples).unwrap();
        assert_eq!(m.successful_runs, 1);
        assert_eq!(m.mean_throughput, 0.0);
    }

    #[test]
    fn test_response_time_stats_over_successful_runs_only() {
        let samples = vec![
            ok_run(0.1, 1.0, 5),
            failed_run(FailureKind::Timeout),
            ok_run(0.2, 3.0, 5),
        ];

        let m = aggregate(&samples).unwrap();
        assert!((m.response_time_stats.avg - 2.0).abs() < 1e-9);
        assert_eq!(m.response_time_stats.min, 1.0);
        assert_eq!(m.response_time_stats.max, 3.0);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let samples = vec![
            ok_run(0.3, 2.0, 17),
            failed_run(FailureKind::Protocol),
            ok_run(0.5, 1.5, 9),
        ];
        assert_eq!(aggregate(&samples), aggregate(&samples));
    }

    #[test]
    fn test_stats_interpolated_percentiles() {
        let s = Stats::from_samples(&[1.0, 2.0, 3.0, 4.0]);
        assert!((s.avg - 2.5).abs() < 1e-9);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert!((s.median - 2.5).abs() < 1e-9);
        // k = 2.7 between 3.0 and 4.0
        assert!((s.p90 - 3.7).abs() < 1e-9);
    }

    #[test]
    fn test_stats_single_sample() {
        let s = Stats::from_samples(&[0.42]);
        assert_eq!(s.avg, 0.42);
        assert_eq!(s.median, 0.42);
        assert_eq!(s.p99, 0.42);
        assert_eq!(s.std_dev, 0.0);
    }

    #[test]
    fn test_stats_empty() {
        let s = Stats::from_samples(&[]);
        assert_eq!(s.avg, 0.0);
        assert_eq!(s.max, 0.0);
    }

    proptest! {
        #[test]
        fn prop_aggregate_pure(ttfus in proptest::collection::vec(0.0f64..10.0, 0..16),
                               fail_mask in proptest::collection::vec(any::<bool>(), 0..16)) {
            let samples: Vec<RunSample> = ttfus
                .iter()
                .zip(fail_mask.iter().chain(std::iter::repeat(&false)))
                .map(|(&t, &failed)| {
                    if failed {
                        failed_run(FailureKind::Network)
                    } else {
                        ok_run(t, t + 1.0, 7)
                    }
                })
                .collect();

            // Pure function of its input
            prop_assert_eq!(aggregate(&samples), aggregate(&samples));

            // Metrics exist iff at least one run succeeded
            let any_success = samples.iter().any(|s| s.is_success());
            prop_assert_eq!(aggregate(&samples).is_some(), any_success);
        }
    }
}
