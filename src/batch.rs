//! Sequential multi-target orchestration.
//!
//! Targets are processed strictly one after another; a target's runs
//! and aggregation complete before the next target starts, so batch
//! wall-clock time is the simple sum. One bad target never prevents
//! reporting on the others.

use tracing::{info, warn};

use crate::config::TargetConfig;
use crate::error::{BenchError, Result};
use crate::metrics::aggregate;
use crate::report::{BatchResult, BenchmarkReport};
use crate::runner::RunExecutor;
use crate::timer::StreamTimer;

/// Produces one BenchmarkReport per configured target
pub struct BatchComparator {
    timer: StreamTimer,
}

impl BatchComparator {
    pub fn new(timer: StreamTimer) -> Self {
        Self { timer }
    }

    /// Benchmark every target in configuration order.
    ///
    /// Per-target failures (invalid config, every run failed) fold into
    /// failed reports. An empty target list is the one error surfaced
    /// to the caller, since there is nothing to report.
    pub async fn run(&self, targets: &[TargetConfig]) -> Result<BatchResult> {
        if targets.is_empty() {
            return Err(BenchError::Config(
                "no targets configured".to_string(),
            ));
        }

        let executor = RunExecutor::new(self.timer.clone());
        let mut reports = Vec::with_capacity(targets.len());

        for target in targets {
            info!(
                "benchmarking '{}': model {} at {} ({} runs)",
                target.name, target.model, target.endpoint, target.runs
            );

            let report = match target.validate() {
                Err(e) => {
                    warn!("skipping runs for '{}': {}", target.name, e);
                    BenchmarkReport::failed(target, e.to_string())
                }
                Ok(()) => {
                    let samples = executor.run(target).await;
                    match aggregate(&samples) {
                        Some(metrics) => BenchmarkReport::from_metrics(target, metrics),
                        None => {
                            let summary = samples
                                .iter()
                                .filter_map(|s| s.error.as_ref())
                                .map(|e| format!("{}: {}", e.kind, e.message))
                                .next()
                                .unwrap_or_else(|| "no runs executed".to_string());
                            warn!("all runs failed for '{}': {}", target.name, summary);
                            BenchmarkReport::failed(
                                target,
                                format!("all {} runs failed ({})", samples.len(), summary),
                            )
                        }
                    }
                }
            };

            reports.push(report);
        }

        Ok(BatchResult::new(reports))
    }
}
