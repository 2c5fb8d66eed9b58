//! Sequential run execution for one target.

use tracing::{info, warn};

use crate::config::TargetConfig;
use crate::metrics::RunSample;
use crate::timer::StreamTimer;

/// Executes N independent timed runs against one target
pub struct RunExecutor {
    timer: StreamTimer,
}

impl RunExecutor {
    pub fn new(timer: StreamTimer) -> Self {
        Self { timer }
    }

    /// Run the target's configured number of exchanges, strictly one
    /// after another, and return every sample in run order. A failing
    /// run never aborts the loop.
    pub async fn run(&self, target: &TargetConfig) -> Vec<RunSample> {
        let mut samples = Vec::with_capacity(target.runs as usize);

        for i in 0..target.runs {
            let sample = self.timer.run_once(target).await;

            match &sample.error {
                None => info!(
                    "run {}/{}: ttfu = {}, {} units over {:.2}s",
                    i + 1,
                    target.runs,
                    sample
                        .ttfu_secs
                        .map(|t| format!("{:.3}s", t))
                        .unwrap_or_else(|| "n/a".to_string()),
                    sample.units,
                    sample.elapsed_secs
                ),
                Some(err) => warn!(
                    "run {}/{} failed ({}): {}",
                    i + 1,
                    target.runs,
                    err.kind,
                    err.message
                ),
            }

            samples.push(sample);
        }

        samples
    }
}
