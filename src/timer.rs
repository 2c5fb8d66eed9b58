//! One timed streaming exchange.
//!
//! `StreamTimer` drives a single completion request and turns whatever
//! happens into exactly one [`RunSample`]. Failures never propagate:
//! they are categorized and folded into the sample, together with any
//! partial observations made before the failure.

use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::time::{timeout_at, Instant as TokioInstant};
use tracing::debug;

use crate::config::TargetConfig;
use crate::error::{BenchError, Result};
use crate::metrics::{RunError, RunSample};
use crate::provider::Provider;
use crate::sse::{Frame, FrameDecoder};

/// Drives and times single streaming exchanges over a shared client
#[derive(Clone)]
pub struct StreamTimer {
    client: reqwest::Client,
}

impl StreamTimer {
    /// The client is constructed once by the caller and reused across
    /// runs and targets.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Perform one exchange against the target and return its sample.
    ///
    /// The per-run timeout bounds the whole exchange: connect, first
    /// unit, and stream consumption all share one deadline.
    pub async fn run_once(&self, target: &TargetConfig) -> RunSample {
        let t0 = Instant::now();
        let deadline = TokioInstant::now() + Duration::from_secs(target.timeout_secs);

        let mut ttfu_secs: Option<f64> = None;
        let mut units: u64 = 0;

        let outcome = self
            .exchange(target, t0, deadline, &mut ttfu_secs, &mut units)
            .await;

        let elapsed_secs = t0.elapsed().as_secs_f64();
        let error = outcome.err().map(|e| RunError {
            kind: e.kind(),
            message: e.to_string(),
        });

        RunSample {
            ttfu_secs,
            elapsed_secs,
            units,
            error,
        }
    }

    /// The exchange proper. Observations are written through out-params
    /// so they survive an early return on failure.
    async fn exchange(
        &self,
        target: &TargetConfig,
        t0: Instant,
        deadline: TokioInstant,
        ttfu_secs: &mut Option<f64>,
        units: &mut u64,
    ) -> Result<()> {
        let secs = target.timeout_secs;
        let payload = target.provider.build_payload(&target.model, &target.prompt);

        let mut request = self.client.post(&target.endpoint).json(&payload);
        for (name, value) in target.provider.headers(&target.api_key) {
            request = request.header(name, value);
        }

        let response = timeout_at(deadline, request.send())
            .await
            .map_err(|_| BenchError::Timeout { secs })?
            .map_err(|e| BenchError::from_reqwest(e, secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BenchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let mut stream = response.bytes_stream();
        let mut decoder = FrameDecoder::new();

        loop {
            let next = timeout_at(deadline, stream.next())
                .await
                .map_err(|_| BenchError::Timeout { secs })?;

            let Some(chunk) = next else {
                // Connection closed. A final frame may lack its trailing
                // newline, so drain the decoder before judging the close.
                let (frames, feed_err) = decoder.finish();
                if absorb(target.provider, t0, frames, ttfu_secs, units) {
                    return Ok(());
                }
                if let Some(e) = feed_err {
                    return Err(e);
                }

                // No terminal frame. Content already counted stands; an
                // empty stream is abrupt termination.
                if *units == 0 {
                    return Err(BenchError::Protocol(
                        "stream closed before any content or terminal frame".to_string(),
                    ));
                }
                debug!(
                    target_name = %target.name,
                    units = *units,
                    "stream closed without terminal frame, keeping observed content"
                );
                return Ok(());
            };

            let chunk = chunk.map_err(|e| BenchError::from_reqwest(e, secs))?;

            // Frames decoded before a malformed one are counted first,
            // so partial observations survive the failure.
            let (frames, feed_err) = decoder.feed(&chunk);
            if absorb(target.provider, t0, frames, ttfu_secs, units) {
                return Ok(());
            }
            if let Some(e) = feed_err {
                return Err(e);
            }
        }
    }
}

/// Fold decoded frames into the running observations. Returns true when
/// a terminal frame was seen.
fn absorb(
    provider: Provider,
    t0: Instant,
    frames: Vec<Frame>,
    ttfu_secs: &mut Option<f64>,
    units: &mut u64,
) -> bool {
    for frame in frames {
        match frame {
            Frame::Done => return true,
            Frame::Data(json) => {
                if provider.is_terminal(&json) {
                    return true;
                }
                if provider.extract_delta(&json).is_some() {
                    if ttfu_secs.is_none() {
                        *ttfu_secs = Some(t0.elapsed().as_secs_f64());
                    }
                    *units += 1;
                }
            }
        }
    }
    false
}
