//! Conversion controller: the submit → cosmetic progress → result/error lifecycle.
//!
//! The job lives in a `tokio::sync::watch` channel. All mutations are short
//! `send_if_modified` calls that never hold the lock across an await, and
//! observers (a progress bar, tests) subscribe for changes instead of polling.
//!
//! `submit` spawns one task per accepted submission:
//!
//! 1. start the [`ProgressTicker`](progress::ProgressTicker),
//! 2. await the transport,
//! 3. cancel the ticker, settle to Succeeded or Failed,
//! 4. schedule the delayed return to Armed.
//!
//! There is no way to abort an in-flight request and no default timeout.

mod progress;
mod state;
mod transport;


use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ProgressConfig;
use crate::intake::MediaSource;
use crate::preview::PreviewRegistry;
use crate::settings::EncodeSettings;

use progress::ProgressTicker;

pub use progress::{TickerCounters, TickerStats};
pub use state::{Artifact, ConversionJob, JobState, JobStatus, PROGRESS_CAP, PROGRESS_DONE};
pub use transport::{
    post_form, ConversionOutput, ConversionRequest, ConversionTransport, CurlTransport,
    NetworkError,
};

fn current_state(job: &watch::Sender<ConversionJob>) -> JobState {
    job.borrow().state()
}

/// Frees the in-flight slot when the submission task ends, on every exit path.
struct FlightGuard {
    job: Arc<watch::Sender<ConversionJob>>,
    epoch: u64,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let epoch = self.epoch;
        self.job.send_if_modified(|j| j.end_flight(epoch));
    }
}

pub struct ConversionController {
    job: Arc<watch::Sender<ConversionJob>>,
    transport: Arc<dyn ConversionTransport>,
    registry: Arc<PreviewRegistry>,
    timing: ProgressConfig,
    tickers: Arc<TickerCounters>,
}

impl ConversionController {
    pub fn new(
        transport: Arc<dyn ConversionTransport>,
        registry: Arc<PreviewRegistry>,
        timing: ProgressConfig,
    ) -> Self {
        let (tx, _rx) = watch::channel(ConversionJob::default());
        Self {
            job: Arc::new(tx),
            transport,
            registry,
            timing,
            tickers: Arc::new(TickerCounters::default()),
        }
    }

    /// Idle → Armed (or re-arm after a new stage). Refused while submitting.
    pub fn arm(&self) -> bool {
        let armed = self.job.send_if_modified(|j| j.arm());
        if !armed {
            tracing::debug!("new source staged while a request is in flight; job left submitting");
        }
        armed
    }

    /// Start a conversion of `media` with a snapshot of `settings`.
    ///
    /// Returns `None` (and does nothing) when no media is staged or a request
    /// is already in flight, including one left over from before a reset.
    /// Otherwise returns the handle of the submission task, which resolves to
    /// the settled state; the return to Armed happens `settle_reset_ms` later.
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        media: Option<&MediaSource>,
        settings: &EncodeSettings,
    ) -> Option<JoinHandle<JobState>> {
        let Some(media) = media else {
            tracing::debug!("submit ignored: no staged media");
            return None;
        };
        let request = ConversionRequest::new(media, settings);

        let mut opened = None;
        self.job.send_if_modified(|j| {
            opened = j.begin_submit();
            opened.is_some()
        });
        let Some(epoch) = opened else {
            tracing::debug!(state = self.state().as_str(), "submit ignored");
            return None;
        };

        tracing::info!(
            epoch,
            name = %request.file_name,
            bytes = request.video.len(),
            fps = request.fps,
            scale = request.scale,
            start = request.start_time_sec,
            duration = request.duration_sec,
            "submitting conversion"
        );

        let job = Arc::clone(&self.job);
        let transport = Arc::clone(&self.transport);
        let registry = Arc::clone(&self.registry);
        let tickers = Arc::clone(&self.tickers);
        let timing = self.timing.clone();

        Some(tokio::spawn(async move {
            let _flight = FlightGuard {
                job: Arc::clone(&job),
                epoch,
            };
            let ticker = ProgressTicker::start(Arc::clone(&job), epoch, &timing, tickers);
            let outcome = transport.convert(request).await;
            ticker.cancel();

            let settled = match outcome {
                Ok(output) => {
                    let bytes = output.data.len();
                    let applied =
                        job.send_if_modified(|j| j.succeed(epoch, Artifact::new(&registry, output)));
                    if applied {
                        tracing::info!(epoch, bytes, "conversion succeeded");
                    }
                    applied
                }
                Err(err) => {
                    tracing::warn!(epoch, error = %err, "conversion failed");
                    job.send_if_modified(|j| j.fail(epoch, err.to_string()))
                }
            };

            if !settled {
                tracing::debug!(epoch, "outcome discarded: job was reset while in flight");
                return current_state(&job);
            }

            let delay = timing.settle_reset();
            let rearm_job = Arc::clone(&job);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                rearm_job.send_if_modified(|j| j.rearm(epoch));
            });

            current_state(&job)
        }))
    }

    pub fn state(&self) -> JobState {
        self.job.borrow().state()
    }

    pub fn status(&self) -> JobStatus {
        self.job.borrow().status()
    }

    /// Receiver that is notified on every job change.
    pub fn subscribe(&self) -> watch::Receiver<ConversionJob> {
        self.job.subscribe()
    }

    /// Run `f` against the current job without cloning it.
    pub fn with_job<R>(&self, f: impl FnOnce(&ConversionJob) -> R) -> R {
        f(&self.job.borrow())
    }

    /// Any state → Idle. Drops the artifact and its preview locator. A request
    /// already on the wire still blocks new submissions until it returns.
    pub fn reset(&self) {
        self.job.send_modify(|j| j.reset());
    }

    pub fn ticker_stats(&self) -> TickerStats {
        self.tickers.snapshot()
    }
}
