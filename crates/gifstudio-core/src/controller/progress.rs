//! Cosmetic progress: a timer task that nudges the displayed percentage while
//! the request is in flight. It knows nothing about the actual transfer.
//!
//! [`ProgressTicker`] is a scoped guard around the task. It is started right
//! before the network call and must be cancelled when the call settles; the
//! explicit `cancel` and the `Drop` impl share one idempotent stop path, so the
//! task is aborted exactly once whichever way the submission ends.

use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::config::ProgressConfig;

use super::state::{ConversionJob, PROGRESS_CAP};

/// Counts ticker starts and stops; `live` must be 0 whenever nothing is in flight.
#[derive(Debug, Default)]
pub struct TickerCounters {
    started: AtomicUsize,
    cancelled: AtomicUsize,
    live: AtomicUsize,
}

/// Point-in-time copy of [`TickerCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerStats {
    pub started: usize,
    pub cancelled: usize,
    pub live: usize,
}

impl TickerCounters {
    pub fn snapshot(&self) -> TickerStats {
        TickerStats {
            started: self.started.load(Ordering::SeqCst),
            cancelled: self.cancelled.load(Ordering::SeqCst),
            live: self.live.load(Ordering::SeqCst),
        }
    }
}

fn random_step(max_step: f64) -> f64 {
    if max_step <= 0.0 || !max_step.is_finite() {
        return 0.0;
    }
    rand::thread_rng().gen_range(0.0..max_step)
}

pub(crate) struct ProgressTicker {
    handle: JoinHandle<()>,
    counters: Arc<TickerCounters>,
    stopped: bool,
}

impl ProgressTicker {
    /// Spawn the ticker for submission `epoch`. The first increment lands one
    /// period after the start, not immediately.
    pub(crate) fn start(
        job: Arc<watch::Sender<ConversionJob>>,
        epoch: u64,
        timing: &ProgressConfig,
        counters: Arc<TickerCounters>,
    ) -> Self {
        let period = timing.tick();
        let max_step = timing.max_step;
        counters.started.fetch_add(1, Ordering::SeqCst);
        counters.live.fetch_add(1, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if job.borrow().epoch() != epoch {
                    break;
                }
                let step = random_step(max_step);
                job.send_if_modified(|j| j.tick(epoch, step, PROGRESS_CAP));
            }
        });

        Self {
            handle,
            counters,
            stopped: false,
        }
    }

    /// Stop the ticker on settlement.
    pub(crate) fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.handle.abort();
        self.counters.cancelled.fetch_add(1, Ordering::SeqCst);
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
