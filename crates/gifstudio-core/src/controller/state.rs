//! Job state container and its transition functions.
//!
//! Every mutation of a [`ConversionJob`] goes through one of the methods here.
//! Each returns whether it changed anything, so the controller can feed them
//! straight into `watch::Sender::send_if_modified`. Submissions carry an
//! `epoch`; events from an older epoch (a late tick, a settlement after reset,
//! a delayed re-arm after a resubmit) are ignored.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::preview::{PreviewLocator, PreviewRegistry};

use super::transport::ConversionOutput;

/// Cosmetic progress never passes this before the response arrives.
pub const PROGRESS_CAP: f64 = 90.0;
pub const PROGRESS_DONE: f64 = 100.0;

const DEFAULT_ARTIFACT_MIME: &str = "image/gif";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Idle,
    Armed,
    Submitting,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Armed => "armed",
            JobState::Submitting => "submitting",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// The image returned by the service, plus its preview locator.
#[derive(Debug)]
pub struct Artifact {
    data: Bytes,
    mime: String,
    preview: PreviewLocator,
}

impl Artifact {
    pub fn new(registry: &Arc<PreviewRegistry>, output: ConversionOutput) -> Self {
        let mime = output
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ARTIFACT_MIME.to_string());
        let preview = registry.acquire(&mime, output.data.clone());
        Self {
            data: output.data,
            mime,
            preview,
        }
    }

    pub fn data(&self) -> Bytes {
        self.data.clone()
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn preview_uri(&self) -> String {
        self.preview.uri()
    }
}

/// One submission attempt's lifecycle.
#[derive(Debug, Default, Serialize)]
pub struct ConversionJob {
    state: JobState,
    progress: f64,
    #[serde(skip)]
    result_artifact: Option<Artifact>,
    error_detail: Option<String>,
    epoch: u64,
    /// Epoch of the request still on the wire. Survives reset until it returns.
    in_flight: Option<u64>,
}

/// Owned, serializable snapshot of a job for observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    pub progress: f64,
    pub error_detail: Option<String>,
    pub artifact_bytes: Option<u64>,
    pub artifact_preview: Option<String>,
}

impl ConversionJob {
    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// True while a network operation is outstanding, whatever the displayed state.
    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn result_artifact(&self) -> Option<&Artifact> {
        self.result_artifact.as_ref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn status(&self) -> JobStatus {
        JobStatus {
            state: self.state,
            progress: self.progress,
            error_detail: self.error_detail.clone(),
            artifact_bytes: self.result_artifact.as_ref().map(Artifact::size),
            artifact_preview: self.result_artifact.as_ref().map(Artifact::preview_uri),
        }
    }

    /// A new media source was staged. Ignored while a request is in flight.
    pub fn arm(&mut self) -> bool {
        if self.state == JobState::Submitting {
            return false;
        }
        self.state = JobState::Armed;
        self.progress = 0.0;
        self.result_artifact = None;
        self.error_detail = None;
        true
    }

    /// Enter Submitting and open a new epoch. `None` if a request is already
    /// in flight (even one orphaned by a reset) or nothing has been armed.
    pub fn begin_submit(&mut self) -> Option<u64> {
        if self.in_flight.is_some() {
            return None;
        }
        match self.state {
            JobState::Idle | JobState::Submitting => None,
            JobState::Armed | JobState::Succeeded | JobState::Failed => {
                self.epoch += 1;
                self.state = JobState::Submitting;
                self.progress = 0.0;
                self.result_artifact = None;
                self.error_detail = None;
                self.in_flight = Some(self.epoch);
                Some(self.epoch)
            }
        }
    }

    fn is_current(&self, epoch: u64, state: JobState) -> bool {
        self.epoch == epoch && self.state == state
    }

    /// Cosmetic increment. Never decreases and never passes `cap`.
    pub fn tick(&mut self, epoch: u64, step: f64, cap: f64) -> bool {
        if !self.is_current(epoch, JobState::Submitting) {
            return false;
        }
        let next = (self.progress + step.max(0.0)).min(cap).max(self.progress);
        if next == self.progress {
            return false;
        }
        self.progress = next;
        true
    }

    pub fn succeed(&mut self, epoch: u64, artifact: Artifact) -> bool {
        if !self.is_current(epoch, JobState::Submitting) {
            return false;
        }
        self.in_flight = None;
        self.state = JobState::Succeeded;
        self.progress = PROGRESS_DONE;
        self.result_artifact = Some(artifact);
        true
    }

    /// Progress is left wherever the simulation had it.
    pub fn fail(&mut self, epoch: u64, detail: String) -> bool {
        if !self.is_current(epoch, JobState::Submitting) {
            return false;
        }
        self.in_flight = None;
        self.state = JobState::Failed;
        self.error_detail = Some(detail);
        true
    }

    /// The request of `epoch` has returned, whether or not its outcome was
    /// applied. Frees the slot for the next submission.
    pub fn end_flight(&mut self, epoch: u64) -> bool {
        if self.in_flight != Some(epoch) {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Delayed return to Armed after a settlement. The artifact is retained
    /// for download until the next submit, stage or reset.
    pub fn rearm(&mut self, epoch: u64) -> bool {
        if self.epoch != epoch || !self.state.is_terminal() {
            return false;
        }
        self.state = JobState::Armed;
        self.progress = 0.0;
        self.error_detail = None;
        true
    }

    /// Back to Idle from anywhere. Drops the artifact (releasing its locator)
    /// and invalidates anything still pending from the current epoch. An
    /// outstanding request stays recorded until it returns.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.state = JobState::Idle;
        self.progress = 0.0;
        self.result_artifact = None;
        self.error_detail = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(bytes: &'static [u8]) -> ConversionOutput {
        ConversionOutput {
            data: Bytes::from_static(bytes),
            content_type: None,
        }
    }

    fn submitting() -> (ConversionJob, u64) {
        let mut job = ConversionJob::default();
        assert!(job.arm());
        let epoch = job.begin_submit().unwrap();
        (job, epoch)
    }

    #[test]
    fn starts_idle_and_cannot_submit() {
        let mut job = ConversionJob::default();
        assert_eq!(job.state(), JobState::Idle);
        assert!(job.begin_submit().is_none());
    }

    #[test]
    fn armed_to_submitting_to_succeeded() {
        let registry = PreviewRegistry::new();
        let (mut job, epoch) = submitting();
        assert_eq!(job.state(), JobState::Submitting);
        assert!(job.begin_submit().is_none(), "second submit must be refused");

        assert!(job.tick(epoch, 12.0, PROGRESS_CAP));
        assert!(job.succeed(epoch, Artifact::new(&registry, output(b"GIF89a"))));
        assert_eq!(job.state(), JobState::Succeeded);
        assert_eq!(job.progress(), PROGRESS_DONE);
        assert_eq!(job.result_artifact().unwrap().mime(), "image/gif");
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn tick_is_clamped_and_monotonic() {
        let (mut job, epoch) = submitting();
        for _ in 0..20 {
            job.tick(epoch, 14.9, PROGRESS_CAP);
            assert!(job.progress() <= PROGRESS_CAP);
        }
        assert_eq!(job.progress(), PROGRESS_CAP);
        assert!(!job.tick(epoch, 5.0, PROGRESS_CAP));
        assert!(!job.tick(epoch, -3.0, PROGRESS_CAP));
        assert_eq!(job.progress(), PROGRESS_CAP);
    }

    #[test]
    fn failure_keeps_simulated_progress() {
        let (mut job, epoch) = submitting();
        job.tick(epoch, 30.0, PROGRESS_CAP);
        assert!(job.fail(epoch, "HTTP 502".to_string()));
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(job.progress(), 30.0);
        assert_eq!(job.error_detail(), Some("HTTP 502"));
        assert!(job.result_artifact().is_none());
    }

    #[test]
    fn stale_epoch_events_are_ignored() {
        let registry = PreviewRegistry::new();
        let (mut job, epoch) = submitting();
        job.reset();
        assert!(!job.tick(epoch, 10.0, PROGRESS_CAP));
        assert!(!job.succeed(epoch, Artifact::new(&registry, output(b"x"))));
        assert!(!job.fail(epoch, "late".to_string()));
        assert_eq!(job.state(), JobState::Idle);
        assert_eq!(job.progress(), 0.0);
        assert_eq!(registry.live_count(), 0, "discarded artifact releases its locator");
    }

    #[test]
    fn rearm_only_for_matching_settled_epoch() {
        let (mut job, first) = submitting();
        job.fail(first, "boom".to_string());
        let second = job.begin_submit().unwrap();
        assert!(!job.rearm(first), "old timer must not clobber a new submission");
        assert_eq!(job.state(), JobState::Submitting);
        assert!(!job.rearm(second), "cannot re-arm while in flight");

        job.fail(second, "boom".to_string());
        assert!(job.rearm(second));
        assert_eq!(job.state(), JobState::Armed);
        assert_eq!(job.progress(), 0.0);
        assert!(job.error_detail().is_none());
    }

    #[test]
    fn artifact_survives_rearm_until_next_submit() {
        let registry = PreviewRegistry::new();
        let (mut job, epoch) = submitting();
        job.succeed(epoch, Artifact::new(&registry, output(b"GIF89a")));
        assert!(job.rearm(epoch));
        assert_eq!(job.status().artifact_bytes, Some(6));

        job.begin_submit().unwrap();
        assert!(job.result_artifact().is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn arm_is_refused_while_submitting() {
        let (mut job, _) = submitting();
        assert!(!job.arm());
        assert_eq!(job.state(), JobState::Submitting);
    }

    #[test]
    fn reset_from_every_state() {
        let registry = PreviewRegistry::new();
        for target in [
            JobState::Idle,
            JobState::Armed,
            JobState::Submitting,
            JobState::Succeeded,
            JobState::Failed,
        ] {
            let mut job = ConversionJob::default();
            if target != JobState::Idle {
                job.arm();
            }
            if matches!(target, JobState::Submitting | JobState::Succeeded | JobState::Failed) {
                let epoch = job.begin_submit().unwrap();
                match target {
                    JobState::Succeeded => {
                        job.succeed(epoch, Artifact::new(&registry, output(b"GIF")));
                    }
                    JobState::Failed => {
                        job.fail(epoch, "x".to_string());
                    }
                    _ => {}
                }
            }
            assert_eq!(job.state(), target);
            job.reset();
            let status = job.status();
            assert_eq!(status.state, JobState::Idle);
            assert_eq!(status.progress, 0.0);
            assert!(status.artifact_bytes.is_none());
            assert!(status.error_detail.is_none());
            assert_eq!(registry.live_count(), 0);
        }
    }

    #[test]
    fn status_serializes_with_lowercase_state() {
        let (job, _) = submitting();
        let json = serde_json::to_value(job.status()).unwrap();
        assert_eq!(json["state"], "submitting");
        assert_eq!(json["progress"], 0.0);
        let raw = serde_json::to_value(&job).unwrap();
        assert_eq!(raw["epoch"], 1);
        assert!(raw.get("result_artifact").is_none());
    }

    #[test]
    fn reset_does_not_free_the_in_flight_slot() {
        let (mut job, first) = submitting();
        job.reset();
        assert!(job.in_flight());
        assert!(job.arm());
        assert!(job.begin_submit().is_none(), "old request is still outstanding");
        assert_eq!(job.state(), JobState::Armed);

        assert!(!job.end_flight(first + 1), "only the outstanding epoch can end it");
        assert!(job.end_flight(first));
        assert!(!job.in_flight());
        assert!(job.begin_submit().is_some());
    }

    #[test]
    fn settlement_clears_in_flight() {
        let (mut job, epoch) = submitting();
        assert!(job.in_flight());
        job.fail(epoch, "x".to_string());
        assert!(!job.in_flight());
        assert!(!job.end_flight(epoch));
    }
}
