//! [`Studio`]: one editing session wiring intake, settings, conversion and
//! result handling together.
//!
//! Components never call each other directly. Cross-component effects
//! (staging arms the job, metadata seeds the trim window, reset clears both
//! the intake and the job) happen here.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{ProgressConfig, StudioConfig};
use crate::controller::{
    ConversionController, ConversionJob, ConversionTransport, CurlTransport, JobState, JobStatus,
};
use crate::intake::{CandidateFile, FileIntake, MediaSource, ValidationError};
use crate::preview::PreviewRegistry;
use crate::result::{ResultError, ResultHandler};
use crate::settings::{EncodeSettings, QualityPreset, SettingField, SettingsError, SettingsManager};

pub struct Studio {
    registry: Arc<PreviewRegistry>,
    intake: FileIntake,
    settings: SettingsManager,
    controller: ConversionController,
    results: ResultHandler,
}

impl Studio {
    pub fn new(transport: Arc<dyn ConversionTransport>, timing: ProgressConfig) -> Self {
        let registry = PreviewRegistry::new();
        Self {
            intake: FileIntake::new(Arc::clone(&registry)),
            settings: SettingsManager::new(),
            controller: ConversionController::new(transport, Arc::clone(&registry), timing),
            results: ResultHandler::default(),
            registry,
        }
    }

    /// Session talking to the configured endpoint over libcurl.
    pub fn from_config(cfg: &StudioConfig) -> Result<Self> {
        let endpoint = cfg.endpoint_url()?;
        let transport = CurlTransport::new(endpoint.as_str()).with_timeout(cfg.request_timeout());
        tracing::debug!(endpoint = %endpoint, timeout = ?cfg.request_timeout(), "studio transport");
        let mut studio = Self::new(Arc::new(transport), cfg.progress());
        if let Some(dir) = &cfg.download_dir {
            studio.results = ResultHandler::new(dir.clone());
        }
        Ok(studio)
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results = ResultHandler::new(dir);
        self
    }

    /// Stage an explicitly selected file and arm the job.
    pub fn stage(&mut self, file: CandidateFile) -> Result<&MediaSource, ValidationError> {
        let controller = &self.controller;
        let source = self.intake.stage(file)?;
        controller.arm();
        Ok(source)
    }

    /// Drop-gesture staging; non-video drops are ignored.
    pub fn stage_dropped(
        &mut self,
        file: CandidateFile,
    ) -> Result<Option<&MediaSource>, ValidationError> {
        let controller = &self.controller;
        let staged = self.intake.stage_dropped(file)?;
        if staged.is_some() {
            controller.arm();
        }
        Ok(staged)
    }

    /// Media duration became known: record it and seed the trim window.
    pub fn on_metadata_available(&mut self, duration_sec: f64) {
        if self.intake.on_metadata_available(duration_sec) {
            self.settings.apply_default_trim(duration_sec);
        }
    }

    pub fn apply_preset(&mut self, preset: QualityPreset) {
        self.settings.apply_preset(preset);
    }

    pub fn set_field(&mut self, field: SettingField, raw: &str) -> Result<(), SettingsError> {
        self.settings.set_field(field, raw)
    }

    pub fn set_loop(&mut self, flag: bool) {
        self.settings.set_loop(flag);
    }

    pub fn settings(&self) -> &EncodeSettings {
        self.settings.settings()
    }

    pub fn settings_manager(&self) -> &SettingsManager {
        &self.settings
    }

    pub fn staged(&self) -> Option<&MediaSource> {
        self.intake.staged()
    }

    pub fn input_value(&self) -> Option<&str> {
        self.intake.input_value()
    }

    /// Submit the staged media with the current settings. `None` when the
    /// submission is refused (nothing staged, or already in flight).
    pub fn submit(&self) -> Option<JoinHandle<JobState>> {
        self.controller
            .submit(self.intake.staged(), self.settings.settings())
    }

    pub fn state(&self) -> JobState {
        self.controller.state()
    }

    pub fn status(&self) -> JobStatus {
        self.controller.status()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConversionJob> {
        self.controller.subscribe()
    }

    pub fn artifact_preview(&self) -> Option<String> {
        self.results.artifact_preview(&self.controller)
    }

    pub fn download(&self, dir: Option<&Path>, name: Option<&str>) -> Result<PathBuf, ResultError> {
        self.results.download(&self.controller, dir, name)
    }

    /// Any state → Idle, with no staged media and no live preview locator.
    pub fn reset(&mut self) {
        self.results.reset(&mut self.intake, &self.controller);
    }

    pub fn controller(&self) -> &ConversionController {
        &self.controller
    }

    pub fn registry(&self) -> &Arc<PreviewRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ConversionOutput, ConversionRequest, NetworkError, PROGRESS_DONE};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::time::Duration;

    const MIB: usize = 1024 * 1024;

    struct SlowTransport(Duration);

    #[async_trait]
    impl ConversionTransport for SlowTransport {
        async fn convert(&self, _req: ConversionRequest) -> Result<ConversionOutput, NetworkError> {
            tokio::time::sleep(self.0).await;
            Ok(ConversionOutput {
                data: Bytes::from_static(b"GIF89a"),
                content_type: None,
            })
        }
    }

    fn studio() -> Studio {
        Studio::new(
            Arc::new(SlowTransport(Duration::from_secs(2))),
            ProgressConfig::default(),
        )
    }

    fn mp4(name: &str, size: usize) -> CandidateFile {
        CandidateFile::new(name, "video/mp4", vec![0u8; size])
    }

    #[test]
    fn staging_arms_the_job() {
        let mut s = studio();
        assert_eq!(s.state(), JobState::Idle);
        let source = s.stage(mp4("a.mp4", 5 * MIB)).unwrap();
        assert_eq!(source.size(), 5 * MIB as u64);
        assert_eq!(s.state(), JobState::Armed);
        assert_eq!(s.input_value(), Some("a.mp4"));
    }

    #[test]
    fn oversized_file_leaves_session_unchanged() {
        let mut s = studio();
        s.stage(mp4("a.mp4", 5 * MIB)).unwrap();
        let err = s.stage(mp4("big.mp4", 15 * MIB)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("15.0") && msg.contains("10"), "{msg}");
        assert_eq!(s.staged().unwrap().name(), "a.mp4");
        assert_eq!(s.state(), JobState::Armed);
        assert!(s.input_value().is_none());
        assert_eq!(s.registry().live_count(), 1);
    }

    #[test]
    fn non_video_drop_is_ignored() {
        let mut s = studio();
        let dropped = s
            .stage_dropped(CandidateFile::new("notes.txt", "text/plain", b"hi".to_vec()))
            .unwrap();
        assert!(dropped.is_none());
        assert_eq!(s.state(), JobState::Idle);
        assert!(s.staged().is_none());
    }

    #[test]
    fn metadata_seeds_trim_window() {
        let mut s = studio();
        s.on_metadata_available(42.0);
        assert_eq!(s.settings().duration_sec, 0.0, "nothing staged yet");

        s.stage(mp4("a.mp4", MIB)).unwrap();
        s.on_metadata_available(4.5);
        assert_eq!(s.staged().unwrap().duration_sec(), Some(4.5));
        assert_eq!(s.settings().duration_sec, 4.5);

        s.on_metadata_available(42.0);
        assert_eq!(s.settings().duration_sec, 10.0);
    }

    #[test]
    fn preset_then_override_is_custom() {
        let mut s = studio();
        s.apply_preset(QualityPreset::High);
        assert_eq!((s.settings().fps, s.settings().scale), (24, 720));
        assert_eq!(s.settings().quality, QualityPreset::High);
        assert!(!s.settings_manager().is_custom());

        s.set_field(SettingField::Fps, "12").unwrap();
        assert_eq!(s.settings().quality, QualityPreset::High);
        assert!(s.settings_manager().is_custom());
    }

    #[tokio::test(start_paused = true)]
    async fn full_cycle_then_reset() {
        let mut s = studio();
        s.stage(mp4("a.mp4", 5 * MIB)).unwrap();
        assert_eq!(s.submit().unwrap().await.unwrap(), JobState::Succeeded);
        assert_eq!(s.status().progress, PROGRESS_DONE);
        assert!(s.artifact_preview().is_some());
        assert_eq!(s.registry().live_count(), 2);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(s.state(), JobState::Armed);
        assert!(s.artifact_preview().is_some(), "artifact kept for download");

        s.reset();
        assert_eq!(s.state(), JobState::Idle);
        assert!(s.staged().is_none());
        assert_eq!(s.registry().live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_from_every_state_releases_all_locators() {
        // Idle
        let mut s = studio();
        s.reset();
        assert_eq!(s.registry().live_count(), 0);

        // Armed
        let mut s = studio();
        s.stage(mp4("a.mp4", MIB)).unwrap();
        s.reset();
        assert_eq!((s.state(), s.registry().live_count()), (JobState::Idle, 0));

        // Submitting
        let mut s = studio();
        s.stage(mp4("a.mp4", MIB)).unwrap();
        let handle = s.submit().unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        s.reset();
        assert_eq!((s.state(), s.registry().live_count()), (JobState::Idle, 0));
        assert_eq!(handle.await.unwrap(), JobState::Idle);
        assert_eq!(s.registry().live_count(), 0);

        // Succeeded
        let mut s = studio();
        s.stage(mp4("a.mp4", MIB)).unwrap();
        s.submit().unwrap().await.unwrap();
        assert_eq!(s.state(), JobState::Succeeded);
        s.reset();
        assert_eq!((s.state(), s.registry().live_count()), (JobState::Idle, 0));
        assert_eq!(s.status().progress, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn restaging_while_submitting_keeps_job_in_flight() {
        let mut s = studio();
        s.stage(mp4("a.mp4", MIB)).unwrap();
        let handle = s.submit().unwrap();
        s.stage(mp4("b.mp4", 2 * MIB)).unwrap();
        assert_eq!(s.state(), JobState::Submitting);
        assert_eq!(s.staged().unwrap().name(), "b.mp4");
        assert_eq!(handle.await.unwrap(), JobState::Succeeded);
    }

    #[test]
    fn from_config_rejects_bad_endpoint() {
        let cfg = StudioConfig {
            endpoint: "ftp://example.com/gif".to_string(),
            ..StudioConfig::default()
        };
        assert!(Studio::from_config(&cfg).is_err());
        assert!(Studio::from_config(&StudioConfig::default()).is_ok());
    }
}
