//! File intake: validates and stages the single local video to convert.
//!
//! At most one [`MediaSource`] is staged at a time. Accepting a new file drops
//! the previous source, which releases its preview locator. A rejected file
//! leaves the staged source alone but clears the input control so the same
//! file cannot be picked up again by accident.

mod probe;

use anyhow::{Context, Result};
use bytes::Bytes;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::preview::{PreviewLocator, PreviewRegistry};

pub use probe::probe_duration;

/// Largest file accepted for upload: 10 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const MIB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error(
        "file too large: please select a video under {} MiB (current: {} MiB); try a shorter video or lower quality",
        format_limit_mib(.max_bytes),
        format_size_mib(.size_bytes)
    )]
    TooLarge { size_bytes: u64, max_bytes: u64 },
}

fn format_limit_mib(bytes: &u64) -> String {
    let mib = *bytes as f64 / MIB;
    if mib.fract() == 0.0 {
        format!("{:.0}", mib)
    } else {
        format!("{:.1}", mib)
    }
}

fn format_size_mib(bytes: &u64) -> String {
    format!("{:.1}", *bytes as f64 / MIB)
}

/// A file offered for staging, from explicit selection or a drop gesture.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub mime: String,
    pub data: Bytes,
    /// Size on disk; equals `data.len()` unless the file was too large to read.
    len: u64,
}

impl CandidateFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            mime: mime.into(),
            len: data.len() as u64,
            data,
        }
    }

    /// Read a file from disk, inferring the mime type from its extension.
    ///
    /// Files over [`MAX_UPLOAD_BYTES`] are not read: the candidate carries
    /// only the on-disk size, so staging rejects it with the real figure.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        let mut data = Vec::new();
        if len <= MAX_UPLOAD_BYTES {
            file.take(MAX_UPLOAD_BYTES + 1)
                .read_to_end(&mut data)
                .with_context(|| format!("read {}", path.display()))?;
        }
        let len = len.max(data.len() as u64);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name,
            mime: mime_from_extension(&ext).to_string(),
            data: Bytes::from(data),
            len,
        })
    }

    pub fn size(&self) -> u64 {
        self.len
    }

    pub fn is_video(&self) -> bool {
        self.mime.starts_with("video/")
    }
}

/// Mime type for common video container extensions.
pub fn mime_from_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "ts" | "m2ts" => "video/mp2t",
        _ => "application/octet-stream",
    }
}

/// The currently staged video.
#[derive(Debug)]
pub struct MediaSource {
    name: String,
    mime: String,
    data: Bytes,
    preview: PreviewLocator,
    duration_sec: Option<f64>,
}

impl MediaSource {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Shared handle to the raw bytes (cheap clone).
    pub fn data(&self) -> Bytes {
        self.data.clone()
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn preview_uri(&self) -> String {
        self.preview.uri()
    }

    /// Playable duration in seconds, once metadata is known.
    pub fn duration_sec(&self) -> Option<f64> {
        self.duration_sec
    }
}

/// Stages and owns the single [`MediaSource`].
#[derive(Debug)]
pub struct FileIntake {
    registry: Arc<PreviewRegistry>,
    staged: Option<MediaSource>,
    input: Option<String>,
}

impl FileIntake {
    pub fn new(registry: Arc<PreviewRegistry>) -> Self {
        Self {
            registry,
            staged: None,
            input: None,
        }
    }

    /// Stage an explicitly selected file.
    pub fn stage(&mut self, file: CandidateFile) -> Result<&MediaSource, ValidationError> {
        let size = file.size();
        if size > MAX_UPLOAD_BYTES {
            self.input = None;
            tracing::warn!(name = %file.name, size, "rejected oversized file");
            return Err(ValidationError::TooLarge {
                size_bytes: size,
                max_bytes: MAX_UPLOAD_BYTES,
            });
        }

        // Release the old locator before acquiring the new one.
        self.staged = None;
        let preview = self.registry.acquire(&file.mime, file.data.clone());
        tracing::info!(name = %file.name, mime = %file.mime, size, "staged video");
        self.input = Some(file.name.clone());
        let source = self.staged.insert(MediaSource {
            name: file.name,
            mime: file.mime,
            data: file.data,
            preview,
            duration_sec: None,
        });
        Ok(&*source)
    }

    /// Stage a dropped file. Non-video drops are ignored without error.
    pub fn stage_dropped(
        &mut self,
        file: CandidateFile,
    ) -> Result<Option<&MediaSource>, ValidationError> {
        if !file.is_video() {
            tracing::debug!(name = %file.name, mime = %file.mime, "ignored non-video drop");
            return Ok(None);
        }
        self.stage(file).map(Some)
    }

    /// Record the media duration once known. Returns false if nothing is staged.
    pub fn on_metadata_available(&mut self, duration_sec: f64) -> bool {
        match self.staged.as_mut() {
            Some(source) => {
                source.duration_sec = Some(duration_sec.max(0.0));
                true
            }
            None => false,
        }
    }

    pub fn staged(&self) -> Option<&MediaSource> {
        self.staged.as_ref()
    }

    /// Name currently held by the file input control, if any.
    pub fn input_value(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// Release the staged source and clear the input control.
    pub fn clear(&mut self) {
        if let Some(source) = self.staged.take() {
            tracing::debug!(name = %source.name, "released staged video");
        }
        self.input = None;
    }
}
