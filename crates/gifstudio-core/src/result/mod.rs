//! Result handling: saving the produced GIF and resetting the session.

mod naming;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::controller::ConversionController;
use crate::intake::FileIntake;

pub use naming::{generated_name, resolve_name, sanitize_filename};

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("no converted GIF is available to download")]
    NoArtifact,
    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Delivers the artifact held by a [`ConversionController`].
#[derive(Debug, Clone)]
pub struct ResultHandler {
    default_dir: PathBuf,
}

impl Default for ResultHandler {
    fn default() -> Self {
        Self::new(PathBuf::from("."))
    }
}

impl ResultHandler {
    pub fn new(default_dir: impl Into<PathBuf>) -> Self {
        Self {
            default_dir: default_dir.into(),
        }
    }

    pub fn default_dir(&self) -> &Path {
        &self.default_dir
    }

    /// Preview URI of the current artifact, if any.
    pub fn artifact_preview(&self, controller: &ConversionController) -> Option<String> {
        controller.with_job(|j| j.result_artifact().map(|a| a.preview_uri()))
    }

    /// Save the artifact as `name` (or `gif-<millis>.gif`) under `dir`, or
    /// under the default directory when `dir` is None. Existing files are
    /// never overwritten; a numeric suffix is added instead.
    pub fn download(
        &self,
        controller: &ConversionController,
        dir: Option<&Path>,
        name: Option<&str>,
    ) -> Result<PathBuf, ResultError> {
        let data = controller
            .with_job(|j| j.result_artifact().map(|a| a.data()))
            .ok_or(ResultError::NoArtifact)?;

        let dir = dir.unwrap_or(&self.default_dir);
        fs::create_dir_all(dir).map_err(|source| ResultError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = unique_path(dir, &resolve_name(name));
        fs::write(&path, &data).map_err(|source| ResultError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), bytes = data.len(), "saved gif");
        Ok(path)
    }

    /// Clear the staged source and return the job to Idle. Both preview
    /// locators are released.
    pub fn reset(&self, intake: &mut FileIntake, controller: &ConversionController) {
        intake.clear();
        controller.reset();
        tracing::info!("session reset");
    }
}

fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1u32..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{}-{}.{}", stem, n, ext)),
            None => dir.join(format!("{}-{}", name, n)),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
