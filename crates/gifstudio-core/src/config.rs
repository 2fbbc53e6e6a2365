use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Conversion service used when the config file does not override it.
pub const DEFAULT_ENDPOINT: &str = "https://ffmpeg-gif-backend.onrender.com/gif";

/// Timing of the cosmetic progress indicator (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Interval between cosmetic progress increments, in milliseconds.
    pub tick_ms: u64,
    /// Upper bound (exclusive) of one random increment, in percent.
    pub max_step: f64,
    /// Delay after settlement before progress drops back to 0, in milliseconds.
    pub settle_reset_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            tick_ms: 500,
            max_step: 15.0,
            settle_reset_ms: 1000,
        }
    }
}

impl ProgressConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn settle_reset(&self) -> Duration {
        Duration::from_millis(self.settle_reset_ms)
    }
}

/// Global configuration loaded from `~/.config/gifstudio/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Full URL of the remote `POST /gif` operation.
    pub endpoint: String,
    /// Where downloads land when no directory is given (None = current directory).
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    /// Whole-request timeout in seconds. None (the default) means no timeout.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Optional progress timing; if missing, built-in defaults are used.
    #[serde(default)]
    pub progress: Option<ProgressConfig>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            download_dir: None,
            request_timeout_secs: None,
            progress: None,
        }
    }
}

impl StudioConfig {
    /// Parsed endpoint; only http and https are accepted.
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint)
            .with_context(|| format!("invalid endpoint {:?}", self.endpoint))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => anyhow::bail!("endpoint scheme {:?} is not http(s)", other),
        }
    }

    pub fn progress(&self) -> ProgressConfig {
        self.progress.clone().unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("gifstudio")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<StudioConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = StudioConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg: StudioConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
