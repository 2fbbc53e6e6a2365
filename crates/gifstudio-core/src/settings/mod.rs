//! Encode settings with preset selection and manual overrides.
//!
//! The preset tag records the last preset chosen. Editing `fps` or `scale` by
//! hand afterwards does not touch the tag, so the two can disagree; callers
//! that care can ask [`SettingsManager::is_custom`].

mod preset;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use preset::{PresetValues, QualityPreset};

/// Largest default trim window applied when media metadata arrives.
pub const DEFAULT_TRIM_SECS: f64 = 10.0;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("unknown quality preset {0:?} (expected low, medium, high or ultra)")]
    UnknownPreset(String),
    #[error("unknown setting {0:?} (expected fps, scale, start or duration)")]
    UnknownField(String),
    #[error("invalid value {value:?} for {field}")]
    InvalidValue { field: SettingField, value: String },
}

/// Parameters forwarded to the conversion service (plus the dead loop flag).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub fps: u32,
    /// Target output width in pixels.
    pub scale: u32,
    pub quality: QualityPreset,
    pub start_time_sec: f64,
    /// 0 means "until the end of the clip".
    pub duration_sec: f64,
    /// Accepted but never sent to the service.
    pub loop_flag: bool,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        let medium = QualityPreset::Medium.values();
        Self {
            fps: medium.fps,
            scale: medium.scale,
            quality: QualityPreset::Medium,
            start_time_sec: 0.0,
            duration_sec: 0.0,
            loop_flag: true,
        }
    }
}

/// Individually editable numeric fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    Fps,
    Scale,
    StartTime,
    Duration,
}

impl SettingField {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingField::Fps => "fps",
            SettingField::Scale => "scale",
            SettingField::StartTime => "start",
            SettingField::Duration => "duration",
        }
    }
}

impl fmt::Display for SettingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingField {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fps" => Ok(SettingField::Fps),
            "scale" | "width" => Ok(SettingField::Scale),
            "start" | "starttime" | "start_time" => Ok(SettingField::StartTime),
            "duration" => Ok(SettingField::Duration),
            _ => Err(SettingsError::UnknownField(s.to_string())),
        }
    }
}

/// Owns the session's [`EncodeSettings`].
#[derive(Debug, Clone, Default)]
pub struct SettingsManager {
    settings: EncodeSettings,
}

impl SettingsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn settings(&self) -> &EncodeSettings {
        &self.settings
    }

    /// Overwrite fps and scale from the preset table and retag.
    pub fn apply_preset(&mut self, preset: QualityPreset) {
        let v = preset.values();
        self.settings.fps = v.fps;
        self.settings.scale = v.scale;
        self.settings.quality = preset;
        tracing::debug!(%preset, fps = v.fps, scale = v.scale, "applied preset");
    }

    /// Overwrite one numeric field from raw input. The preset tag is left as is.
    pub fn set_field(&mut self, field: SettingField, raw: &str) -> Result<(), SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            field,
            value: raw.to_string(),
        };
        let raw_trimmed = raw.trim();
        match field {
            SettingField::Fps | SettingField::Scale => {
                let n: u32 = raw_trimmed.parse().map_err(|_| invalid())?;
                if field == SettingField::Fps {
                    self.settings.fps = n;
                } else {
                    self.settings.scale = n;
                }
            }
            SettingField::StartTime | SettingField::Duration => {
                let x: f64 = raw_trimmed.parse().map_err(|_| invalid())?;
                if !x.is_finite() {
                    return Err(invalid());
                }
                if field == SettingField::StartTime {
                    self.settings.start_time_sec = x;
                } else {
                    self.settings.duration_sec = x;
                }
            }
        }
        if self.is_custom() {
            tracing::debug!(%field, value = raw_trimmed, preset = %self.settings.quality, "settings diverge from preset");
        }
        Ok(())
    }

    pub fn set_loop(&mut self, flag: bool) {
        self.settings.loop_flag = flag;
    }

    /// Default trim window once the clip length is known: `min(10, duration)`.
    pub fn apply_default_trim(&mut self, media_duration_sec: f64) {
        self.settings.duration_sec = DEFAULT_TRIM_SECS.min(media_duration_sec.max(0.0));
    }

    /// True when fps/scale no longer match the tagged preset's table row.
    pub fn is_custom(&self) -> bool {
        let v = self.settings.quality.values();
        self.settings.fps != v.fps || self.settings.scale != v.scale
    }

    /// Owned copy of the current values.
    pub fn snapshot(&self) -> EncodeSettings {
        self.settings.clone()
    }
}
