//! Quality presets: named shortcuts that bulk-set fps and output width.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::SettingsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
    Ultra,
}

/// Table row of a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetValues {
    pub fps: u32,
    pub scale: u32,
}

impl QualityPreset {
    pub const ALL: [QualityPreset; 4] = [
        QualityPreset::Low,
        QualityPreset::Medium,
        QualityPreset::High,
        QualityPreset::Ultra,
    ];

    pub fn values(self) -> PresetValues {
        match self {
            QualityPreset::Low => PresetValues { fps: 10, scale: 320 },
            QualityPreset::Medium => PresetValues { fps: 15, scale: 480 },
            QualityPreset::High => PresetValues { fps: 24, scale: 720 },
            QualityPreset::Ultra => PresetValues { fps: 30, scale: 1080 },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityPreset::Low => "low",
            QualityPreset::Medium => "medium",
            QualityPreset::High => "high",
            QualityPreset::Ultra => "ultra",
        }
    }

    /// Human label, e.g. "High (720p, 24fps)".
    pub fn label(self) -> String {
        let v = self.values();
        let name = match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
            QualityPreset::Ultra => "Ultra",
        };
        format!("{} ({}p, {}fps)", name, v.scale, v.fps)
    }
}

impl fmt::Display for QualityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityPreset {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityPreset::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SettingsError::UnknownPreset(s.to_string()))
    }
}
