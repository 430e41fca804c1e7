//! User-facing settings, persisted as a small YAML file next to the game.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const SETTINGS_FILE_PATH: &str = "./reskin_settings.yaml";

#[derive(Debug, Error)]
pub enum SettingsIoError {
    #[error("failed to read settings from '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to write settings to '{path}': {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_yaml::Error),
    #[error("failed to parse settings from '{path}': {source}")]
    Deserialize {
        path: String,
        source: serde_yaml::Error,
    },
}

/// Keys the model toggle can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToggleKeySetting {
    #[default]
    Backslash,
    F6,
    F7,
    F8,
}

impl ToggleKeySetting {
    pub fn to_bevy(self) -> KeyCode {
        match self {
            Self::Backslash => KeyCode::Backslash,
            Self::F6 => KeyCode::F6,
            Self::F7 => KeyCode::F7,
            Self::F8 => KeyCode::F8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModSettings {
    pub toggle_key: ToggleKeySetting,
    pub hide_original_equipment: bool,
}

impl Default for ModSettings {
    fn default() -> Self {
        Self {
            toggle_key: ToggleKeySetting::Backslash,
            hide_original_equipment: true,
        }
    }
}

#[derive(Resource, Debug, Clone, Default)]
pub struct SettingsResource {
    pub current: ModSettings,
}

/// Loads settings, falling back to defaults on any missing or malformed
/// file. A parse failure is logged, never fatal.
pub fn load_settings_or_default(path: &Path) -> ModSettings {
    match load_settings(path) {
        Ok(settings) => settings,
        Err(SettingsIoError::Read { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            ModSettings::default()
        }
        Err(error) => {
            warn!("{error}; using defaults");
            ModSettings::default()
        }
    }
}

pub fn load_settings(path: &Path) -> Result<ModSettings, SettingsIoError> {
    let text = fs::read_to_string(path).map_err(|source| SettingsIoError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| SettingsIoError::Deserialize {
        path: path.display().to_string(),
        source,
    })
}

pub fn save_settings(path: &Path, settings: &ModSettings) -> Result<(), SettingsIoError> {
    let text = serde_yaml::to_string(settings).map_err(SettingsIoError::Serialize)?;
    fs::write(path, text).map_err(|source| SettingsIoError::Write {
        path: path.display().to_string(),
        source,
    })
}

/// Writes a default settings file if none exists, so players have something
/// to edit.
pub fn ensure_settings_file_exists(path: &Path) -> Result<(), SettingsIoError> {
    if path.is_file() {
        return Ok(());
    }
    save_settings(path, &ModSettings::default())
}
