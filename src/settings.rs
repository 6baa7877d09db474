//! Persisted application settings.
//!
//! The stabilizer itself persists nothing; the only durable piece of
//! pipeline state is the active preset name, stored as a small TOML file
//! in the user configuration directory. Missing or unreadable settings
//! degrade to defaults with a warning instead of failing startup.

use crate::stabilizer::StabilizationPreset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

const SETTINGS_DIR: &str = "steadyaxis";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("No user configuration directory available")]
    NoConfigDir,

    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Settings serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Everything the application keeps between runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Active stabilization preset, restored at the next session start.
    pub preset: StabilizationPreset,
}

impl Settings {
    /// Location of the settings file, created on demand by [`save`](Self::save).
    pub fn path() -> Result<PathBuf, SettingsError> {
        let base = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(base.join(SETTINGS_DIR).join(SETTINGS_FILE))
    }

    pub fn load() -> Result<Self, SettingsError> {
        let path = Self::path()?;
        let raw = fs::read_to_string(&path)?;
        let settings = toml::from_str(&raw)?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Loads the settings, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(settings) => settings,
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings file yet, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!("Could not load settings ({}), using defaults", e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        fs::write(&path, raw)?;
        info!("Saved settings to {}", path.display());
        Ok(())
    }
}
