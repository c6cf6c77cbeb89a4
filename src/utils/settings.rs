//! Engine settings loaded from `config/settings.json`
//!
//! The file is optional and only ever read; missing keys fall back to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FishingError, Result};
use crate::fishing::{CastDuration, EngineTimings};
use crate::log_monitor::DEFAULT_LOG_GLOB;
use crate::osc::{DEFAULT_OSC_HOST, DEFAULT_OSC_PORT};

use super::path::{get_data_dir, vrchat_log_dir};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub osc_host: String,
    pub osc_port: u16,
    /// Overrides the per-user VRChat log directory.
    pub log_dir: Option<PathBuf>,
    pub log_glob: String,
    pub cast_duration: CastDuration,
    pub timings: EngineTimings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            osc_host: DEFAULT_OSC_HOST.to_string(),
            osc_port: DEFAULT_OSC_PORT,
            log_dir: None,
            log_glob: DEFAULT_LOG_GLOB.to_string(),
            cast_duration: CastDuration::default(),
            timings: EngineTimings::default(),
        }
    }
}

impl Settings {
    /// Default settings file location.
    pub fn path() -> PathBuf {
        get_data_dir().join("config").join("settings.json")
    }

    /// Load from the default location; defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("[CONFIG] No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| FishingError::Settings {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Log directory to tail: the override, else VRChat's default location.
    pub fn resolve_log_dir(&self) -> Option<PathBuf> {
        self.log_dir.clone().or_else(vrchat_log_dir)
    }
}
