// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::{
    CaptureMode, DEFAULT_DEVICE_POLL_SECS, DEFAULT_GALLERY_CAPACITY, DEFAULT_SAVE_FOLDER,
    IDEAL_STREAM_RESOLUTION, LANDSCAPE_TARGET, PORTRAIT_TARGET, Resolution, TimerDuration,
};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const APP_DIR: &str = "photobooth";
const CONFIG_FILE: &str = "config.json";

/// Upload service selection and its saved credential
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum UploadConfig {
    /// No credentials: uploads are skipped and the QR code is not offered
    #[default]
    Disabled,
    /// Image host taking a raw POST and answering `{ success, url }`
    Http {
        endpoint: String,
        #[serde(default)]
        api_key: Option<String>,
    },
    /// Object storage taking a PUT per path, served from a public base URL
    Storage {
        base_url: String,
        bucket: String,
        token: String,
        public_base_url: String,
    },
}

/// Realtime relay used for the phone remote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// `ws://host:port` of a relay, `None` disables remote control
    pub relay_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output size for portrait captures
    pub portrait: Resolution,
    /// Output size for landscape captures
    pub landscape: Resolution,
    /// Resolution hint passed to the camera when opening a stream
    pub ideal_resolution: Resolution,
    /// Mode selected at startup
    pub default_mode: CaptureMode,
    /// Countdown selected at startup
    pub default_timer: TimerDuration,
    /// Number of captures kept in the session gallery
    pub gallery_capacity: usize,
    /// Folder name under the pictures directory for local saves
    pub save_folder: String,
    /// Seconds between device re-enumerations, 0 disables polling
    pub device_poll_secs: u64,
    pub upload: UploadConfig,
    pub realtime: RealtimeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portrait: PORTRAIT_TARGET,
            landscape: LANDSCAPE_TARGET,
            ideal_resolution: IDEAL_STREAM_RESOLUTION,
            default_mode: CaptureMode::default(),
            default_timer: TimerDuration::default(),
            gallery_capacity: DEFAULT_GALLERY_CAPACITY,
            save_folder: DEFAULT_SAVE_FOLDER.to_string(),
            device_poll_secs: DEFAULT_DEVICE_POLL_SECS,
            upload: UploadConfig::default(),
            realtime: RealtimeConfig::default(),
        }
    }
}

impl Config {
    /// Target output size for a capture mode
    pub fn target_size(&self, mode: CaptureMode) -> Resolution {
        match mode {
            CaptureMode::Portrait => self.portrait,
            CaptureMode::Landscape => self.landscape,
        }
    }

    /// Default location of the configuration file
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load the configuration from the default path
    ///
    /// Never fails: a missing file yields defaults, a broken one is
    /// reported and replaced by defaults.
    pub fn load() -> Self {
        match Self::default_path() {
            Ok(path) => Self::load_or_default(&path),
            Err(e) => {
                warn!(error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Load from `path`, falling back to defaults
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable configuration");
                Self::default()
            }
        }
    }

    /// Load from `path`, reporting every failure
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Save to the default path
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::default_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(io_err)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}
