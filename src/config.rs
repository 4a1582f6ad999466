//! Configuration file support for mapnote.
//!
//! Settings are read once at startup. A missing or broken file falls back to
//! defaults; the session never fails to start because of configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_GRID_SIZE, DEFAULT_PIXELS_PER_UNIT, DEFAULT_SNAP_ENABLED, SAVE_DEBOUNCE, STORAGE_KEY,
};

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Version of the configuration file format
    pub version: u32,

    /// Map pixels per world unit, fixed for the session
    #[serde(default = "default_pixels_per_unit")]
    pub pixels_per_unit: f64,

    /// Snapping grid size for sessions without saved state
    #[serde(default = "default_grid_size")]
    pub default_grid_size: f64,

    #[serde(default = "default_snap_enabled")]
    pub default_snap_enabled: bool,

    /// Quiet interval before a save is written
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    /// Key of the durable record
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Baseline dataset, relative to the asset root
    #[serde(default = "default_baseline_path")]
    pub baseline_path: String,

    /// Sticker catalog, relative to the asset root
    #[serde(default = "default_stickers_path")]
    pub stickers_path: String,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_pixels_per_unit() -> f64 {
    DEFAULT_PIXELS_PER_UNIT
}

fn default_grid_size() -> f64 {
    DEFAULT_GRID_SIZE
}

fn default_snap_enabled() -> bool {
    DEFAULT_SNAP_ENABLED
}

fn default_save_debounce_ms() -> u64 {
    SAVE_DEBOUNCE.as_millis() as u64
}

fn default_storage_key() -> String {
    STORAGE_KEY.to_string()
}

fn default_baseline_path() -> String {
    "markers.json".to_string()
}

fn default_stickers_path() -> String {
    "stickers.json".to_string()
}

impl Settings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            pixels_per_unit: default_pixels_per_unit(),
            default_grid_size: default_grid_size(),
            default_snap_enabled: default_snap_enabled(),
            save_debounce_ms: default_save_debounce_ms(),
            storage_key: default_storage_key(),
            baseline_path: default_baseline_path(),
            stickers_path: default_stickers_path(),
            log_level: LogLevel::default(),
        }
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// Serialize the settings to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize settings from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if settings.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: settings.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(settings)
    }

    /// Get the default filename for the settings file.
    pub fn default_filename() -> &'static str {
        "mapnote-config.json"
    }

    /// Get the default config file path.
    /// Returns None on WASM (no filesystem access).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("mapnote").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("mapnote")
                    .join(Self::default_filename())
            })
        }
    }

    /// Read and parse the settings file at `path`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Load settings from `path`, or defaults if the file is missing or broken.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_default(path: &std::path::Path) -> Self {
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return Self::default();
        }

        match Self::load(path) {
            Ok(settings) => {
                log::info!("Loaded configuration from {:?}", path);
                settings
            }
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Load settings from the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => Self::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
