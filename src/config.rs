//! Configuration file support for zlabel.
//!
//! Settings are loaded once into an `AppConfig` and handed to the workspace
//! and canvas at construction. The file is versioned JSON; unknown sections
//! fall back to defaults so older files keep loading.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::color_utils::DEFAULT_COLOR;
use crate::oracle::{AutoMode, ReturnType};

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
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// All log levels from least to most verbose.
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ]
    }

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

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub preferences: UserPreferences,

    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub canvas: CanvasConfig,

    #[serde(default)]
    pub undo: UndoSettings,
}

// ============================================================================
// Sections
// ============================================================================

/// User preferences section of the config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Color given to new labels when none is chosen
    #[serde(default = "default_color")]
    pub default_color: String,

    /// Number of tasks requested per fetch
    #[serde(default = "default_fetch_num")]
    pub fetch_num: usize,

    /// Whether fetches include finished tasks
    #[serde(default)]
    pub fetch_finished: bool,
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_fetch_num() -> usize {
    100
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            default_color: default_color(),
            fetch_num: default_fetch_num(),
            fetch_finished: false,
        }
    }
}

/// Auto-segmentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub sam_enabled: bool,

    #[serde(default)]
    pub cv_enabled: bool,

    /// Threshold forwarded to the oracle
    #[serde(default = "default_threshold")]
    pub threshold: u32,

    /// Number of prediction worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub return_type: ReturnType,
}

fn default_threshold() -> u32 {
    100
}

fn default_workers() -> usize {
    2
}

impl OracleConfig {
    pub fn auto_mode(&self) -> AutoMode {
        AutoMode::from_flags(self.sam_enabled, self.cv_enabled)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            sam_enabled: false,
            cv_enabled: false,
            threshold: default_threshold(),
            workers: default_workers(),
            return_type: ReturnType::default(),
        }
    }
}

/// Remote labeling server. Only the address is kept here; the client is external.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default)]
    pub server_url: String,

    #[serde(default)]
    pub username: String,
}

/// Where projects live on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_project_name")]
    pub project_name: String,

    /// Root folder holding `projects/<name>/`
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
}

fn default_project_name() -> String {
    "default".to_string()
}

fn default_root_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join("zlabel"))
        .unwrap_or_else(|| PathBuf::from("zlabel"))
}

impl ProjectConfig {
    /// `<root_dir>/projects/<project_name>`
    pub fn project_dir(&self) -> PathBuf {
        self.root_dir.join("projects").join(&self.project_name)
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            root_dir: default_root_dir(),
        }
    }
}

/// Canvas interaction tunables. Distances are in view pixels unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Radius of point shapes, image units
    pub point_radius: f32,
    pub fill_alpha: f32,
    /// Minimum width and height of a drawn rectangle, image units
    pub min_shape_size: f32,
    pub handle_tolerance: f32,
    /// Marquees smaller than this (image units squared) are discarded
    pub marquee_min_area: f32,
    /// Distance within which a double-click inserts a polygon vertex
    pub polygon_edge_tolerance: f32,
    /// Movement before a press becomes a drag
    pub min_drag_distance: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            point_radius: crate::shape::DEFAULT_POINT_RADIUS,
            fill_alpha: crate::shape::DEFAULT_FILL_ALPHA,
            min_shape_size: 1.0,
            handle_tolerance: 8.0,
            marquee_min_area: crate::canvas::selection::MIN_MARQUEE_AREA,
            polygon_edge_tolerance: 10.0,
            min_drag_distance: 2.0,
            min_zoom: 0.1,
            max_zoom: 20.0,
            zoom_step: 1.25,
        }
    }
}

/// Undo history settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoSettings {
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_max_history() -> usize {
    100
}

impl Default for UndoSettings {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}

// ============================================================================
// Load / Save
// ============================================================================

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            preferences: UserPreferences::default(),
            oracle: OracleConfig::default(),
            remote: RemoteConfig::default(),
            project: ProjectConfig::default(),
            canvas: CanvasConfig::default(),
            undo: UndoSettings::default(),
        }
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "zlabel-config.json"
    }

    /// Default config file path for auto-load/save.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("zlabel").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("zlabel")
                    .join(Self::default_filename())
            })
        }
    }

    /// Read a config file.
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load_from_file(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save_to_file(&path)
    }
}

impl Default for AppConfig {
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
