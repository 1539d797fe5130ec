//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Which tileset to stream and how.
    pub tileset: TilesetConfig,
    /// Camera and viewport.
    pub view: ViewConfig,
    /// Background fetch pool.
    pub fetch: FetchConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Tileset streaming settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TilesetConfig {
    /// Root hierarchy description, relative to the data directory.
    pub url: String,
    /// Draw the tileset.
    pub show: bool,
    /// Refinement threshold in pixels.
    pub maximum_screen_space_error: f64,
    /// Concurrent content requests.
    pub maximum_pending_requests: usize,
    /// Log per-frame statistics when they change.
    pub debug_show_statistics: bool,
    /// Stop traversing and keep the last selection.
    pub debug_freeze_frame: bool,
}

/// Perspective camera settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f64,
    pub near: f64,
    pub far: f64,
}

/// Fetch worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub worker_threads: usize,
    /// Requests that may wait for a worker before new ones are rejected.
    pub queue_capacity: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

impl Default for TilesetConfig {
    fn default() -> Self {
        Self {
            url: "tileset.json".to_string(),
            show: true,
            maximum_screen_space_error: 16.0,
            maximum_pending_requests: 6,
            debug_show_statistics: false,
            debug_freeze_frame: false,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            viewport_width: 1280,
            viewport_height: 720,
            fov_y_degrees: 60.0,
            near: 1.0,
            far: 1.0e7,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            queue_capacity: 64,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Platform config directory for canopy, e.g. `~/.config/canopy`.
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("canopy"))
}

impl ViewConfig {
    /// Width over height.
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.viewport_width) / f64::from(self.viewport_height.max(1))
    }
}

// --- Load / Save / Validate ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(|source| ConfigError::ReadError {
                    path: config_path.clone(),
                    source,
                })?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::WriteError {
            path: config_path,
            source,
        })
    }

    /// Reject settings the streaming core cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            })
        };

        let sse = self.tileset.maximum_screen_space_error;
        if !(sse.is_finite() && sse > 0.0) {
            return invalid("tileset.maximum_screen_space_error", "must be a positive number");
        }
        if self.tileset.url.is_empty() {
            return invalid("tileset.url", "must not be empty");
        }
        if self.view.viewport_height == 0 || self.view.viewport_width == 0 {
            return invalid("view", "viewport must be at least one pixel in each direction");
        }
        if !(self.view.fov_y_degrees > 0.0 && self.view.fov_y_degrees < 180.0) {
            return invalid("view.fov_y_degrees", "must be between 0 and 180");
        }
        if !(self.view.near > 0.0 && self.view.near < self.view.far) {
            return invalid("view.near", "must be positive and closer than view.far");
        }
        if self.fetch.worker_threads == 0 {
            return invalid("fetch.worker_threads", "at least one worker is required");
        }
        if self.fetch.queue_capacity == 0 {
            return invalid("fetch.queue_capacity", "must be at least 1");
        }
        Ok(())
    }
}
