//! User settings stored in `filedrag.toml` under the application root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;

pub const CONFIG_FILE_NAME: &str = "filedrag.toml";

/// Errors that may occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No usable config directory found.
    #[error("No suitable config directory found")]
    NoConfigDir,
    /// Failed to create the config directory.
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to read the config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Settings for the drag CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragSettings {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Resolve symlinks and `..` against the filesystem instead of only
    /// making paths absolute.
    pub canonicalize_paths: bool,
    /// Refuse to start a drag when a path does not exist.
    pub require_existing: bool,
}

impl Default for DragSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            canonicalize_paths: false,
            require_existing: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load settings from the application root, returning defaults if missing.
pub fn load_or_default() -> Result<DragSettings, ConfigError> {
    load_from(&config_path()?)
}

/// Load settings from `path`, returning defaults if the file does not exist.
pub fn load_from(path: &Path) -> Result<DragSettings, ConfigError> {
    if !path.exists() {
        return Ok(DragSettings::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: DragSettings = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(settings.normalized())
}

impl DragSettings {
    fn normalized(mut self) -> Self {
        let level = self.log_level.trim();
        self.log_level = if level.is_empty() {
            default_log_level()
        } else {
            level.to_string()
        };
        self
    }
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => ConfigError::CreateDir { path, source },
    }
}
