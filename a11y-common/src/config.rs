//! Configuration loading and config file resolution
//!
//! Config files are located following a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. File in the current working directory
//! 4. File in the OS user config directory
//!
//! When none of these exist the caller falls back to built-in defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logging configuration shared by every binary in the workspace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr only if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where a resolved config path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    WorkingDirectory,
    UserConfigDir,
}

/// Resolve the config file to load.
///
/// CLI and ENV paths are returned even when the file does not exist so that
/// an explicit but wrong path surfaces as a load error instead of silently
/// falling back to defaults. The working-directory and user-config-dir
/// candidates are only returned when present on disk.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    app_name: &str,
) -> Option<(PathBuf, ConfigSource)> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some((path.to_path_buf(), ConfigSource::CommandLine));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some((PathBuf::from(path), ConfigSource::Environment));
        }
    }

    let file_name = format!("{}.toml", app_name);

    // Priority 3: Working directory
    let local = PathBuf::from(&file_name);
    if local.exists() {
        return Some((local, ConfigSource::WorkingDirectory));
    }

    // Priority 4: OS user config directory
    if let Some(path) = user_config_path(app_name) {
        if path.exists() {
            return Some((path, ConfigSource::UserConfigDir));
        }
    }

    None
}

/// `<config_dir>/<app_name>/<app_name>.toml` for the current platform
pub fn user_config_path(app_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(app_name).join(format!("{}.toml", app_name)))
}

/// Read and deserialize a TOML config file
pub fn load_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(format!("Config file {}", path.display()))
        } else {
            Error::Config(format!("Read TOML failed ({}): {}", path.display(), e))
        }
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))
}

/// Serialize and write a TOML config file atomically.
///
/// Writes to a sibling temp file and renames it over the target, so readers
/// never observe a half-written config.
pub fn write_toml_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    tracing::debug!(path = %path.display(), "TOML config written");
    Ok(())
}
