//! Configuration file loading with precedence handling.

use crate::model::Priority;
use crate::state::DEFAULT_CHUNK_SIZE;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "JLV_CONFIG";

/// Environment variable overriding the chunk size.
pub const CHUNK_SIZE_ENV: &str = "JLV_CHUNK_SIZE";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read config file (permission issues, not a file).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax or unknown keys.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },

    /// A key parsed but its value is out of range.
    #[error("Invalid value for `{key}` in {path}: {reason}")]
    InvalidValue {
        /// Config file path.
        path: PathBuf,
        /// Offending key.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional; missing ones fall back to defaults.
/// Corresponds to `~/.config/jlv/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Entries read per directional fetch.
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,

    /// Include kernel transports in the default filter.
    #[serde(default)]
    pub show_kernel_messages: Option<bool>,

    /// Default priority ceiling, 0 (emerg) to 7 (debug).
    #[serde(default)]
    pub priority_ceiling: Option<u8>,

    /// Open the view at the newest entries instead of the oldest.
    #[serde(default)]
    pub start_at_tail: Option<bool>,
}

impl ConfigFile {
    /// Check ranges that TOML types cannot express.
    fn validate(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if self.chunk_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                path: path.to_path_buf(),
                key: "chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if let Some(level) = self.priority_ceiling {
            if Priority::from_level(level).is_none() {
                return Err(ConfigError::InvalidValue {
                    path: path.to_path_buf(),
                    key: "priority_ceiling",
                    reason: format!("{} is not a syslog priority (0-7)", level),
                });
            }
        }
        Ok(())
    }
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Entries read per directional fetch. Never zero.
    pub chunk_size: usize,
    /// Where tracing output is written.
    pub log_file_path: PathBuf,
    /// Include kernel messages in the default filter.
    pub show_kernel_messages: bool,
    /// Default priority ceiling.
    pub priority_ceiling: Option<Priority>,
    /// Open the view at the newest entries.
    pub start_at_tail: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            log_file_path: default_log_path(),
            show_kernel_messages: false,
            priority_ceiling: None,
            start_at_tail: false,
        }
    }
}

/// Overrides taken from command-line flags. `None` leaves the value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    /// `--chunk-size`.
    pub chunk_size: Option<usize>,
    /// `--kernel`.
    pub show_kernel_messages: Option<bool>,
    /// `--priority`.
    pub priority_ceiling: Option<Priority>,
    /// `--tail`.
    pub start_at_tail: Option<bool>,
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/jlv/jlv.log` on Unix-like systems, or the
/// platform's state directory elsewhere. Falls back to the current directory.
pub fn default_log_path() -> PathBuf {
    match dirs::state_dir() {
        Some(state_dir) => state_dir.join("jlv").join("jlv.log"),
        None => PathBuf::from("jlv.log"),
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if the file doesn't exist.
///
/// # Errors
///
/// Returns error if the file exists but cannot be read, parsed or validated.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    config.validate(&path)?;

    Ok(Some(config))
}

/// Resolve default config file path: `~/.config/jlv/config.toml` on Unix.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("jlv").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `JLV_CONFIG` environment variable
/// 3. Default path `~/.config/jlv/config.toml`
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return load_config_file(PathBuf::from(env_path));
    }

    match default_config_path() {
        Some(default_path) => load_config_file(default_path),
        None => Ok(None),
    }
}

/// Apply environment variable overrides to resolved config.
///
/// `JLV_CHUNK_SIZE` overrides the chunk size. Values that are not a positive
/// integer are ignored with a warning.
pub fn apply_env_overrides(mut config: ResolvedConfig) -> ResolvedConfig {
    if let Ok(raw) = std::env::var(CHUNK_SIZE_ENV) {
        match raw.trim().parse::<usize>() {
            Ok(size) if size > 0 => config.chunk_size = size,
            _ => warn!(value = %raw, "Ignoring invalid {}", CHUNK_SIZE_ENV),
        }
    }
    config
}

/// Merge config file into defaults to create resolved config.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        chunk_size: config
            .chunk_size
            .filter(|size| *size > 0)
            .unwrap_or(defaults.chunk_size),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
        show_kernel_messages: config
            .show_kernel_messages
            .unwrap_or(defaults.show_kernel_messages),
        priority_ceiling: config
            .priority_ceiling
            .and_then(Priority::from_level)
            .or(defaults.priority_ceiling),
        start_at_tail: config.start_at_tail.unwrap_or(defaults.start_at_tail),
    }
}

/// Apply CLI argument overrides to resolved config.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(mut config: ResolvedConfig, overrides: CliOverrides) -> ResolvedConfig {
    if let Some(size) = overrides.chunk_size.filter(|size| *size > 0) {
        config.chunk_size = size;
    }
    if let Some(kernel) = overrides.show_kernel_messages {
        config.show_kernel_messages = kernel;
    }
    if let Some(ceiling) = overrides.priority_ceiling {
        config.priority_ceiling = Some(ceiling);
    }
    if let Some(tail) = overrides.start_at_tail {
        config.start_at_tail = tail;
    }
    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
