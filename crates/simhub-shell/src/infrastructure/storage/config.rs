//! TOML-based configuration persistence for the shell.
//!
//! Reads and writes [`ShellConfig`] at the platform-appropriate location:
//! - Windows:  `%APPDATA%\SimHub\config.toml`
//! - Linux:    `~/.config/simhub/config.toml`
//! - macOS:    `~/Library/Application Support/SimHub/config.toml`
//!
//! Fields missing from an older config file fall back to their defaults via
//! `#[serde(default = ...)]`, so the shell works on first run and across
//! upgrades without migration code.  Saves go through a temp file in the
//! same directory followed by a rename, so a crash mid-write never leaves a
//! truncated config behind.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level shell configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShellConfig {
    #[serde(default)]
    pub shell: ShellSection,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub origins: OriginsSection,
}

/// General shell behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShellSection {
    /// Development mode: external modules load their `dev_url`.
    #[serde(default)]
    pub dev_mode: bool,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Endpoints and bind addresses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSection {
    /// Module catalog endpoint URL.
    #[serde(default = "default_config_endpoint")]
    pub config_endpoint: String,
    /// Bind address for the WebSocket guest endpoint.
    #[serde(default = "default_ws_bind")]
    pub ws_bind: String,
}

/// Guest origin allow-list.  Empty means the permissive development policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OriginsSection {
    #[serde(default)]
    pub allowed: Vec<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_config_endpoint() -> String {
    "http://127.0.0.1:8080/api/v1/resource-types".to_string()
}
fn default_ws_bind() -> String {
    "0.0.0.0:7810".to_string()
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            dev_mode: false,
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            config_endpoint: default_config_endpoint(),
            ws_bind: default_ws_bind(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config
/// base directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory
/// cannot be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads [`ShellConfig`] from `path`, returning defaults if the file does
/// not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_from(path: &Path) -> Result<ShellConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ShellConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// The write goes to `<path>.tmp` first and is renamed into place, so
/// readers only ever see a complete file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_to(path: &Path, config: &ShellConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, content).map_err(|source| ConfigError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the `SimHub`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("SimHub"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("simhub"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("SimHub")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
