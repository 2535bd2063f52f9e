//! Application settings

use crate::core::broadcast::BroadcastConfig;
use crate::core::protocol::{DecoderConfig, DecoderError};
use crate::core::transport::{SerialConfig, TransportError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No platform config directory
    #[error("Could not determine config directory")]
    NoConfigDir,

    /// Reading or writing the file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serializing failed
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Values out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<DecoderError> for ConfigError {
    fn from(err: DecoderError) -> Self {
        Self::Invalid(err.to_string())
    }
}

impl From<TransportError> for ConfigError {
    fn from(err: TransportError) -> Self {
        Self::Invalid(err.to_string())
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial port settings
    pub serial: SerialConfig,
    /// Frame sentinels and capacity
    pub decoder: DecoderConfig,
    /// Datagram destination and header ids
    pub broadcast: BroadcastConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        let path = super::config_path().ok_or(ConfigError::NoConfigDir)?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;

        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Save config to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(io_err)?;
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.decoder.validate()?;
        self.serial.validate()?;
        if self.broadcast.port == 0 {
            return Err(ConfigError::Invalid("broadcast port must not be 0".to_string()));
        }
        if self.broadcast.host.is_empty() {
            return Err(ConfigError::Invalid("broadcast host is empty".to_string()));
        }
        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter, overridden by `RUST_LOG`
    pub level: String,
    /// Print every frame as a hex line on stdout
    pub hex_stdout: bool,
    /// Append frames to this capture file
    pub capture_file: Option<PathBuf>,
    /// Write daily rolling log files here
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            hex_stdout: true,
            capture_file: None,
            log_dir: None,
        }
    }
}
