//! Client configuration stored as TOML in the application directory.
//!
//! Config keys: `api_base_url`, `training_timeout_secs`, `connect_timeout_secs`,
//! `read_timeout_secs`, `write_timeout_secs`, `max_response_bytes`, `log_filter`.
//! `XAIFLOW_API_URL` overrides `api_base_url` after the file is read.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;

/// File name of the config inside the app root.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Environment override for the API base URL.
pub const API_URL_ENV: &str = "XAIFLOW_API_URL";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_TRAINING_TIMEOUT_SECS: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 330;
/// Upper bound for the training deadline.
pub const MAX_TRAINING_TIMEOUT_SECS: u64 = 24 * 60 * 60;
/// Headroom kept between the training deadline and the socket read timeout.
const READ_TIMEOUT_MARGIN_SECS: u64 = 30;
const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;

/// Errors that may occur while loading or saving the client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config directory unavailable: {0}")]
    AppDir(#[from] app_dirs::AppDirError),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
}

/// Settings consumed by the transport and the workflow controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Soft deadline for a training submission.
    #[serde(default = "default_training_timeout_secs")]
    pub training_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Socket read timeout; kept above the training deadline so the soft timeout fires first.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            training_timeout_secs: default_training_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
            max_response_bytes: default_max_response_bytes(),
            log_filter: None,
        }
    }
}

impl ClientConfig {
    pub fn training_timeout(&self) -> Duration {
        Duration::from_secs(self.training_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Clamp zero values back to defaults and tidy the base URL.
    ///
    /// The training deadline is capped at [`MAX_TRAINING_TIMEOUT_SECS`] and the read timeout
    /// is raised above it, so the soft deadline always fires before the socket gives up.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.api_base_url.trim().trim_end_matches('/');
        self.api_base_url = if trimmed.is_empty() {
            default_api_base_url()
        } else {
            trimmed.to_string()
        };
        if self.training_timeout_secs == 0 {
            self.training_timeout_secs = DEFAULT_TRAINING_TIMEOUT_SECS;
        }
        self.training_timeout_secs = self.training_timeout_secs.min(MAX_TRAINING_TIMEOUT_SECS);
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = DEFAULT_CONNECT_TIMEOUT_SECS;
        }
        if self.read_timeout_secs == 0 {
            self.read_timeout_secs = DEFAULT_READ_TIMEOUT_SECS;
        }
        if self.read_timeout_secs <= self.training_timeout_secs {
            self.read_timeout_secs = self.training_timeout_secs + READ_TIMEOUT_MARGIN_SECS;
        }
        if self.write_timeout_secs == 0 {
            self.write_timeout_secs = DEFAULT_WRITE_TIMEOUT_SECS;
        }
        if self.max_response_bytes == 0 {
            self.max_response_bytes = DEFAULT_MAX_RESPONSE_BYTES;
        }
        self
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
        self
    }
}

/// Resolve the configuration file path inside the app root.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from disk, returning defaults if the file is missing.
pub fn load_or_default() -> Result<ClientConfig, ConfigError> {
    let path = config_path()?;
    Ok(load_from(&path)?.with_env_overrides().normalized())
}

/// Persist configuration to the default location.
pub fn save(config: &ClientConfig) -> Result<(), ConfigError> {
    save_to(&config_path()?, config)
}

pub(crate) fn load_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ClientConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(config.normalized())
}

pub(crate) fn save_to(path: &Path, config: &ClientConfig) -> Result<(), ConfigError> {
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, data).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_training_timeout_secs() -> u64 {
    DEFAULT_TRAINING_TIMEOUT_SECS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

fn default_write_timeout_secs() -> u64 {
    DEFAULT_WRITE_TIMEOUT_SECS
}

fn default_max_response_bytes() -> usize {
    DEFAULT_MAX_RESPONSE_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.training_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn partial_file_fills_remaining_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "api_base_url = \"https://ml.example.com/api/\"\ntraining_timeout_secs = 0\n",
        )
        .unwrap();

        let config = load_from(&path).unwrap();

        assert_eq!(config.api_base_url, "https://ml.example.com/api");
        assert_eq!(config.training_timeout_secs, 300);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "training_timeout_secs = \"soon\"").unwrap();

        let err = load_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn save_then_load_preserves_custom_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = ClientConfig {
            training_timeout_secs: 42,
            log_filter: Some("xaiflow=debug".to_string()),
            ..ClientConfig::default()
        };

        save_to(&path, &config).unwrap();

        assert_eq!(load_from(&path).unwrap(), config);
    }

    #[test]
    fn oversized_training_timeout_is_capped() {
        let config: ClientConfig =
            toml::from_str("training_timeout_secs = 9223372036854775807").unwrap();

        let config = config.normalized();

        assert_eq!(config.training_timeout_secs, MAX_TRAINING_TIMEOUT_SECS);
        assert!(config.read_timeout_secs > config.training_timeout_secs);
    }

    #[test]
    fn read_timeout_is_raised_above_training_deadline() {
        let config: ClientConfig =
            toml::from_str("read_timeout_secs = 5\ntraining_timeout_secs = 300").unwrap();

        let config = config.normalized();

        assert_eq!(config.training_timeout_secs, 300);
        assert_eq!(config.read_timeout_secs, 330);
    }

    #[test]
    fn longer_read_timeout_is_kept() {
        let config = ClientConfig {
            read_timeout_secs: 900,
            ..ClientConfig::default()
        }
        .normalized();
        assert_eq!(config.read_timeout_secs, 900);
    }
}
