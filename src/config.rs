//! Dashboard configuration stored as TOML under the `.fleetdeck` directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::app_dirs;
use crate::fleet::PredictionOptions;
use crate::http_client::TransportLimits;

/// Default filename used to store the configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// Environment variable overriding `service.base_url`.
pub const API_URL_ENV: &str = "FLEETDECK_API_URL";

/// Errors that may occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The application directory could not be resolved or created.
    #[error("Config directory unavailable: {0}")]
    Directory(#[from] app_dirs::AppDirError),
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
    /// The planning service URL is not an absolute http(s) URL.
    #[error("Invalid planning service URL '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub service: ServiceSettings,
    #[serde(default)]
    pub refresh: RefreshSettings,
    #[serde(default)]
    pub predictions: PredictionSettings,
}

/// Where the planning service lives and how patiently to talk to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            max_response_bytes: default_max_response_bytes(),
        }
    }
}

impl ServiceSettings {
    /// Parse and check the configured base URL.
    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            value: self.base_url.clone(),
            reason,
        };
        let url = Url::parse(self.base_url.trim()).map_err(|err| invalid(err.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".into()));
        }
        Ok(url)
    }

    pub fn transport_limits(&self) -> TransportLimits {
        TransportLimits {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
            request_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            max_response_bytes: self.max_response_bytes.max(1024),
        }
    }
}

/// Auto-refresh preferences. The interval itself is fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSettings {
    /// Arm the auto-refresh timer as soon as the dashboard starts.
    #[serde(default)]
    pub auto_refresh_on_start: bool,
}

/// Parameters sent with "Generate Predictions".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionSettings {
    #[serde(default = "default_true")]
    pub use_mock_data: bool,
    #[serde(default)]
    pub retrain_model: bool,
    #[serde(default = "default_target_inductions")]
    pub target_inductions: u32,
}

impl Default for PredictionSettings {
    fn default() -> Self {
        let defaults = PredictionOptions::default();
        Self {
            use_mock_data: defaults.use_mock_data,
            retrain_model: defaults.retrain_model,
            target_inductions: defaults.target_inductions,
        }
    }
}

impl PredictionSettings {
    pub fn options(&self) -> PredictionOptions {
        PredictionOptions {
            use_mock_data: self.use_mock_data,
            retrain_model: self.retrain_model,
            target_inductions: self.target_inductions,
        }
    }
}

/// Resolve the configuration file path, ensuring the parent directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load configuration from disk, falling back to defaults when the file is missing.
///
/// `FLEETDECK_API_URL` takes precedence over the file's `service.base_url`.
pub fn load_or_default() -> Result<DashboardConfig, ConfigError> {
    let path = config_path()?;
    let mut config = load_from_path(&path)?;
    if let Ok(url) = std::env::var(API_URL_ENV)
        && !url.trim().is_empty()
    {
        config.service.base_url = url;
    }
    config.service.parsed_base_url()?;
    Ok(config)
}

/// Read one TOML file; a missing file yields defaults.
pub fn load_from_path(path: &Path) -> Result<DashboardConfig, ConfigError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No config file; using defaults");
        return Ok(DashboardConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_response_bytes() -> usize {
    4 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_target_inductions() -> u32 {
    PredictionOptions::default().target_inductions
}
