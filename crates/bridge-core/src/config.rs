//! bridge.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use http::Uri;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8980";
pub const DEFAULT_PATH: &str = "/health";
pub const DEFAULT_AVAILABILITY_FIELD: &str = "db_available";
pub const DEFAULT_JOURNAL: &str = "algo_memory.json";

/// Errors raised while loading or validating configuration.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid {key} {value:?}: {reason}")]
    InvalidUrl {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid endpoint_path {0:?}: must start with '/'")]
    InvalidPath(String),

    #[error("invalid {key} {value}: must be a positive, representable number of seconds")]
    NonPositive { key: &'static str, value: f64 },

    #[error("invalid availability_field: must not be empty")]
    EmptyAvailabilityField,

    #[error("invalid journal_path: must not be empty")]
    EmptyJournalPath,

    #[error("invalid ledger.command: must not be empty")]
    EmptyLedgerCommand,
}

/// Agent configuration. Every key is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub endpoint_base_url: String,
    pub endpoint_path: String,
    /// Boolean field in the health body that carries availability.
    pub availability_field: String,
    pub poll_interval_secs: f64,
    pub request_timeout_secs: f64,
    pub journal_path: PathBuf,
    pub ledger: Option<LedgerConfig>,
    pub ingest: Option<IngestConfig>,
}

/// External command that receives the content hash of every persisted entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Downstream store that receives every persisted entry as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    pub url: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint_base_url: DEFAULT_BASE_URL.to_string(),
            endpoint_path: DEFAULT_PATH.to_string(),
            availability_field: DEFAULT_AVAILABILITY_FIELD.to_string(),
            poll_interval_secs: 5.0,
            request_timeout_secs: 5.0,
            journal_path: PathBuf::from(DEFAULT_JOURNAL),
            ledger: None,
            ingest: None,
        }
    }
}

impl BridgeConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every value once, before the loop starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_http_url("endpoint_base_url", &self.endpoint_base_url)?;
        if !self.endpoint_path.starts_with('/') {
            return Err(ConfigError::InvalidPath(self.endpoint_path.clone()));
        }
        check_http_url("endpoint", &self.endpoint_url())?;
        check_positive("poll_interval_secs", self.poll_interval_secs)?;
        check_positive("request_timeout_secs", self.request_timeout_secs)?;
        if self.availability_field.trim().is_empty() {
            return Err(ConfigError::EmptyAvailabilityField);
        }
        if self.journal_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyJournalPath);
        }
        if let Some(ledger) = &self.ledger
            && ledger.command.trim().is_empty()
        {
            return Err(ConfigError::EmptyLedgerCommand);
        }
        if let Some(ingest) = &self.ingest {
            check_http_url("ingest.url", &ingest.url)?;
        }
        Ok(())
    }

    /// Full URL of the health endpoint.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}{}",
            self.endpoint_base_url.trim_end_matches('/'),
            self.endpoint_path
        )
    }

    /// Poll interval. Call [`BridgeConfig::validate`] first: out-of-range
    /// values panic here.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_secs)
    }
}

/// Only plain `http://` targets with a host are accepted.
fn check_http_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidUrl {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let uri: Uri = value.parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(other) => return Err(invalid(&format!("unsupported scheme {other:?}"))),
        None => return Err(invalid("missing scheme")),
    }
    if uri.host().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    Ok(())
}

/// Positive, finite, and small enough to become a `Duration`.
fn check_positive(key: &'static str, value: f64) -> Result<(), ConfigError> {
    match Duration::try_from_secs_f64(value) {
        Ok(d) if !d.is_zero() => Ok(()),
        _ => Err(ConfigError::NonPositive { key, value }),
    }
}
