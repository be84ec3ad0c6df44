//! Configuration for the audit core.
//!
//! Loaded from a TOML file, a TOML string or `TIDE_*` environment
//! variables.
//!
//! # Example Configuration File
//!
//! ```toml
//! [api]
//! auth_endpoint = "https://tide.example.org/api/tide/v1/auth"
//! report_endpoint = "https://tide.example.org/api/tide/v1/audit"
//! client_id = "worker"
//! client_secret = "s3cret"
//! timeout_ms = 10000
//!
//! [dispatch]
//! max_concurrency = 8
//! work_dir = "/var/tmp/tide"
//!
//! [storage]
//! backend = "local"
//! root = "/var/lib/tide"
//! collection = "audits"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use url::Url;

use crate::store::{ArtifactStore, LocalStore, MemoryStore};

const ENV_PREFIX: &str = "TIDE_";

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration was not valid TOML for [`Config`].
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was out of range or malformed.
    #[error("invalid configuration for {field}: {message}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Downstream API settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Job dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Artifact storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Downstream API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Token endpoint for the credential exchange.
    #[serde(default)]
    pub auth_endpoint: String,
    /// Endpoint reports are posted to.
    #[serde(default)]
    pub report_endpoint: String,
    /// Client identifier (`api_key`).
    #[serde(default)]
    pub client_id: String,
    /// Client secret (`api_secret`).
    #[serde(default)]
    pub client_secret: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            auth_endpoint: String::new(),
            report_endpoint: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether credentials are configured.
    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.auth_endpoint.is_empty()
    }
}

/// Job dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of tasks running at once across all jobs.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Parent directory for per-job scratch directories.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

fn default_max_concurrency() -> usize {
    4
}

fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("tide-audit")
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            work_dir: default_work_dir(),
        }
    }
}

/// Which storage backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    /// Files on disk below `root`.
    #[default]
    Local,
    /// In-process memory.
    Memory,
}

/// Artifact storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend to build.
    #[serde(default)]
    pub backend: StorageBackendKind,
    /// Root directory for the local backend.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Collection objects are stored in.
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_storage_root() -> PathBuf {
    std::env::temp_dir().join("tide-audit-store")
}

fn default_collection() -> String {
    "audits".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::default(),
            root: default_storage_root(),
            collection: default_collection(),
        }
    }
}

impl StorageConfig {
    /// Build the configured backend.
    pub fn build(&self) -> Arc<dyn ArtifactStore> {
        match self.backend {
            StorageBackendKind::Local => Arc::new(LocalStore::new(&self.root, &self.collection)),
            StorageBackendKind::Memory => Arc::new(MemoryStore::with_collection(&self.collection)),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from `TIDE_*` environment variables over defaults.
    ///
    /// | Variable | Field |
    /// |---|---|
    /// | `TIDE_API_AUTH_ENDPOINT` | `api.auth_endpoint` |
    /// | `TIDE_API_REPORT_ENDPOINT` | `api.report_endpoint` |
    /// | `TIDE_API_CLIENT_ID` | `api.client_id` |
    /// | `TIDE_API_CLIENT_SECRET` | `api.client_secret` |
    /// | `TIDE_API_TIMEOUT_MS` | `api.timeout_ms` |
    /// | `TIDE_DISPATCH_MAX_CONCURRENCY` | `dispatch.max_concurrency` |
    /// | `TIDE_DISPATCH_WORK_DIR` | `dispatch.work_dir` |
    /// | `TIDE_STORAGE_BACKEND` | `storage.backend` (`local` / `memory`) |
    /// | `TIDE_STORAGE_ROOT` | `storage.root` |
    /// | `TIDE_STORAGE_COLLECTION` | `storage.collection` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "API_AUTH_ENDPOINT" => config.api.auth_endpoint = value,
                "API_REPORT_ENDPOINT" => config.api.report_endpoint = value,
                "API_CLIENT_ID" => config.api.client_id = value,
                "API_CLIENT_SECRET" => config.api.client_secret = value,
                "API_TIMEOUT_MS" => {
                    config.api.timeout_ms = parse_number("api.timeout_ms", &value)?;
                },
                "DISPATCH_MAX_CONCURRENCY" => {
                    config.dispatch.max_concurrency =
                        parse_number("dispatch.max_concurrency", &value)?;
                },
                "DISPATCH_WORK_DIR" => config.dispatch.work_dir = PathBuf::from(value),
                "STORAGE_BACKEND" => {
                    config.storage.backend = match value.to_ascii_lowercase().as_str() {
                        "local" => StorageBackendKind::Local,
                        "memory" => StorageBackendKind::Memory,
                        other => {
                            return Err(ConfigError::Invalid {
                                field: "storage.backend",
                                message: format!("unknown backend '{other}'"),
                            })
                        },
                    };
                },
                "STORAGE_ROOT" => config.storage.root = PathBuf::from(value),
                "STORAGE_COLLECTION" => config.storage.collection = value,
                _ => {},
            }
        }

        Ok(config)
    }

    /// Check values that serde cannot.
    ///
    /// Endpoints, when set, must be absolute URLs; concurrency must lie in
    /// `1..=Semaphore::MAX_PERMITS`; the collection must be non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("api.auth_endpoint", &self.api.auth_endpoint)?;
        validate_url("api.report_endpoint", &self.api.report_endpoint)?;

        if self.dispatch.max_concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "dispatch.max_concurrency",
                message: "must be at least 1".to_string(),
            });
        }
        if self.dispatch.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(ConfigError::Invalid {
                field: "dispatch.max_concurrency",
                message: format!("must be at most {}", Semaphore::MAX_PERMITS),
            });
        }
        if self.storage.collection.is_empty() {
            return Err(ConfigError::Invalid {
                field: "storage.collection",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Ok(());
    }
    Url::parse(value).map(|_| ()).map_err(|e| ConfigError::Invalid {
        field,
        message: format!("'{value}' is not a valid URL: {e}"),
    })
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        field,
        message: format!("'{value}' is not a number"),
    })
}
