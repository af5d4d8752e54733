//! Store configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a valid
//! configuration for a volatile store hosting the `items` collection.
//!
//! ```json
//! {
//!   "collections": ["items", "notes"],
//!   "data_dir": "./data",
//!   "nonce_skew_secs": 18000,
//!   "trust_owner": "openid",
//!   "log_level": "info",
//!   "fsync": true
//! }
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;
use crate::trust::{ASSOCIATIONS_COLLECTION, NONCES_COLLECTION};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Hosted collections (default: ["items"])
    #[serde(default = "default_collections")]
    pub collections: Vec<String>,

    /// Journal directory; `None` keeps everything in memory
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Allowed nonce clock skew in seconds (default: 5 hours)
    #[serde(default = "default_nonce_skew_secs")]
    pub nonce_skew_secs: i64,

    /// Owner identity for trust-handshake artifacts (default: "openid")
    #[serde(default = "default_trust_owner")]
    pub trust_owner: String,

    /// Minimum log severity (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Sync the journal after every append (default: true)
    #[serde(default = "default_fsync")]
    pub fsync: bool,
}

fn default_collections() -> Vec<String> {
    vec!["items".to_string()]
}

fn default_nonce_skew_secs() -> i64 {
    5 * 60 * 60
}

fn default_trust_owner() -> String {
    "openid".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fsync() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collections: default_collections(),
            data_dir: None,
            nonce_skew_secs: default_nonce_skew_secs(),
            trust_owner: default_trust_owner(),
            log_level: default_log_level(),
            fsync: default_fsync(),
        }
    }
}

impl StoreConfig {
    /// Volatile store hosting `collections`.
    pub fn in_memory<I, S>(collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collections: collections.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Durable store journaling into `data_dir`.
    pub fn durable(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            ..Default::default()
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: StoreConfig = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.collections.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one collection must be hosted".into(),
            ));
        }

        for name in &self.collections {
            if name.is_empty() || name.contains('/') {
                return Err(ConfigError::Invalid(format!(
                    "invalid collection name '{}': must be non-empty and contain no '/'",
                    name
                )));
            }
        }

        if self.nonce_skew_secs < 0 {
            return Err(ConfigError::Invalid("nonce_skew_secs must be >= 0".into()));
        }

        if self.trust_owner.is_empty() {
            return Err(ConfigError::Invalid("trust_owner must not be empty".into()));
        }

        self.severity()?;

        Ok(())
    }

    /// Configured collections plus the trust-handshake collections.
    pub fn hosted_collections(&self) -> BTreeSet<String> {
        self.collections
            .iter()
            .cloned()
            .chain([
                ASSOCIATIONS_COLLECTION.to_string(),
                NONCES_COLLECTION.to_string(),
            ])
            .collect()
    }

    /// Parsed `log_level`.
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }
}
