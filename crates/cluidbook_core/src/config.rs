//! Core configuration.
//!
//! # Responsibility
//! - Carry the fixed storage keys and logging defaults.
//! - Load optional TOML overrides from disk.
//!
//! # Invariants
//! - Storage keys are non-blank and distinct after validation.
//! - Missing TOML keys fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default key of the id → record mapping.
pub const DEFAULT_RECORDS_KEY: &str = "cluidRecords";
/// Default key of the last active id pointer.
pub const DEFAULT_LAST_ACTIVE_KEY: &str = "lastActiveCluid";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Key-value keys used by the record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    pub records: String,
    pub last_active: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            records: DEFAULT_RECORDS_KEY.to_string(),
            last_active: DEFAULT_LAST_ACTIVE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub records_key: String,
    pub last_active_key: String,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            records_key: DEFAULT_RECORDS_KEY.to_string(),
            last_active_key: DEFAULT_LAST_ACTIVE_KEY.to_string(),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            db_path: None,
        }
    }
}

impl CoreConfig {
    /// Reads and validates a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let records = self.records_key.trim();
        let last_active = self.last_active_key.trim();
        if records.is_empty() || last_active.is_empty() {
            return Err(ConfigError::Invalid(
                "storage keys must not be blank".to_string(),
            ));
        }
        if records == last_active {
            return Err(ConfigError::Invalid(format!(
                "records_key and last_active_key must differ, both are `{records}`"
            )));
        }
        Ok(())
    }

    pub fn store_keys(&self) -> StoreKeys {
        StoreKeys {
            records: self.records_key.trim().to_string(),
            last_active: self.last_active_key.trim().to_string(),
        }
    }
}
