//! Ledger configuration.
//!
//! Loaded from `ledger.toml` next to the data directory when present;
//! a missing file means defaults (not an error).

use crate::core::error::LedgerError;
use crate::core::event_log;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Single relational file, one logical table.
    #[default]
    Sqlite,
    /// One durable JSON-array file per collection.
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_retention")]
    pub retention: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            retention: default_retention(),
        }
    }
}

fn default_max_bytes() -> u64 {
    event_log::DEFAULT_MAX_BYTES
}

fn default_retention() -> usize {
    event_log::DEFAULT_RETENTION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub backend: BackendKind,
    pub data_dir: PathBuf,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub event_log: EventLogConfig,
}

impl LedgerConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::default(),
            data_dir: data_dir.into(),
            read_only: false,
            event_log: EventLogConfig::default(),
        }
    }

    /// Load `<root>/ledger.toml`, defaulting the data directory to
    /// `<root>/data`. Absent file = defaults.
    pub fn load(root: &Path) -> Result<Self, LedgerError> {
        let config_path = root.join("ledger.toml");
        if !config_path.exists() {
            return Ok(Self::new(root.join("data")));
        }
        let content = fs::read_to_string(&config_path)?;
        let mut config: LedgerConfig =
            toml::from_str(&content).map_err(|e| LedgerError::Config(e.to_string()))?;
        if config.data_dir.is_relative() {
            config.data_dir = root.join(&config.data_dir);
        }
        Ok(config)
    }

    pub fn write_default(root: &Path) -> Result<PathBuf, LedgerError> {
        let config_path = root.join("ledger.toml");
        let config = Self::new(PathBuf::from("data"));
        let body = toml::to_string_pretty(&config).map_err(|e| LedgerError::Config(e.to_string()))?;
        fs::write(&config_path, body)?;
        Ok(config_path)
    }
}
