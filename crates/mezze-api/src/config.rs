//! # Engine Configuration
//!
//! Where the database lives, how order and receipt numbers look, and what
//! the store is called.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MEZZE_DB_PATH=/srv/mezze/pos.db                                    │
//! │     MEZZE_ORDER_PREFIX=MZ                                              │
//! │     MEZZE_RECEIPT_PREFIX=RC                                            │
//! │     MEZZE_STORE_NAME="Mezze Harbourside"                               │
//! │     MEZZE_MAX_NUMBERING_ATTEMPTS=5                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $MEZZE_CONFIG, or                                                  │
//! │     ~/.config/mezze-pos/mezze.toml (Linux)                             │
//! │     ~/Library/Application Support/com.mezze.pos/mezze.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     platform data dir/mezze.db, ORD / RC prefixes, 5 attempts          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # mezze.toml
//! [store]
//! name = "Mezze Harbourside"
//!
//! [database]
//! path = "/srv/mezze/pos.db"
//! max_connections = 5
//!
//! [numbering]
//! order_prefix = "ORD"
//! receipt_prefix = "RC"
//! max_attempts = 5
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use mezze_db::{DbConfig, NumberingConfig};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "MEZZE_CONFIG";

const ENV_DB_PATH: &str = "MEZZE_DB_PATH";
const ENV_ORDER_PREFIX: &str = "MEZZE_ORDER_PREFIX";
const ENV_RECEIPT_PREFIX: &str = "MEZZE_RECEIPT_PREFIX";
const ENV_STORE_NAME: &str = "MEZZE_STORE_NAME";
const ENV_MAX_ATTEMPTS: &str = "MEZZE_MAX_NUMBERING_ATTEMPTS";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Could not determine app data directory")]
    NoDataDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Printed on receipts by the UI.
    #[serde(default = "default_store_name")]
    pub name: String,
}

fn default_store_name() -> String {
    "Mezze Kitchen".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberingSettings {
    #[serde(default = "default_order_prefix")]
    pub order_prefix: String,

    #[serde(default = "default_receipt_prefix")]
    pub receipt_prefix: String,

    /// Collision retries before a sale is refused.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_order_prefix() -> String {
    NumberingConfig::default().order_prefix
}

fn default_receipt_prefix() -> String {
    NumberingConfig::default().receipt_prefix
}

fn default_max_attempts() -> u32 {
    NumberingConfig::default().max_attempts
}

impl Default for NumberingSettings {
    fn default() -> Self {
        NumberingSettings {
            order_prefix: default_order_prefix(),
            receipt_prefix: default_receipt_prefix(),
            max_attempts: default_max_attempts(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub numbering: NumberingSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`$MEZZE_CONFIG` or the platform `mezze.toml`)
    /// 3. Environment variables
    pub fn load() -> ConfigResult<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(Self::default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Reads a TOML config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        info!(?path, "Loading engine config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `MEZZE_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(prefix) = lookup(ENV_ORDER_PREFIX) {
            self.numbering.order_prefix = prefix;
        }

        if let Some(prefix) = lookup(ENV_RECEIPT_PREFIX) {
            self.numbering.receipt_prefix = prefix;
        }

        if let Some(name) = lookup(ENV_STORE_NAME) {
            self.store.name = name;
        }

        if let Some(attempts) = lookup(ENV_MAX_ATTEMPTS) {
            self.numbering.max_attempts =
                attempts
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: ENV_MAX_ATTEMPTS.to_string(),
                        value: attempts.clone(),
                    })?;
        }

        Ok(())
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        for (key, prefix) in [
            ("numbering.order_prefix", &self.numbering.order_prefix),
            ("numbering.receipt_prefix", &self.numbering.receipt_prefix),
        ] {
            if prefix.trim().is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: prefix.clone(),
                });
            }
        }

        if self.numbering.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "numbering.max_attempts".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    pub fn numbering_config(&self) -> NumberingConfig {
        NumberingConfig {
            order_prefix: self.numbering.order_prefix.clone(),
            receipt_prefix: self.numbering.receipt_prefix.clone(),
            max_attempts: self.numbering.max_attempts,
        }
    }

    /// Builds the pool configuration, resolving the database path.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.mezze.pos/mezze.db`
    /// - **Windows**: `%APPDATA%\mezze\pos\data\mezze.db`
    /// - **Linux**: `~/.local/share/mezze-pos/mezze.db`
    pub fn db_config(&self) -> ConfigResult<DbConfig> {
        let path = match &self.database.path {
            Some(path) => path.clone(),
            None => Self::default_database_path()?,
        };

        let mut config = DbConfig::new(path).numbering(self.numbering_config());
        if let Some(max) = self.database.max_connections {
            config = config.max_connections(max);
        }

        Ok(config)
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "mezze", "pos")
            .map(|dirs| dirs.config_dir().join("mezze.toml"))
    }

    fn default_database_path() -> ConfigResult<PathBuf> {
        let dirs =
            directories::ProjectDirs::from("com", "mezze", "pos").ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();

        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;

        Ok(data_dir.join("mezze.db"))
    }
}
