//! # Engine Handle
//!
//! Wraps the `Database` and the loaded configuration for use in commands.
//!
//! ## Thread Safety
//! The `Database` from `mezze-db` holds a `SqlitePool`, which is safe to
//! share. Commands take `&PosEngine` and can run concurrently; SQLite
//! serialises the writes.

use tracing::info;

use mezze_db::{Database, DbConfig};

use crate::config::EngineConfig;
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct PosEngine {
    db: Database,
    config: EngineConfig,
}

impl PosEngine {
    /// Connects to the configured database and applies migrations.
    pub async fn open(config: EngineConfig) -> Result<Self, ApiError> {
        let db_config = config.db_config()?;

        let db = Database::new(db_config).await?;

        info!(store = %config.store.name, "Engine ready");

        Ok(PosEngine { db, config })
    }

    /// Private in-memory engine, used by tests and demos.
    pub async fn open_in_memory(config: EngineConfig) -> Result<Self, ApiError> {
        let db_config = DbConfig::in_memory().numbering(config.numbering_config());
        let db = Database::new(db_config).await?;

        Ok(PosEngine { db, config })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn close(&self) {
        self.db.close().await;
    }
}
