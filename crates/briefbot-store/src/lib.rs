//! # BriefBot Store
//!
//! TTL key/value backends for the [`KvStore`] trait.
//!
//! - [`MemoryStore`]: in-process map, lost on restart, zero setup
//! - [`SqliteStore`]: single-file table, survives restarts

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use briefbot_core::config::{StoreBackend, StoreConfig};
use briefbot_core::{KvStore, Result};
use std::sync::Arc;

/// Open the backend named in config.
pub fn open(config: &StoreConfig) -> Result<Arc<dyn KvStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("🗄️ Using in-memory store (state is lost on restart)");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            let path = config.expanded_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let store = SqliteStore::open(&path)?;
            tracing::info!("🗄️ Using SQLite store: {}", path.display());
            Ok(Arc::new(store))
        }
    }
}
