//! The one digest per day awaiting delivery after a failed send.

use briefbot_core::{KvStore, Result};
use std::sync::Arc;

use crate::keys::{PENDING_TTL, pending_key};

pub struct PendingStore {
    store: Arc<dyn KvStore>,
}

impl PendingStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self, date: &str) -> Result<Option<String>> {
        self.store.get(&pending_key(date)).await
    }

    /// Overwrites any earlier pending text for the same date.
    pub async fn save(&self, date: &str, text: &str) -> Result<()> {
        self.store.put(&pending_key(date), text, PENDING_TTL).await
    }

    pub async fn clear(&self, date: &str) -> Result<()> {
        self.store.delete(&pending_key(date)).await
    }
}
