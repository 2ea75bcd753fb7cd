//! Once-per-day sent marker.

use briefbot_core::{KvStore, Result};
use std::sync::Arc;

use crate::keys::{SENT_TTL, sent_key};

pub struct SentMarker {
    store: Arc<dyn KvStore>,
}

impl SentMarker {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn is_sent(&self, date: &str) -> Result<bool> {
        Ok(self.store.get(&sent_key(date)).await?.is_some())
    }

    pub async fn mark(&self, date: &str) -> Result<()> {
        self.store.put(&sent_key(date), "1", SENT_TTL).await
    }
}
