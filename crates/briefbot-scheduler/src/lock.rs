//! TTL lock over the key/value store.
//!
//! Check-then-put with no compare-and-swap: two invocations racing inside the
//! same instant can both acquire. The lock is never released explicitly; it
//! expires with its TTL.

use briefbot_core::{KvStore, Result};
use std::sync::Arc;
use std::time::Duration;

pub struct TtlLock {
    store: Arc<dyn KvStore>,
    key: &'static str,
    ttl: Duration,
}

impl TtlLock {
    pub fn new(store: Arc<dyn KvStore>, key: &'static str, ttl: Duration) -> Self {
        Self { store, key, ttl }
    }

    /// `Ok(false)` while another holder's entry is still alive.
    pub async fn try_acquire(&self) -> Result<bool> {
        if self.store.get(self.key).await?.is_some() {
            tracing::debug!("🔒 '{}' is held", self.key);
            return Ok(false);
        }
        self.store.put(self.key, "1", self.ttl).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefbot_store::MemoryStore;

    #[tokio::test(start_paused = true)]
    async fn test_held_until_ttl_expires() {
        let lock = TtlLock::new(Arc::new(MemoryStore::new()), "lock/test", Duration::from_secs(60));
        assert!(lock.try_acquire().await.unwrap());
        assert!(!lock.try_acquire().await.unwrap());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!lock.try_acquire().await.unwrap());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(lock.try_acquire().await.unwrap());
    }
}
