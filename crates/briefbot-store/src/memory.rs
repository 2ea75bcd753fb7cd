//! In-memory TTL store.
//! Expiry runs on `tokio::time::Instant`, so paused-clock tests can step past TTLs.

use async_trait::async_trait;
use briefbot_core::{KvStore, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// HashMap-backed store with per-entry expiry.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries held, expired ones included until swept.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn sweep(&self) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        Ok(before - entries.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_put_get_until_expiry() {
        let store = MemoryStore::new();
        store
            .put("lock/cron", "1", Duration::from_secs(120))
            .await
            .unwrap();
        assert_eq!(store.get("lock/cron").await.unwrap().as_deref(), Some("1"));

        tokio::time::advance(Duration::from_secs(119)).await;
        assert!(store.get("lock/cron").await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get("lock/cron").await.unwrap().is_none());
        // lazily evicted on read
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_resets_ttl() {
        let store = MemoryStore::new();
        store.put("k", "a", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        store.put("k", "b", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let store = MemoryStore::new();
        store.delete("pending/20260101").await.unwrap();
        store.put("k", "v", Duration::from_secs(60)).await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_only_expired() {
        let store = MemoryStore::new();
        store.put("short", "1", Duration::from_secs(60)).await.unwrap();
        store.put("long", "1", Duration::from_secs(3600)).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.sweep().await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get("long").await.unwrap().is_some());
    }
}
