//! SQLite-backed TTL store that survives restarts.
//! One `kv` table; expiry stored as Unix milliseconds of the wall clock.

use async_trait::async_trait;
use briefbot_core::{BriefError, KvStore, Result};
use rusqlite::{OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

pub struct SqliteStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    /// Open or create the store database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = rusqlite::Connection::open(path).map_err(|e| store_err("DB open", e))?;
        Self::with_connection(conn)
    }

    /// Private in-memory database, handy for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(|e| store_err("DB open", e))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: rusqlite::Connection) -> Result<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                expires_at INTEGER NOT NULL     -- unix millis
            );
            CREATE INDEX IF NOT EXISTS kv_expires_at ON kv(expires_at);
            ",
        )
        .map_err(|e| store_err("Migration", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&rusqlite::Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| BriefError::Store("SQLite connection mutex poisoned".into()))?;
        f(&conn)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn store_err(context: &str, e: rusqlite::Error) -> BriefError {
    BriefError::Store(format!("{context}: {e}"))
}

#[async_trait]
impl KvStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM kv WHERE key = ?1 AND expires_at > ?2",
                params![key, now_millis()],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| store_err("Get", e))
        })
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now_millis().saturating_add(ttl_ms);
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
                params![key, value, expires_at],
            )
            .map_err(|e| store_err("Put", e))?;
            Ok(())
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
                .map_err(|e| store_err("Delete", e))?;
            Ok(())
        })
    }

    async fn sweep(&self) -> Result<usize> {
        let removed = self.with_conn(|conn| {
            conn.execute("DELETE FROM kv WHERE expires_at <= ?1", params![now_millis()])
                .map_err(|e| store_err("Sweep", e))
        })?;
        if removed > 0 {
            tracing::debug!("🧹 Swept {removed} expired key(s)");
        }
        Ok(removed)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_and_overwrite() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ttl = Duration::from_secs(3600);
        store.put("pending/20261016", "first", ttl).await.unwrap();
        store.put("pending/20261016", "second", ttl).await.unwrap();
        assert_eq!(
            store.get("pending/20261016").await.unwrap().as_deref(),
            Some("second")
        );
        store.delete("pending/20261016").await.unwrap();
        assert!(store.get("pending/20261016").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_reads_absent_and_sweeps() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put("gone", "1", Duration::ZERO).await.unwrap();
        store.put("kept", "1", Duration::from_secs(3600)).await.unwrap();
        assert!(store.get("gone").await.unwrap().is_none());
        assert_eq!(store.sweep().await.unwrap(), 1);
        assert!(store.get("kept").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .put("sent/20261016", "1", Duration::from_secs(82_800))
                .await
                .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("sent/20261016").await.unwrap().as_deref(), Some("1"));
    }
}
