//! Seam traits between crates.
//!
//! Every stateful mechanism (locks, dedupe marker, pending message, source
//! caches) is expressed through [`KvStore`] alone, so any TTL-capable backend
//! can stand in.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// TTL key/value store. Whole-value reads and overwrites on single keys,
/// last write wins, no compare-and-swap.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write (or overwrite) a value that expires after `ttl`.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Drop expired entries, returning how many were removed.
    async fn sweep(&self) -> Result<usize> {
        Ok(0)
    }

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// Delivers a finished digest to the destination chat.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;

    fn name(&self) -> &str;
}

/// Produces a fresh digest text. Never fails: source failures are absorbed
/// into fallback lines.
#[async_trait]
pub trait DigestSource: Send + Sync {
    async fn build(&self) -> String;
}
