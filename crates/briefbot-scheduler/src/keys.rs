//! Store keys and their lifetimes.
//!
//! Date-scoped keys take the `YYYYMMDD` of the configured timezone, so "today"
//! does not depend on the host zone.

use std::time::Duration;

/// Held while a scheduled run is in progress.
pub const CRON_LOCK_KEY: &str = "lock/cron";
pub const CRON_LOCK_TTL: Duration = Duration::from_secs(120);

/// Rate gate for manual runs.
pub const RUN_GATE_KEY: &str = "lock/run";
pub const RUN_GATE_TTL: Duration = Duration::from_secs(60);

/// 23 hours: a day's marker cannot leak into the next day's first slot.
pub const SENT_TTL: Duration = Duration::from_secs(23 * 60 * 60);

/// 48 hours.
pub const PENDING_TTL: Duration = Duration::from_secs(48 * 60 * 60);

pub fn sent_key(date: &str) -> String {
    format!("sent/{date}")
}

pub fn pending_key(date: &str) -> String {
    format!("pending/{date}")
}
