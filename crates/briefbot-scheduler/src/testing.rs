//! Test doubles for the delivery core, shared with the gateway's tests.

use async_trait::async_trait;
use briefbot_core::{BriefError, Clock, DigestSource, Notifier, Result};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub use briefbot_core::FixedClock;

/// Records every send. Fails the next `n` sends after [`fail_next`], or
/// every send after [`fail_always`].
///
/// [`fail_next`]: RecordingNotifier::fail_next
/// [`fail_always`]: RecordingNotifier::fail_always
#[derive(Default)]
pub struct RecordingNotifier {
    attempts: Mutex<Vec<String>>,
    delivered: Mutex<Vec<String>>,
    failures_left: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn fail_always(&self) {
        self.fail_next(usize::MAX);
    }

    pub fn succeed(&self) {
        self.fail_next(0);
    }

    /// Every text handed to `send`, failed ones included.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Texts whose send succeeded.
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(text.to_string());
        }
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            if left != usize::MAX {
                self.failures_left.store(left - 1, Ordering::SeqCst);
            }
            return Err(BriefError::RetriesExhausted { attempts: 6 });
        }
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(text.to_string());
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Numbered digests: the n-th build returns `"<prefix> #n"`, so a resent
/// pending text is told apart from a rebuilt one.
pub struct CountingDigest {
    prefix: String,
    builds: AtomicUsize,
}

impl CountingDigest {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DigestSource for CountingDigest {
    async fn build(&self) -> String {
        let n = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{} #{n}", self.prefix)
    }
}

/// Wall clock driven by tokio time, for paused-time timer tests.
pub struct TokioClock {
    base: DateTime<Utc>,
    started: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            started: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.started.elapsed();
        self.base + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero())
    }
}

/// UTC instant from calendar fields. Panics on an invalid date.
pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    match Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single() {
        Some(t) => t,
        None => panic!("invalid test date {y}-{mo}-{d} {h}:{mi}"),
    }
}
