//! Delivery reliability core.
//!
//! Scheduled runs go `LOCK → PENDING → DEDUPE → BUILD → SEND → MARK`:
//!
//! 1. `lock/cron` held → [`RunOutcome::Locked`]; otherwise take it for 120s.
//! 2. `pending/<today>` present → resend it verbatim. On success clear it and
//!    mark the day sent; on failure leave it for the next slot.
//! 3. `sent/<today>` present → [`RunOutcome::AlreadySent`].
//! 4. Build a fresh digest and send it. On failure the text is stored as
//!    pending for 48h and the error is returned. There is no second attempt
//!    inside the same run.
//!
//! Manual runs swap the execution lock for the `lock/run` rate gate and skip
//! the dedupe check, but otherwise follow the same pending-first path.

use briefbot_core::clock::date_key;
use briefbot_core::{Clock, DigestSource, KvStore, Notifier, Result};
use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;

use crate::keys::{CRON_LOCK_KEY, CRON_LOCK_TTL, RUN_GATE_KEY, RUN_GATE_TTL};
use crate::lock::TtlLock;
use crate::marker::SentMarker;
use crate::pending::PendingStore;

/// How a scheduled run ended. Errors are returned separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run holds the execution lock.
    Locked,
    /// A pending digest from an earlier failure was delivered.
    SentPending,
    /// Today's digest already went out.
    AlreadySent,
    /// A freshly built digest was delivered.
    Sent,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunOutcome::Locked => "locked",
            RunOutcome::SentPending => "sent pending",
            RunOutcome::AlreadySent => "already sent",
            RunOutcome::Sent => "sent",
        };
        f.write_str(s)
    }
}

/// How a manual run ended. Manual runs never return an error: every failure
/// is folded into [`ManualOutcome::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManualOutcome {
    /// The rate gate is closed.
    RateLimited,
    Sent,
    SentPending,
    /// `queued` tells whether a digest now waits in the pending slot.
    Failed { reason: String, queued: bool },
}

pub struct DeliveryCore {
    store: Arc<dyn KvStore>,
    notifier: Arc<dyn Notifier>,
    digest: Arc<dyn DigestSource>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    daily_dedupe: bool,
}

impl DeliveryCore {
    pub fn new(
        store: Arc<dyn KvStore>,
        notifier: Arc<dyn Notifier>,
        digest: Arc<dyn DigestSource>,
        clock: Arc<dyn Clock>,
        tz: Tz,
    ) -> Self {
        Self {
            store,
            notifier,
            digest,
            clock,
            tz,
            daily_dedupe: true,
        }
    }

    pub fn with_daily_dedupe(mut self, enabled: bool) -> Self {
        self.daily_dedupe = enabled;
        self
    }

    fn today(&self) -> String {
        date_key(self.clock.now(), self.tz)
    }

    fn pending(&self) -> PendingStore {
        PendingStore::new(self.store.clone())
    }

    fn marker(&self) -> SentMarker {
        SentMarker::new(self.store.clone())
    }

    async fn mark_sent(&self, date: &str) -> Result<()> {
        if self.daily_dedupe {
            self.marker().mark(date).await?;
        }
        Ok(())
    }

    /// One timer-triggered invocation.
    pub async fn run_scheduled(&self) -> Result<RunOutcome> {
        let lock = TtlLock::new(self.store.clone(), CRON_LOCK_KEY, CRON_LOCK_TTL);
        if !lock.try_acquire().await? {
            tracing::info!("🔒 Scheduled run skipped: another run holds the lock");
            return Ok(RunOutcome::Locked);
        }

        let date = self.today();
        let pending = self.pending();

        if let Some(text) = pending.load(&date).await? {
            tracing::info!("📤 Resending pending digest for {date}");
            self.notifier.send(&text).await?;
            pending.clear(&date).await?;
            self.mark_sent(&date).await?;
            tracing::info!("✅ Pending digest for {date} delivered");
            return Ok(RunOutcome::SentPending);
        }

        if self.daily_dedupe && self.marker().is_sent(&date).await? {
            tracing::info!("📭 Digest for {date} already sent");
            return Ok(RunOutcome::AlreadySent);
        }

        let text = self.digest.build().await;
        if let Err(e) = self.notifier.send(&text).await {
            tracing::warn!("⚠️ Send failed, queueing digest for {date}: {e}");
            pending.save(&date, &text).await?;
            return Err(e);
        }
        self.mark_sent(&date).await?;
        tracing::info!("✅ Digest for {date} sent");
        Ok(RunOutcome::Sent)
    }

    /// One manual invocation (not a dry run).
    pub async fn run_manual(&self) -> ManualOutcome {
        match self.try_run_manual().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("⚠️ Manual run failed: {e}");
                ManualOutcome::Failed {
                    reason: e.to_string(),
                    queued: false,
                }
            }
        }
    }

    async fn try_run_manual(&self) -> Result<ManualOutcome> {
        let gate = TtlLock::new(self.store.clone(), RUN_GATE_KEY, RUN_GATE_TTL);
        if !gate.try_acquire().await? {
            return Ok(ManualOutcome::RateLimited);
        }

        let date = self.today();
        let pending = self.pending();

        if let Some(text) = pending.load(&date).await? {
            tracing::info!("📤 Manual run: resending pending digest for {date}");
            if let Err(e) = self.notifier.send(&text).await {
                tracing::warn!("⚠️ Pending digest still undeliverable: {e}");
                return Ok(ManualOutcome::Failed {
                    reason: e.to_string(),
                    queued: true,
                });
            }
            pending.clear(&date).await?;
            self.mark_sent(&date).await?;
            return Ok(ManualOutcome::SentPending);
        }

        let text = self.digest.build().await;
        if let Err(e) = self.notifier.send(&text).await {
            let queued = match pending.save(&date, &text).await {
                Ok(()) => true,
                Err(store_err) => {
                    tracing::warn!("⚠️ Could not queue digest for {date}: {store_err}");
                    false
                }
            };
            return Ok(ManualOutcome::Failed {
                reason: e.to_string(),
                queued,
            });
        }
        self.mark_sent(&date).await?;
        tracing::info!("✅ Manual digest for {date} sent");
        Ok(ManualOutcome::Sent)
    }

    /// Build a digest without touching any state.
    pub async fn preview(&self) -> String {
        self.digest.build().await
    }
}
