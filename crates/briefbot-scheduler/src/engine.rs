//! Timer loop: sleep until the next cron slot, fire a supervised scheduled
//! run, and sweep expired store entries in between.

use std::sync::Arc;
use std::time::Duration;

use briefbot_core::{Clock, KvStore};
use chrono_tz::Tz;
use tokio::task::JoinHandle;

use crate::cron::Schedule;
use crate::delivery::DeliveryCore;

/// Run one scheduled invocation in the background. Errors and panics are
/// logged; nothing propagates to the caller.
pub fn spawn_supervised(core: Arc<DeliveryCore>) -> JoinHandle<()> {
    let run = tokio::spawn(async move { core.run_scheduled().await });
    tokio::spawn(async move {
        match run.await {
            Ok(Ok(outcome)) => tracing::info!("⏰ Scheduled run finished: {outcome}"),
            Ok(Err(e)) if e.is_rate_limited() => {
                tracing::warn!("⏳ Scheduled run hit the Telegram rate limit, digest queued: {e}")
            }
            Ok(Err(e)) => tracing::error!("❌ Scheduled run failed: {e}"),
            Err(e) => tracing::error!("💥 Scheduled run aborted: {e}"),
        }
    })
}

/// Drive the schedule forever. Returns only when the schedule yields no
/// further fire time.
pub async fn run_timer(
    core: Arc<DeliveryCore>,
    schedule: Schedule,
    tz: Tz,
    clock: Arc<dyn Clock>,
    store: Arc<dyn KvStore>,
    sweep_every: Duration,
) {
    let slots: Vec<&str> = schedule.expressions().iter().map(|e| e.as_str()).collect();
    tracing::info!("⏰ Timer started ({}) in {tz}", slots.join(", "));

    let mut sweep = tokio::time::interval(sweep_every.max(Duration::from_secs(1)));
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last_fire = None;

    loop {
        let now = clock.now();
        // a fire time never repeats, even if the clock lags the sleep
        let after = match last_fire {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        let Some(next) = schedule.next_after(after, tz) else {
            tracing::warn!("⚠️ Schedule has no upcoming fire time, timer stopped");
            return;
        };
        let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::debug!("⏰ Next run at {next} (in {}s)", delay.as_secs());

        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                _ = sweep.tick() => match store.sweep().await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!("🧹 Swept {n} expired entries from {}", store.name()),
                    Err(e) => tracing::warn!("⚠️ Store sweep failed: {e}"),
                },
            }
        }

        spawn_supervised(core.clone());
        last_fire = Some(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingDigest, RecordingNotifier, TokioClock, utc};
    use briefbot_store::MemoryStore;

    struct Rig {
        store: Arc<MemoryStore>,
        notifier: Arc<RecordingNotifier>,
        core: Arc<DeliveryCore>,
        clock: Arc<TokioClock>,
    }

    fn rig(start_utc: chrono::DateTime<chrono::Utc>) -> Rig {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(TokioClock::starting_at(start_utc));
        let core = Arc::new(DeliveryCore::new(
            store.clone(),
            notifier.clone(),
            Arc::new(CountingDigest::new("📌 digest")),
            clock.clone(),
            chrono_tz::Europe::Istanbul,
        ));
        Rig {
            store,
            notifier,
            core,
            clock,
        }
    }

    fn schedule(exprs: &[&str]) -> Schedule {
        let exprs: Vec<String> = exprs.iter().map(|s| s.to_string()).collect();
        Schedule::parse_all(&exprs).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_slot_and_retry_slots_noop() {
        // 07:59 Istanbul
        let rig = rig(utc(2026, 10, 16, 4, 59));
        let timer = tokio::spawn(run_timer(
            rig.core.clone(),
            schedule(&["0 8 * * *", "15 8 * * *", "30 8 * * *"]),
            chrono_tz::Europe::Istanbul,
            rig.clock.clone(),
            rig.store.clone(),
            Duration::from_secs(600),
        ));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rig.notifier.attempts().is_empty());

        tokio::time::sleep(Duration::from_secs(45 * 60)).await;
        timer.abort();

        // three slots fired, only the first one sent
        assert_eq!(rig.notifier.delivered(), vec!["📌 digest #1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_slot_is_retried_by_next_slot() {
        let rig = rig(utc(2026, 10, 16, 4, 59));
        rig.notifier.fail_next(1);
        let timer = tokio::spawn(run_timer(
            rig.core.clone(),
            schedule(&["0 8 * * *", "15 8 * * *"]),
            chrono_tz::Europe::Istanbul,
            rig.clock.clone(),
            rig.store.clone(),
            Duration::from_secs(600),
        ));

        tokio::time::sleep(Duration::from_secs(20 * 60)).await;
        timer.abort();

        let attempts = rig.notifier.attempts();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0], attempts[1]);
        assert_eq!(rig.notifier.delivered(), vec!["📌 digest #1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_expired_entries() {
        let rig = rig(utc(2026, 10, 16, 4, 0));
        rig.store.put("cache/x", "v", Duration::from_secs(5)).await.unwrap();
        let timer = tokio::spawn(run_timer(
            rig.core.clone(),
            schedule(&["0 8 * * *"]),
            chrono_tz::Europe::Istanbul,
            rig.clock.clone(),
            rig.store.clone(),
            Duration::from_secs(60),
        ));

        tokio::time::sleep(Duration::from_secs(90)).await;
        timer.abort();
        assert!(rig.store.is_empty().await);
    }
}
