//! # BriefBot Scheduler
//!
//! Everything that decides *whether* and *what* to send.
//!
//! ## Architecture
//! ```text
//! Timer (tokio sleep until next cron slot)
//!   └── spawn_supervised → DeliveryCore::run_scheduled
//!         LOCK → PENDING → DEDUPE → BUILD → SEND → MARK
//!
//! Gateway /run → DeliveryCore::run_manual
//!         RATE GATE → PENDING → BUILD → SEND → MARK
//! ```
//!
//! All state (locks, sent marker, pending message) lives in a [`KvStore`]
//! with TTLs; nothing here holds state across invocations.
//!
//! [`KvStore`]: briefbot_core::KvStore

pub mod cron;
pub mod delivery;
pub mod engine;
pub mod keys;
pub mod lock;
pub mod marker;
pub mod pending;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cron::{CronExpr, Schedule};
pub use delivery::{DeliveryCore, ManualOutcome, RunOutcome};
pub use engine::{run_timer, spawn_supervised};
