//! # BriefBot Core
//!
//! Shared building blocks for the digest bot: configuration, the error type,
//! timezone-aware clock helpers, and the traits that sit at the seams between
//! crates (store, notifier, digest source).

pub mod clock;
pub mod config;
pub mod error;
pub mod text;
pub mod traits;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::BriefConfig;
pub use error::{BriefError, Result};
pub use traits::{DigestSource, KvStore, Notifier};
