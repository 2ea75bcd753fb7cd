//! # BriefBot Sources
//!
//! Fetch-and-format adapters for each upstream, plus the pieces that turn
//! their output into one digest.
//!
//! ## Architecture
//! ```text
//! DigestBuilder::build()
//!   ├── Aggregator (all four concurrently, failures → fallback line)
//!   │     ├── WeatherSource  → Open-Meteo forecast
//!   │     ├── MetalsSource   → Stooq CSV (cache on failure)
//!   │     ├── CryptoSource   → CoinGecko simple price (10 min cache)
//!   │     └── MatchesSource  → ESPN scoreboards (15 min cache)
//!   └── compose() → header + sections (+ debug block)
//! ```

pub mod aggregator;
pub mod builder;
pub mod compose;
pub mod crypto;
pub mod format;
pub mod http;
pub mod matches;
pub mod metals;
pub mod weather;

pub use aggregator::{Aggregator, Sections, SourceReport, SourceStatus};
pub use builder::DigestBuilder;

use async_trait::async_trait;
use briefbot_core::{Clock, KvStore, Result};
use chrono_tz::Tz;
use std::sync::Arc;

/// Text produced by an adapter and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Sourced {
    pub text: String,
    /// True when the upstream failed and a cached line was served instead.
    pub from_fallback_cache: bool,
}

impl Sourced {
    pub fn fresh(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_fallback_cache: false,
        }
    }

    pub fn cache_fallback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_fallback_cache: true,
        }
    }
}

/// One upstream data provider.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable label used in the status report.
    fn label(&self) -> &'static str;

    /// Line used when `fetch` fails.
    fn fallback(&self) -> &'static str;

    async fn fetch(&self) -> Result<Sourced>;
}

/// Shared handles every adapter needs.
#[derive(Clone)]
pub struct SourceContext {
    pub client: reqwest::Client,
    pub store: Arc<dyn KvStore>,
    pub clock: Arc<dyn Clock>,
    pub tz: Tz,
}
