//! Gold/silver line from Stooq daily CSV quotes.
//!
//! The formatted line is cached for 6 hours but only read back when a fresh
//! fetch fails, so a Stooq outage still yields yesterday's closes.

use async_trait::async_trait;
use briefbot_core::config::MetalsConfig;
use briefbot_core::{BriefError, Result};
use std::time::Duration;

use crate::format::fmt_pct;
use crate::{Source, SourceContext, Sourced, http};

const STOOQ_BASE: &str = "https://stooq.com";
const CACHE_KEY: &str = "cache/stooq/xau-xag";
const CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Latest close and its change against the previous row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloseChange {
    pub last_close: f64,
    pub pct: f64,
}

pub struct MetalsSource {
    ctx: SourceContext,
    symbols: MetalsConfig,
    base_url: String,
}

impl MetalsSource {
    pub fn new(ctx: SourceContext, symbols: MetalsConfig) -> Self {
        Self {
            ctx,
            symbols,
            base_url: STOOQ_BASE.into(),
        }
    }

    /// Point at a different Stooq host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn last_two_closes(&self, symbol: &str) -> Result<CloseChange> {
        let req = self
            .ctx
            .client
            .get(format!("{}/q/d/l/", self.base_url))
            .query(&[("s", symbol), ("i", "d")])
            .header("Accept", "text/csv");
        let csv = http::fetch_text(req).await?;
        parse_last_two_closes(symbol, &csv)
    }

    async fn fetch_fresh(&self) -> Result<String> {
        let (gold, silver) = futures::try_join!(
            self.last_two_closes(&self.symbols.gold_symbol),
            self.last_two_closes(&self.symbols.silver_symbol),
        )?;
        Ok(format_metals(gold, silver))
    }
}

#[async_trait]
impl Source for MetalsSource {
    fn label(&self) -> &'static str {
        "stooq_metals"
    }

    fn fallback(&self) -> &'static str {
        "🥇 N/A  🥈 N/A"
    }

    async fn fetch(&self) -> Result<Sourced> {
        match self.fetch_fresh().await {
            Ok(text) => {
                if let Err(e) = self.ctx.store.put(CACHE_KEY, &text, CACHE_TTL).await {
                    tracing::warn!("⚠️ Failed to cache metals line: {e}");
                }
                Ok(Sourced::fresh(text))
            }
            Err(e) => match self.ctx.store.get(CACHE_KEY).await {
                Ok(Some(cached)) => {
                    tracing::warn!("⚠️ Stooq failed ({e}), serving cached metals line");
                    Ok(Sourced::cache_fallback(cached))
                }
                _ => Err(e),
            },
        }
    }
}

/// Parse a Stooq CSV (`Date,Open,High,Low,Close,...`) and compare the last
/// two close values.
pub fn parse_last_two_closes(symbol: &str, csv: &str) -> Result<CloseChange> {
    let lines: Vec<&str> = csv.trim().lines().collect();
    if lines.len() < 4 {
        return Err(BriefError::Source(format!("Not enough rows for {symbol}")));
    }

    let close_idx = lines[0]
        .split(',')
        .map(|h| h.trim().to_lowercase())
        .position(|h| h == "close")
        .ok_or_else(|| BriefError::Source(format!("Close column not found for {symbol}")))?;

    let close_at = |line: &str| -> Option<f64> {
        line.split(',')
            .nth(close_idx)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };

    let last = close_at(lines[lines.len() - 1]);
    let prev = close_at(lines[lines.len() - 2]).filter(|p| *p != 0.0);
    match (last, prev) {
        (Some(last_close), Some(prev_close)) => Ok(CloseChange {
            last_close,
            pct: (last_close - prev_close) / prev_close * 100.0,
        }),
        _ => Err(BriefError::Source(format!("Bad close values for {symbol}"))),
    }
}

/// `🥇 2650.10 +0.45%  🥈 31.20 -1.10%`
pub fn format_metals(gold: CloseChange, silver: CloseChange) -> String {
    format!(
        "🥇 {:.2} {}  🥈 {:.2} {}",
        gold.last_close,
        fmt_pct(Some(gold.pct)),
        silver.last_close,
        fmt_pct(Some(silver.pct)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefbot_core::{FixedClock, KvStore};
    use briefbot_store::MemoryStore;
    use std::sync::Arc;

    fn ctx(store: Arc<MemoryStore>) -> SourceContext {
        SourceContext {
            client: reqwest::Client::new(),
            store,
            clock: Arc::new(FixedClock::new(chrono::Utc::now())),
            tz: chrono_tz::Europe::Istanbul,
        }
    }

    #[tokio::test]
    async fn test_upstream_failure_serves_cached_line() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(CACHE_KEY, "🥇 2600.00 +0.10%  🥈 30.00 +0.20%", CACHE_TTL)
            .await
            .unwrap();
        // nothing listens on the discard port
        let source = MetalsSource::new(ctx(store), MetalsConfig::default())
            .with_base_url("http://127.0.0.1:9");

        let out = source.fetch().await.unwrap();
        assert!(out.from_fallback_cache);
        assert_eq!(out.text, "🥇 2600.00 +0.10%  🥈 30.00 +0.20%");
    }

    #[tokio::test]
    async fn test_upstream_failure_without_cache_errors() {
        let source = MetalsSource::new(ctx(Arc::new(MemoryStore::new())), MetalsConfig::default())
            .with_base_url("http://127.0.0.1:9");
        assert!(source.fetch().await.is_err());
    }

    const XAU: &str = "Date,Open,High,Low,Close\r\n\
        2026-10-13,2600,2610,2590,2600.00\r\n\
        2026-10-14,2600,2620,2595,2610.00\r\n\
        2026-10-15,2610,2640,2605,2600.00\r\n\
        2026-10-16,2600,2660,2600,2626.00\r\n";

    #[test]
    fn test_parse_last_two_closes() {
        let change = parse_last_two_closes("xauusd", XAU).unwrap();
        assert_eq!(change.last_close, 2626.0);
        assert!((change.pct - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_rows() {
        let csv = "Date,Close\n2026-10-15,1\n2026-10-16,2\n";
        let err = parse_last_two_closes("xagusd", csv).unwrap_err();
        assert!(err.to_string().contains("Not enough rows for xagusd"));
    }

    #[test]
    fn test_missing_close_column() {
        let csv = "Date,Open\na,1\nb,2\nc,3\n";
        let err = parse_last_two_closes("xauusd", csv).unwrap_err();
        assert!(err.to_string().contains("Close column not found"));
    }

    #[test]
    fn test_bad_close_values() {
        let csv = "Date,Close\na,1\nb,2\nc,N/D\nd,4\n";
        assert!(parse_last_two_closes("xauusd", csv).is_err());
    }

    #[test]
    fn test_format_metals() {
        let gold = CloseChange {
            last_close: 2626.0,
            pct: 1.0,
        };
        let silver = CloseChange {
            last_close: 31.2,
            pct: -1.1,
        };
        assert_eq!(format_metals(gold, silver), "🥇 2626.00 +1.00%  🥈 31.20 -1.10%");
    }
}
