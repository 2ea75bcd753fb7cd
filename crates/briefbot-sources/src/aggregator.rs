//! Fault-isolated aggregation: run every source concurrently, and replace any
//! failure with that source's fallback line. Nothing here retries; retries and
//! cache fallbacks are each adapter's own business.

use std::fmt;
use std::sync::Arc;

use crate::Source;

/// Outcome of one source in one run.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceStatus {
    Fresh,
    /// Upstream failed, a cached line was used.
    CacheFallback,
    Failed(String),
}

impl SourceStatus {
    pub fn is_ok(&self) -> bool {
        !matches!(self, SourceStatus::Failed(_))
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStatus::Fresh => write!(f, "fresh"),
            SourceStatus::CacheFallback => write!(f, "cache_fallback"),
            SourceStatus::Failed(msg) => write!(f, "ERR: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub label: &'static str,
    pub status: SourceStatus,
}

/// The four digest sections plus how each one was obtained.
#[derive(Debug, Clone)]
pub struct Sections {
    pub weather: String,
    pub metals: String,
    pub crypto: String,
    pub matches: String,
    pub reports: Vec<SourceReport>,
}

pub struct Aggregator {
    weather: Arc<dyn Source>,
    metals: Arc<dyn Source>,
    crypto: Arc<dyn Source>,
    matches: Arc<dyn Source>,
}

impl Aggregator {
    pub fn new(
        weather: Arc<dyn Source>,
        metals: Arc<dyn Source>,
        crypto: Arc<dyn Source>,
        matches: Arc<dyn Source>,
    ) -> Self {
        Self {
            weather,
            metals,
            crypto,
            matches,
        }
    }

    /// Fetch all sections. Never fails.
    pub async fn collect(&self) -> Sections {
        let (weather, metals, crypto, matches) = futures::join!(
            isolate(self.weather.as_ref()),
            isolate(self.metals.as_ref()),
            isolate(self.crypto.as_ref()),
            isolate(self.matches.as_ref()),
        );
        Sections {
            weather: weather.0,
            metals: metals.0,
            crypto: crypto.0,
            matches: matches.0,
            reports: vec![weather.1, metals.1, crypto.1, matches.1],
        }
    }
}

async fn isolate(source: &dyn Source) -> (String, SourceReport) {
    let label = source.label();
    match source.fetch().await {
        Ok(out) => {
            let status = if out.from_fallback_cache {
                SourceStatus::CacheFallback
            } else {
                SourceStatus::Fresh
            };
            (out.text, SourceReport { label, status })
        }
        Err(e) => {
            tracing::warn!("⚠️ Source '{label}' failed: {e}");
            (
                source.fallback().to_string(),
                SourceReport {
                    label,
                    status: SourceStatus::Failed(e.to_string()),
                },
            )
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::Sourced;
    use async_trait::async_trait;
    use briefbot_core::{BriefError, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned source for tests: answers with `text`, or fails when `text` is `None`.
    pub(crate) struct StubSource {
        pub label: &'static str,
        pub fallback: &'static str,
        pub text: Option<&'static str>,
        pub calls: AtomicUsize,
    }

    impl StubSource {
        pub(crate) fn ok(label: &'static str, fallback: &'static str, text: &'static str) -> Arc<Self> {
            Arc::new(Self {
                label,
                fallback,
                text: Some(text),
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn failing(label: &'static str, fallback: &'static str) -> Arc<Self> {
            Arc::new(Self {
                label,
                fallback,
                text: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Source for StubSource {
        fn label(&self) -> &'static str {
            self.label
        }

        fn fallback(&self) -> &'static str {
            self.fallback
        }

        async fn fetch(&self) -> Result<Sourced> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.text {
                Some(t) => Ok(Sourced::fresh(t)),
                None => Err(BriefError::Source("HTTP 503 for upstream".into())),
            }
        }
    }

    pub(crate) fn stub_set(fail: [bool; 4]) -> Aggregator {
        let pick = |failing: bool,
                    label: &'static str,
                    fallback: &'static str,
                    text: &'static str|
         -> Arc<dyn Source> {
            if failing {
                StubSource::failing(label, fallback)
            } else {
                StubSource::ok(label, fallback, text)
            }
        };
        Aggregator::new(
            pick(fail[0], "open_meteo_weather", "🌤 Hava: N/A", "🌤 12.0°/18.0° 🌧20%"),
            pick(fail[1], "stooq_metals", "🥇 N/A  🥈 N/A", "🥇 2626.00 +1.00%  🥈 31.20 -1.10%"),
            pick(fail[2], "coingecko_crypto", "₿ BTC/ETH: N/A", "₿ BTC: $1 (+0.00%) | Ξ ETH: $2 (+0.00%)"),
            pick(fail[3], "espn_matches", "⚽ Bugün favori maç yok", "⚽ Maçlar:\n• Galatasaray vs Rizespor | 20:00"),
        )
    }

    #[tokio::test]
    async fn test_weather_failure_is_isolated() {
        let sections = stub_set([true, false, false, false]).collect().await;
        assert_eq!(sections.weather, "🌤 Hava: N/A");
        assert_eq!(sections.metals, "🥇 2626.00 +1.00%  🥈 31.20 -1.10%");
        assert_eq!(sections.crypto, "₿ BTC: $1 (+0.00%) | Ξ ETH: $2 (+0.00%)");
        assert!(sections.matches.starts_with("⚽ Maçlar:"));

        assert_eq!(
            sections.reports[0].status,
            SourceStatus::Failed("Source error: HTTP 503 for upstream".into())
        );
        assert!(sections.reports[1..].iter().all(|r| r.status == SourceStatus::Fresh));
    }

    #[tokio::test]
    async fn test_every_failure_combination_uses_fallbacks() {
        for mask in 0u8..16 {
            let fail = [mask & 1 != 0, mask & 2 != 0, mask & 4 != 0, mask & 8 != 0];
            let sections = stub_set(fail).collect().await;
            let got = [&sections.weather, &sections.metals, &sections.crypto, &sections.matches];
            let fallbacks = ["🌤 Hava: N/A", "🥇 N/A  🥈 N/A", "₿ BTC/ETH: N/A", "⚽ Bugün favori maç yok"];
            for i in 0..4 {
                assert_eq!(got[i] == fallbacks[i], fail[i], "mask {mask} source {i}");
                assert_eq!(sections.reports[i].status.is_ok(), !fail[i]);
            }
        }
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SourceStatus::Fresh.to_string(), "fresh");
        assert_eq!(SourceStatus::CacheFallback.to_string(), "cache_fallback");
        assert_eq!(SourceStatus::Failed("boom".into()).to_string(), "ERR: boom");
    }
}
