//! BTC/ETH line from CoinGecko's simple price endpoint.
//! The raw JSON is cached for 10 minutes and served before hitting the network.

use async_trait::async_trait;
use briefbot_core::{BriefError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::format::fmt_pct;
use crate::{Source, SourceContext, Sourced, http};

const COINGECKO_BASE: &str = "https://api.coingecko.com";
const CACHE_KEY: &str = "cache/coingecko/btc-eth";
const CACHE_TTL: Duration = Duration::from_secs(600);

/// One coin entry of the simple price response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoinQuote {
    pub usd: Option<f64>,
    pub usd_24h_change: Option<f64>,
}

pub struct CryptoSource {
    ctx: SourceContext,
    base_url: String,
}

impl CryptoSource {
    pub fn new(ctx: SourceContext) -> Self {
        Self {
            ctx,
            base_url: COINGECKO_BASE.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_raw(&self) -> Result<String> {
        let resp = self
            .ctx
            .client
            .get(format!("{}/api/v3/simple/price", self.base_url))
            .query(&[
                ("ids", "bitcoin,ethereum"),
                ("vs_currencies", "usd"),
                ("include_24hr_change", "true"),
            ])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| BriefError::Source(format!("CoinGecko request failed: {e}")))?;

        if resp.status().as_u16() == 429 {
            return Err(BriefError::Source("CoinGecko 429 (rate limit)".into()));
        }
        let resp = http::ensure_success(resp, 200).await?;
        resp.text()
            .await
            .map_err(|e| BriefError::Source(format!("Read failed: {e}")))
    }
}

#[async_trait]
impl Source for CryptoSource {
    fn label(&self) -> &'static str {
        "coingecko_crypto"
    }

    fn fallback(&self) -> &'static str {
        "₿ BTC/ETH: N/A"
    }

    async fn fetch(&self) -> Result<Sourced> {
        if let Ok(Some(cached)) = self.ctx.store.get(CACHE_KEY).await {
            match format_crypto(&cached) {
                Ok(line) => {
                    tracing::debug!("CoinGecko cache hit");
                    return Ok(Sourced::fresh(line));
                }
                Err(e) => tracing::warn!("⚠️ Ignoring unreadable CoinGecko cache entry: {e}"),
            }
        }

        let raw = self.fetch_raw().await?;
        let line = format_crypto(&raw)?;
        if let Err(e) = self.ctx.store.put(CACHE_KEY, &raw, CACHE_TTL).await {
            tracing::warn!("⚠️ Failed to cache CoinGecko response: {e}");
        }
        Ok(Sourced::fresh(line))
    }
}

/// `₿ BTC: $67234.5 (+1.23%) | Ξ ETH: $2450 (-0.40%)` from the raw JSON.
pub fn format_crypto(raw: &str) -> Result<String> {
    let quotes: HashMap<String, CoinQuote> = serde_json::from_str(raw)
        .map_err(|e| BriefError::Source(format!("Invalid CoinGecko JSON: {e}")))?;
    let btc = quotes.get("bitcoin");
    let eth = quotes.get("ethereum");
    if btc.is_none() && eth.is_none() {
        return Err(BriefError::Source(
            "CoinGecko response has neither bitcoin nor ethereum".into(),
        ));
    }

    let price = |q: Option<&CoinQuote>| {
        q.and_then(|q| q.usd)
            .map_or_else(|| "N/A".to_string(), |p| format!("${p}"))
    };
    let change = |q: Option<&CoinQuote>| fmt_pct(q.and_then(|q| q.usd_24h_change));

    Ok(format!(
        "₿ BTC: {} ({}) | Ξ ETH: {} ({})",
        price(btc),
        change(btc),
        price(eth),
        change(eth)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefbot_core::{FixedClock, KvStore};
    use briefbot_store::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_format_crypto() {
        let raw = r#"{
            "bitcoin": {"usd": 67234.5, "usd_24h_change": 1.2345},
            "ethereum": {"usd": 2450, "usd_24h_change": -0.4}
        }"#;
        assert_eq!(
            format_crypto(raw).unwrap(),
            "₿ BTC: $67234.5 (+1.23%) | Ξ ETH: $2450 (-0.40%)"
        );
    }

    #[test]
    fn test_missing_fields_print_na() {
        let raw = r#"{"bitcoin": {"usd": 60000}}"#;
        assert_eq!(
            format_crypto(raw).unwrap(),
            "₿ BTC: $60000 (N/A) | Ξ ETH: N/A (N/A)"
        );
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(format_crypto("<html>").is_err());
        assert!(format_crypto("{}").is_err());
    }

    #[tokio::test]
    async fn test_cached_response_skips_network() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                CACHE_KEY,
                r#"{"bitcoin":{"usd":1,"usd_24h_change":0},"ethereum":{"usd":2,"usd_24h_change":0}}"#,
                CACHE_TTL,
            )
            .await
            .unwrap();
        let ctx = SourceContext {
            client: reqwest::Client::new(),
            store,
            clock: Arc::new(FixedClock::new(chrono::Utc::now())),
            tz: chrono_tz::Europe::Istanbul,
        };
        // unreachable host: only the cache can answer
        let source = CryptoSource::new(ctx).with_base_url("http://127.0.0.1:9");
        let out = source.fetch().await.unwrap();
        assert_eq!(out.text, "₿ BTC: $1 (+0.00%) | Ξ ETH: $2 (+0.00%)");
    }

    /// Serves one canned JSON response on a local port.
    async fn serve_once(body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_unreadable_cache_falls_through_to_network() {
        let fresh = r#"{"bitcoin":{"usd":3,"usd_24h_change":1},"ethereum":{"usd":4,"usd_24h_change":-1}}"#;
        let store = Arc::new(MemoryStore::new());
        store.put(CACHE_KEY, "{}", CACHE_TTL).await.unwrap();
        let ctx = SourceContext {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            store: store.clone(),
            clock: Arc::new(FixedClock::new(chrono::Utc::now())),
            tz: chrono_tz::Europe::Istanbul,
        };

        let source = CryptoSource::new(ctx).with_base_url(serve_once(fresh).await);
        let out = source.fetch().await.unwrap();

        assert_eq!(out.text, "₿ BTC: $3 (+1.00%) | Ξ ETH: $4 (-1.00%)");
        assert_eq!(store.get(CACHE_KEY).await.unwrap().as_deref(), Some(fresh));
    }
}
