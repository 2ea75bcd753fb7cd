//! The production digest: header timestamp plus the aggregated sections.

use async_trait::async_trait;
use briefbot_core::clock::header_timestamp;
use briefbot_core::{BriefConfig, Clock, DigestSource, KvStore, Result};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::compose::compose;
use crate::crypto::CryptoSource;
use crate::matches::MatchesSource;
use crate::metals::MetalsSource;
use crate::weather::WeatherSource;
use crate::SourceContext;

pub struct DigestBuilder {
    aggregator: Aggregator,
    clock: Arc<dyn Clock>,
    tz: Tz,
    include_debug: bool,
}

impl DigestBuilder {
    pub fn new(aggregator: Aggregator, clock: Arc<dyn Clock>, tz: Tz) -> Self {
        Self {
            aggregator,
            clock,
            tz,
            include_debug: false,
        }
    }

    /// Append the per-source status block to every digest.
    pub fn with_debug(mut self, include_debug: bool) -> Self {
        self.include_debug = include_debug;
        self
    }

    /// Wire the four upstream adapters from config.
    pub fn from_config(
        config: &BriefConfig,
        client: reqwest::Client,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let tz = config.tz()?;
        let ctx = SourceContext {
            client,
            store,
            clock: clock.clone(),
            tz,
        };
        let aggregator = Aggregator::new(
            Arc::new(WeatherSource::new(ctx.clone(), config.location.clone())),
            Arc::new(MetalsSource::new(ctx.clone(), config.metals.clone())),
            Arc::new(CryptoSource::new(ctx.clone())),
            Arc::new(MatchesSource::new(ctx, config.football.clone())),
        );
        Ok(Self::new(aggregator, clock, tz).with_debug(config.include_debug_sources))
    }
}

#[async_trait]
impl DigestSource for DigestBuilder {
    async fn build(&self) -> String {
        let timestamp = header_timestamp(self.clock.now(), self.tz);
        let sections = self.aggregator.collect().await;
        let failed = sections.reports.iter().filter(|r| !r.status.is_ok()).count();
        if failed > 0 {
            tracing::info!("📝 Digest built with {failed} source(s) on fallback");
        } else {
            tracing::debug!("📝 Digest built, all sources ok");
        }
        compose(&timestamp, &sections, self.include_debug)
    }
}
