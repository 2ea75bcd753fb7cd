//! Weather line from the Open-Meteo daily forecast. No API key, no cache.

use async_trait::async_trait;
use briefbot_core::config::LocationConfig;
use briefbot_core::{BriefError, Result};
use serde_json::Value;

use crate::{Source, SourceContext, Sourced, http};

const OPEN_METEO_BASE: &str = "https://api.open-meteo.com";

pub struct WeatherSource {
    ctx: SourceContext,
    location: LocationConfig,
    base_url: String,
}

impl WeatherSource {
    pub fn new(ctx: SourceContext, location: LocationConfig) -> Self {
        Self {
            ctx,
            location,
            base_url: OPEN_METEO_BASE.into(),
        }
    }
}

#[async_trait]
impl Source for WeatherSource {
    fn label(&self) -> &'static str {
        "open_meteo_weather"
    }

    fn fallback(&self) -> &'static str {
        "🌤 Hava: N/A"
    }

    async fn fetch(&self) -> Result<Sourced> {
        let req = self
            .ctx
            .client
            .get(format!("{}/v1/forecast", self.base_url))
            .query(&[
                ("latitude", self.location.lat.to_string()),
                ("longitude", self.location.lon.to_string()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,precipitation_probability_max".into(),
                ),
                ("timezone", self.ctx.tz.name().to_string()),
            ]);
        let data = http::fetch_json(req).await?;
        format_weather(&data).map(Sourced::fresh)
    }
}

/// `🌤 12.3°/19.8° 🌧40%` from today's entry of the daily arrays.
pub fn format_weather(data: &Value) -> Result<String> {
    let daily = &data["daily"];
    let first = |field: &str| daily[field][0].as_f64();
    let min = first("temperature_2m_min");
    let max = first("temperature_2m_max");
    let rain = first("precipitation_probability_max");

    if min.is_none() && max.is_none() && rain.is_none() {
        return Err(BriefError::Source(
            "Weather payload has no daily values".into(),
        ));
    }

    let temp = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), |t| format!("{t:.1}"));
    let rain = rain.map_or_else(|| "N/A".to_string(), |r| format!("{r}%"));
    Ok(format!("🌤 {}°/{}° 🌧{}", temp(min), temp(max), rain))
}
