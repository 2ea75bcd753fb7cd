//! Telegram Bot API delivery with bounded 429 retries.

use async_trait::async_trait;
use briefbot_core::config::TelegramConfig;
use briefbot_core::text::truncate_chars;
use briefbot_core::{BriefError, Notifier, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::retry::{MAX_ATTEMPTS, MAX_TOTAL_WAIT, extract_retry_after, wait_for};

const ERROR_BODY_LIMIT: usize = 300;

/// Raw reply from the bot API. Header names are lowercase.
#[derive(Debug, Clone, Default)]
pub struct BotResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Posts one JSON payload to the bot API.
#[async_trait]
pub trait BotTransport: Send + Sync {
    async fn post_json(&self, url: &str, payload: &Value) -> Result<BotResponse>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BotTransport for HttpTransport {
    async fn post_json(&self, url: &str, payload: &Value) -> Result<BotResponse> {
        let resp = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| BriefError::Channel(format!("Telegram send failed: {e}")))?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = resp
            .text()
            .await
            .map_err(|e| BriefError::Channel(format!("Telegram response read failed: {e}")))?;
        Ok(BotResponse {
            status,
            headers,
            body,
        })
    }
}

/// Sends the digest to the configured chat.
pub struct TelegramSender {
    transport: Arc<dyn BotTransport>,
    url: String,
    chat_id: String,
    parse_mode: String,
}

impl std::fmt::Debug for TelegramSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // the URL embeds the bot token
        f.debug_struct("TelegramSender")
            .field("chat_id", &self.chat_id)
            .field("parse_mode", &self.parse_mode)
            .finish()
    }
}

impl TelegramSender {
    /// Fails with a config error when the token or chat id is empty.
    pub fn new(config: &TelegramConfig, transport: Arc<dyn BotTransport>) -> Result<Self> {
        if config.bot_token.trim().is_empty() {
            return Err(BriefError::Config(
                "Missing Telegram bot token (TELEGRAM_BOT_TOKEN)".into(),
            ));
        }
        if config.chat_id.trim().is_empty() {
            return Err(BriefError::Config(
                "Missing Telegram chat id (TELEGRAM_CHAT_ID)".into(),
            ));
        }
        Ok(Self {
            transport,
            url: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
            parse_mode: config.parse_mode.clone(),
        })
    }

    /// Sender over a plain reqwest transport.
    pub fn from_config(config: &TelegramConfig, client: reqwest::Client) -> Result<Self> {
        Self::new(config, Arc::new(HttpTransport::new(client)))
    }

    fn payload(&self, text: &str) -> Value {
        serde_json::json!({
            "chat_id": self.chat_id,
            "text": escape_html(text),
            "parse_mode": self.parse_mode,
            "disable_web_page_preview": true,
        })
    }
}

#[async_trait]
impl Notifier for TelegramSender {
    async fn send(&self, text: &str) -> Result<()> {
        let payload = self.payload(text);
        let mut waited = Duration::ZERO;

        for attempt in 1..=MAX_ATTEMPTS {
            let resp = self.transport.post_json(&self.url, &payload).await?;

            if resp.status == 429 {
                if attempt == MAX_ATTEMPTS {
                    break;
                }
                let retry_after = extract_retry_after(&resp.headers, &resp.body);
                let wait = wait_for(retry_after).filter(|wait| {
                    waited
                        .checked_add(*wait)
                        .is_some_and(|total| total <= MAX_TOTAL_WAIT)
                });
                let Some(wait) = wait else {
                    tracing::warn!(
                        "⏳ Telegram 429 after {attempt} attempt(s), retry_after={retry_after}s exceeds the wait budget"
                    );
                    return Err(BriefError::RateLimited {
                        retry_after_secs: retry_after,
                    });
                };
                tracing::debug!(
                    "⏳ Telegram 429 (attempt {attempt}/{MAX_ATTEMPTS}), retrying in {:.1}s",
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
                waited += wait;
                continue;
            }

            if !(200..300).contains(&resp.status) || !body_ok(&resp.body) {
                return Err(BriefError::Http {
                    status: resp.status,
                    body: truncate_chars(&resp.body, ERROR_BODY_LIMIT).to_string(),
                });
            }

            tracing::info!("✅ Telegram message sent ({} chars)", text.chars().count());
            return Ok(());
        }

        Err(BriefError::RetriesExhausted {
            attempts: MAX_ATTEMPTS,
        })
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

/// A 2xx body counts as delivered unless it explicitly says `"ok": false`.
fn body_ok(body: &str) -> bool {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => json.get("ok").and_then(Value::as_bool) != Some(false),
        Err(_) => true,
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
