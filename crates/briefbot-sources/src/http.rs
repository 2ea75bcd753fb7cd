//! HTTP helpers shared by the adapters.

use briefbot_core::text::truncate_chars;
use briefbot_core::{BriefError, Result};
use std::time::Duration;

/// Build the shared client every adapter uses.
pub fn build_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| BriefError::Source(format!("HTTP client error: {e}")))
}

/// Send a request and parse the body as JSON. Non-2xx is an error carrying
/// the status, URL and the first 300 characters of the body.
pub async fn fetch_json(req: reqwest::RequestBuilder) -> Result<serde_json::Value> {
    let resp = send_ok(req.header("Accept", "application/json"), 300).await?;
    resp.json()
        .await
        .map_err(|e| BriefError::Source(format!("Invalid JSON: {e}")))
}

/// Send a request and return the body as text. Error bodies are cut at 200 characters.
pub async fn fetch_text(req: reqwest::RequestBuilder) -> Result<String> {
    let resp = send_ok(req, 200).await?;
    resp.text()
        .await
        .map_err(|e| BriefError::Source(format!("Read failed: {e}")))
}

async fn send_ok(req: reqwest::RequestBuilder, body_limit: usize) -> Result<reqwest::Response> {
    let resp = req
        .send()
        .await
        .map_err(|e| BriefError::Source(format!("Request failed: {e}")))?;
    ensure_success(resp, body_limit).await
}

/// Pass 2xx responses through; turn anything else into a source error.
pub async fn ensure_success(resp: reqwest::Response, body_limit: usize) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().clone();
    let body = resp.text().await.unwrap_or_default();
    Err(BriefError::Source(format!(
        "HTTP {} for {} | body: {}",
        status.as_u16(),
        url,
        truncate_chars(&body, body_limit)
    )))
}
