//! Rate-limit budget and `retry_after` extraction for Telegram 429s.

use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

/// Attempts per send, the first one included.
pub const MAX_ATTEMPTS: u32 = 6;

/// Upper bound on time spent sleeping between attempts of one send.
pub const MAX_TOTAL_WAIT: Duration = Duration::from_secs(45);

/// Hint used when a 429 carries no usable `retry_after` anywhere.
pub const DEFAULT_RETRY_AFTER_SECS: f64 = 5.0;

/// Added on top of the server hint before retrying.
pub const RETRY_PADDING_SECS: f64 = 1.0;

static RETRY_AFTER_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)retry_after"\s*:\s*(\d+)"#).ok());

/// Seconds to honour for a 429, looked up in order:
/// JSON `parameters.retry_after` or top-level `retry_after`, the
/// `Retry-After` header, a regex over the raw body, then the 5s default.
/// Only positive finite numbers are accepted at each step.
pub fn extract_retry_after(headers: &HashMap<String, String>, body: &str) -> f64 {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let from_json = json
            .pointer("/parameters/retry_after")
            .and_then(Value::as_f64)
            .filter(|v| usable(*v))
            .or_else(|| json.get("retry_after").and_then(Value::as_f64).filter(|v| usable(*v)));
        if let Some(secs) = from_json {
            return secs;
        }
    }

    if let Some(secs) = headers
        .get("retry-after")
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| usable(*v))
    {
        return secs;
    }

    if let Some(re) = RETRY_AFTER_RE.as_ref()
        && let Some(secs) = re
            .captures(body)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .filter(|v| usable(*v))
    {
        return secs;
    }

    DEFAULT_RETRY_AFTER_SECS
}

fn usable(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Wait before the next attempt for a given hint. `None` when the padded
/// hint does not fit in a `Duration`.
pub fn wait_for(retry_after_secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(retry_after_secs + RETRY_PADDING_SECS).ok()
}
