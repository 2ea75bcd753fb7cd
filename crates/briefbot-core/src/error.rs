//! BriefBot error type.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BriefError>;

#[derive(Debug, Error)]
pub enum BriefError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Source error: {0}")]
    Source(String),

    #[error("Channel error: {0}")]
    Channel(String),

    /// Non-success HTTP status from the bot API, body truncated.
    #[error("Telegram error: {status} | body: {body}")]
    Http { status: u16, body: String },

    /// Cumulative wait budget would be exceeded by the next 429 wait.
    #[error("Telegram 429: retry_after={retry_after_secs}s (giving up)")]
    RateLimited { retry_after_secs: f64 },

    /// Every attempt came back 429 within the wait budget.
    #[error("Telegram 429 (retry failed after {attempts} attempts)")]
    RetriesExhausted { attempts: u32 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BriefError {
    /// True for both ways the sender can give up on a rate-limited endpoint.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            BriefError::RateLimited { .. } | BriefError::RetriesExhausted { .. }
        )
    }
}
