//! Route handlers.

use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use briefbot_scheduler::ManualOutcome;
use serde::Deserialize;
use std::sync::Arc;

use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RunParams {
    pub dry: Option<String>,
}

impl RunParams {
    fn is_dry(&self) -> bool {
        matches!(self.dry.as_deref(), Some("1") | Some("true"))
    }
}

pub async fn index() -> &'static str {
    "OK. Use /run to send manually. /run?dry=1 to preview."
}

pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Manual trigger. `?dry=1` only renders the digest.
pub async fn run(State(state): State<Arc<AppState>>, Query(params): Query<RunParams>) -> Response {
    if params.is_dry() {
        let text = state.core.preview().await;
        return ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response();
    }

    match state.core.run_manual().await {
        ManualOutcome::Sent => (StatusCode::OK, "Manual run OK").into_response(),
        ManualOutcome::SentPending => {
            (StatusCode::OK, "Manual run OK (sent pending)").into_response()
        }
        ManualOutcome::RateLimited => {
            tracing::info!("🚦 Manual run rejected by the rate gate");
            (StatusCode::TOO_MANY_REQUESTS, "Rate limited: try again in ~60s").into_response()
        }
        ManualOutcome::Failed { reason, queued } => {
            let note = if queued {
                "The message is queued and will be retried on the next scheduled run."
            } else {
                "The message was not queued."
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Manual run failed: {reason}\n{note}"),
            )
                .into_response()
        }
    }
}
