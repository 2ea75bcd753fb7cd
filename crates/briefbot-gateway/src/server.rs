//! HTTP server implementation using Axum.

use axum::Router;
use axum::routing::get;
use briefbot_core::config::GatewayConfig;
use briefbot_scheduler::DeliveryCore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<DeliveryCore>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(super::routes::index))
        .route("/favicon.ico", get(super::routes::favicon))
        .route("/run", get(super::routes::run))
        .fallback(super::routes::not_found)
        .method_not_allowed_fallback(super::routes::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind and serve until the listener fails.
pub async fn start(config: &GatewayConfig, core: Arc<DeliveryCore>) -> anyhow::Result<()> {
    let app = build_router(AppState { core });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Gateway listening on http://{addr} (GET /run, /run?dry=1)");

    axum::serve(listener, app).await?;
    Ok(())
}
