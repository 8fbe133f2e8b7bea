use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Json, Router,
        response::IntoResponse,
        routing::{get, post},
    },
    tracing::info,
};

use {charla_config::WhatsappConfig, charla_engine::Engine};

use crate::{
    blacklist_routes::blacklist_update,
    webhook_routes::{receive_webhook, verify_webhook},
};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Channel section of the config, for webhook verification.
    pub whatsapp: WhatsappConfig,
}

// ── Router and startup ───────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(health_handler))
        .route("/v1/blacklist", post(blacklist_update))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .with_state(state)
}

/// Serve the gateway until ctrl-c, then shut the engine down.
///
/// In-flight turns finish on their own; the queue stops admitting new ones.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let engine = Arc::clone(&state.engine);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
