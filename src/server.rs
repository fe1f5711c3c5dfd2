//! Webhook HTTP server
//!
//! Axum app exposing the inbound surface. The webhook route is deliberately
//! forgiving: Telegram retries updates that are not acknowledged, so every
//! request path here ends in 200 with a short informational body.

use crate::config::Config;
use crate::relay::Relay;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, Method},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
    start_time: Instant,
}

impl AppState {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self {
            relay,
            start_time: Instant::now(),
        }
    }
}

/// Build the router with all routes and middleware.
pub fn build_router(relay: Arc<Relay>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/webhook", post(webhook_handler).options(webhook_preflight))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(relay))
}

/// Start the server and run until shutdown signal.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let relay = Arc::new(Relay::from_config(config));
    let router = build_router(relay);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("webhook server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("webhook server shut down gracefully");
    Ok(())
}

/// Inbound webhook. Always 200: parse failures and handler outcomes only
/// vary the informational body, never the status.
async fn webhook_handler(State(state): State<AppState>, body: Bytes) -> &'static str {
    state.relay.handle_update(&body).await
}

/// Platform preflight. Empty body; CORS headers come from the layer.
async fn webhook_preflight() -> &'static str {
    ""
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub timestamp: String,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
