// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use wasend_config::model::GatewayConfig;
use wasend_core::WasendError;
use wasend_dispatch::{BatchDispatcher, BatchQueue};
use wasend_session::SessionLifecycle;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// State for the unauthenticated health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Prometheus text renderer, when metrics are enabled.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            start_time: std::time::Instant::now(),
            prometheus_render: None,
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub session: Arc<SessionLifecycle>,
    /// Used for single sends, which share the batch send lane.
    pub dispatcher: Arc<BatchDispatcher>,
    pub queue: BatchQueue,
    pub auth: AuthConfig,
    pub health: HealthState,
}

/// Assemble the full router.
///
/// - `GET /`, `/ping`, `/health`, `/status`, `/metrics` are public
/// - `POST /v1/batch`, `/v1/messages`, `/v1/session/relink` go through bearer auth
pub fn build_router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/", get(handlers::get_pairing_page))
        .route("/ping", get(handlers::get_ping))
        .route("/health", get(handlers::get_health))
        .route("/status", get(handlers::get_status))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/batch", post(handlers::post_batch))
        .route("/v1/messages", post(handlers::post_message))
        .route("/v1/session/relink", post(handlers::post_relink))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until `cancel` fires.
pub async fn start_server(
    config: &GatewayConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), WasendError> {
    if state.auth.bearer_token.is_none() {
        tracing::warn!("no gateway bearer token configured, /v1 API is unauthenticated");
    }

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WasendError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| WasendError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
