// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use wasend_core::{SendErrorKind, SendRequest, ServiceHealth, WasendError};

use crate::pairing;
use crate::server::GatewayState;

/// Request body for POST /v1/batch: a bare array or `{"messages": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchBody {
    List(Vec<SendRequest>),
    Wrapped { messages: Vec<SendRequest> },
}

impl BatchBody {
    pub fn into_requests(self) -> Vec<SendRequest> {
        match self {
            Self::List(requests) | Self::Wrapped { messages: requests } => requests,
        }
    }
}

/// Response body for POST /v1/batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchAccepted {
    pub accepted: usize,
    pub batch_id: Uuid,
}

/// Response body for a successful POST /v1/messages.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSent {
    pub success: bool,
    pub chat_id: String,
    pub message_id: String,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: ServiceHealth,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub reconnect_attempts: u32,
    pub reconnect_exhausted: bool,
    pub last_transition_at: String,
    pub uptime_secs: u64,
    pub version: String,
}

/// Response body for GET /status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub active: bool,
}

/// Error body shared by every non-2xx JSON response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SendErrorKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<usize>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: None,
            error: error.into(),
            kind: None,
            positions: Vec::new(),
        }
    }
}

/// HTTP status for a failed send of the given kind.
pub fn status_for_kind(kind: SendErrorKind) -> StatusCode {
    match kind {
        SendErrorKind::InvalidAddress => StatusCode::BAD_REQUEST,
        SendErrorKind::ContextDestroyed => StatusCode::BAD_GATEWAY,
        SendErrorKind::NotConnected
        | SendErrorKind::Unavailable
        | SendErrorKind::SessionNotUsable
        | SendErrorKind::SessionLost => StatusCode::SERVICE_UNAVAILABLE,
        SendErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        SendErrorKind::Other => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: WasendError) -> Response {
    let message = err.to_string();
    let (status, kind, positions) = match err {
        WasendError::Validation { positions, .. } => (StatusCode::BAD_REQUEST, None, positions),
        WasendError::SessionNotUsable { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Some(SendErrorKind::SessionNotUsable),
            Vec::new(),
        ),
        WasendError::Send { kind, .. } => (status_for_kind(kind), Some(kind), Vec::new()),
        WasendError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, None, Vec::new()),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, None, Vec::new()),
    };
    (
        status,
        Json(ErrorResponse {
            success: Some(false),
            error: message,
            kind,
            positions,
        }),
    )
        .into_response()
}

fn bad_json(rejection: JsonRejection) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(format!(
            "invalid request body: {}",
            rejection.body_text()
        ))),
    )
        .into_response()
}

/// GET / -- pairing page.
pub async fn get_pairing_page(State(state): State<GatewayState>) -> Html<String> {
    Html(pairing::render_page(&state.session.snapshot()))
}

/// GET /ping
pub async fn get_ping() -> &'static str {
    "pong"
}

/// GET /health -- session-derived health, 503 once reconnection gave up.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let snapshot = state.session.snapshot();
    let health = snapshot.health();
    let reason = match &snapshot.state {
        wasend_core::SessionState::Failed { reason }
        | wasend_core::SessionState::Disconnected { reason } => Some(reason.clone()),
        _ => None,
    };
    let body = HealthResponse {
        status: health,
        state: snapshot.state.label(),
        reason,
        reconnect_attempts: snapshot.reconnect_attempts,
        reconnect_exhausted: snapshot.reconnect_exhausted,
        last_transition_at: snapshot.last_transition_at.to_rfc3339(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let status = match health {
        ServiceHealth::Failed => StatusCode::SERVICE_UNAVAILABLE,
        ServiceHealth::Ok | ServiceHealth::Degraded => StatusCode::OK,
    };
    (status, Json(body)).into_response()
}

/// GET /status
pub async fn get_status(State(state): State<GatewayState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        active: state.session.current_state().is_usable(),
    })
}

/// GET /metrics -- Prometheus text, 404 when metrics are disabled.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("metrics are disabled")),
        )
            .into_response(),
    }
}

/// POST /v1/batch -- validate, enqueue, acknowledge with 202.
pub async fn post_batch(
    State(state): State<GatewayState>,
    body: Result<Json<BatchBody>, JsonRejection>,
) -> Response {
    let requests = match body {
        Ok(Json(body)) => body.into_requests(),
        Err(rejection) => return bad_json(rejection),
    };
    let accepted = requests.len();

    match state.queue.submit(requests) {
        Ok(batch_id) => (
            StatusCode::ACCEPTED,
            Json(BatchAccepted { accepted, batch_id }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /v1/messages -- send one message and wait for the outcome.
pub async fn post_message(
    State(state): State<GatewayState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_json(rejection),
    };

    match state.dispatcher.send_one(&request).await {
        Ok(delivery) => (
            StatusCode::OK,
            Json(MessageSent {
                success: true,
                chat_id: delivery.chat_id.0,
                message_id: delivery.message_id.0,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "single send failed");
            error_response(e)
        }
    }
}

/// POST /v1/session/relink -- log out and start pairing again in the background.
pub async fn post_relink(State(state): State<GatewayState>) -> Response {
    let session = state.session.clone();
    tokio::spawn(async move {
        session.relink().await;
    });
    tracing::info!("relink requested");
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "relinking": true })),
    )
        .into_response()
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("not found"))).into_response()
}
