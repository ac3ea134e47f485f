// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router behaviour exercised with `oneshot` against the mock capability.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use wasend_config::model::{DispatchConfig, WebhookConfig};
use wasend_core::{ClientErrorKind, ClientEvent};
use wasend_dispatch::{BatchDispatcher, BatchQueue, WebhookReporter};
use wasend_gateway::{build_router, AuthConfig, GatewayState, HealthState};
use wasend_session::SessionLifecycle;
use wasend_test_utils::{client_error, MockCall, MockClient};

struct Harness {
    router: Router,
    session: Arc<SessionLifecycle>,
    client: MockClient,
    _cancel: CancellationToken,
}

struct Options {
    ready: bool,
    token: Option<&'static str>,
    readiness_timeout_ms: u64,
    queue_capacity: usize,
    metrics: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            ready: true,
            token: None,
            readiness_timeout_ms: 1_000,
            queue_capacity: 4,
            metrics: false,
        }
    }
}

async fn harness(options: Options) -> Harness {
    let client = if options.ready {
        MockClient::ready()
    } else {
        MockClient::new()
    };
    let session = Arc::new(SessionLifecycle::new(Arc::new(client.clone())));
    session.initialize().await;
    if options.ready {
        assert!(session.gate().await_usable(Duration::from_secs(1)).await);
    }

    let config = DispatchConfig {
        readiness_timeout_ms: options.readiness_timeout_ms,
        send_timeout_secs: 2,
        check_liveness: true,
        queue_capacity: options.queue_capacity,
    };
    let dispatcher = Arc::new(BatchDispatcher::new(Arc::clone(&session), &config));
    let reporter = Arc::new(WebhookReporter::new(&WebhookConfig::default()).unwrap());
    let cancel = CancellationToken::new();
    let (queue, _worker) = BatchQueue::start(
        Arc::clone(&dispatcher),
        reporter,
        config.queue_capacity,
        cancel.clone(),
    );

    let mut health = HealthState::new();
    if options.metrics {
        health.prometheus_render = Some(Arc::new(|| "wasend_sends_total 3\n".to_string()));
    }

    let state = GatewayState {
        session: Arc::clone(&session),
        dispatcher,
        queue,
        auth: AuthConfig {
            bearer_token: options.token.map(str::to_string),
        },
        health,
    };

    Harness {
        router: build_router(state),
        session,
        client,
        _cancel: cancel,
    }
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn call_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = call(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn ping_returns_pong() {
    let h = harness(Options::default()).await;
    let (status, body) = call(&h.router, get("/ping")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"pong");
}

#[tokio::test]
async fn health_reports_usable_session() {
    let h = harness(Options::default()).await;
    let (status, body) = call_json(&h.router, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["state"], "USABLE");
    assert_eq!(body["reconnectAttempts"], 0);
    assert_eq!(body["reconnectExhausted"], false);
    assert!(body["lastTransitionAt"].is_string());
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn health_is_degraded_while_awaiting_pairing() {
    let h = harness(Options {
        ready: false,
        ..Options::default()
    })
    .await;
    h.client.emit(ClientEvent::Qr("2@abc".into())).await;
    let mut watch = h.session.watch();
    watch
        .wait_for(|s| s.pairing_code.is_some())
        .await
        .unwrap();

    let (status, body) = call_json(&h.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["state"], "AWAITING_PAIRING");
}

#[tokio::test]
async fn health_fails_once_reconnection_gave_up() {
    let h = harness(Options::default()).await;
    h.client.emit(ClientEvent::AuthFailure("logged out".into())).await;
    let mut watch = h.session.watch();
    watch.wait_for(|s| s.state.is_fatal()).await.unwrap();
    h.session.mark_exhausted();

    let (status, body) = call_json(&h.router, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "failed");
    assert_eq!(body["reason"], "logged out");
}

#[tokio::test]
async fn status_reflects_usability() {
    let usable = harness(Options::default()).await;
    let (_, body) = call_json(&usable.router, get("/status")).await;
    assert_eq!(body, json!({ "active": true }));

    let pending = harness(Options {
        ready: false,
        ..Options::default()
    })
    .await;
    let (_, body) = call_json(&pending.router, get("/status")).await;
    assert_eq!(body, json!({ "active": false }));
}

#[tokio::test]
async fn pairing_page_shows_qr_while_awaiting_pairing() {
    let h = harness(Options {
        ready: false,
        ..Options::default()
    })
    .await;
    h.client.emit(ClientEvent::Qr("2@abc,def".into())).await;
    let mut watch = h.session.watch();
    watch
        .wait_for(|s| s.pairing_code.is_some())
        .await
        .unwrap();

    let (status, body) = call(&h.router, get("/")).await;
    let page = String::from_utf8(body).unwrap();
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("<svg"));
}

#[tokio::test]
async fn metrics_endpoint_depends_on_exporter() {
    let disabled = harness(Options::default()).await;
    let (status, _) = call(&disabled.router, get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let enabled = harness(Options {
        metrics: true,
        ..Options::default()
    })
    .await;
    let (status, body) = call(&enabled.router, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("wasend_sends_total"));
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let h = harness(Options::default()).await;
    let (status, body) = call_json(&h.router, get("/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "not found" }));
}

#[tokio::test]
async fn batch_is_accepted_and_sent_in_background() {
    let h = harness(Options::default()).await;
    let (status, body) = call_json(
        &h.router,
        post_json(
            "/v1/batch",
            json!([
                { "recipient": "5511900000001", "body": "one", "rowIndex": 2 },
                { "recipient": "5511900000002", "body": "two", "rowIndex": 3 }
            ]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], 2);
    assert!(body["batchId"].as_str().is_some_and(|id| id.len() == 36));

    for _ in 0..200 {
        if h.client.sent_count().await == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let sent = h.client.sent_messages().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to.as_str(), "5511900000001@c.us");
    assert_eq!(sent[1].body, "two");
}

#[tokio::test]
async fn wrapped_batch_shape_is_accepted() {
    let h = harness(Options::default()).await;
    let (status, body) = call_json(
        &h.router,
        post_json(
            "/v1/batch",
            json!({ "messages": [{ "recipient": "5511900000001", "body": "hi" }] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], 1);
}

#[tokio::test]
async fn invalid_batch_items_are_reported_by_position() {
    let h = harness(Options::default()).await;
    let (status, body) = call_json(
        &h.router,
        post_json(
            "/v1/batch",
            json!([
                { "recipient": "5511900000001", "body": "ok" },
                { "recipient": "  ", "body": "no recipient" },
                { "recipient": "5511900000003", "body": "" }
            ]),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["positions"], json!([1, 2]));
    assert_eq!(h.client.sent_count().await, 0);
}

#[tokio::test]
async fn empty_or_malformed_batch_is_bad_request() {
    let h = harness(Options::default()).await;

    let (status, _) = call_json(&h.router, post_json("/v1/batch", json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call_json(&h.router, post_json("/v1/batch", json!({ "foo": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("invalid request body"));
}

#[tokio::test]
async fn full_queue_returns_503() {
    // Never usable: the worker parks the first batch at the gate.
    let h = harness(Options {
        ready: false,
        readiness_timeout_ms: 60_000,
        queue_capacity: 1,
        ..Options::default()
    })
    .await;
    let batch = json!([{ "recipient": "5511900000001", "body": "hi" }]);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let (status, _) = call_json(&h.router, post_json("/v1/batch", batch.clone())).await;
        statuses.push(status);
    }

    assert_eq!(statuses[0], StatusCode::ACCEPTED);
    assert_eq!(statuses[2], StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn api_requires_bearer_token_when_configured() {
    let h = harness(Options {
        token: Some("s3cret"),
        ..Options::default()
    })
    .await;
    let body = json!({ "recipient": "5511900000001", "body": "hi" });

    let (status, _) = call_json(&h.router, post_json("/v1/messages", body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut request = post_json("/v1/messages", body);
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
    let (status, _) = call_json(&h.router, request).await;
    assert_eq!(status, StatusCode::OK);

    // Public routes stay open.
    let (status, _) = call(&h.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn single_send_returns_ids() {
    let h = harness(Options::default()).await;
    let (status, body) = call_json(
        &h.router,
        post_json(
            "/v1/messages",
            json!({ "recipient": "+55 11 90000-0001", "body": "hello" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["chatId"], "5511900000001@c.us");
    assert!(body["messageId"].as_str().unwrap().starts_with("mock-msg-"));
}

#[tokio::test]
async fn single_send_errors_map_to_status_codes() {
    let h = harness(Options::default()).await;

    let (status, body) = call_json(
        &h.router,
        post_json("/v1/messages", json!({ "recipient": "abc", "body": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_address");
    assert_eq!(body["success"], false);

    h.client
        .push_send_outcome(Err(client_error(ClientErrorKind::Other, "boom")))
        .await;
    let (status, body) = call_json(
        &h.router,
        post_json("/v1/messages", json!({ "recipient": "5511900000001", "body": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "other");

    h.client
        .push_send_outcome(Err(client_error(ClientErrorKind::ContextDestroyed, "page gone")))
        .await;
    let (status, body) = call_json(
        &h.router,
        post_json("/v1/messages", json!({ "recipient": "5511900000001", "body": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "context_destroyed");
}

#[tokio::test]
async fn single_send_waits_then_gives_up_when_not_usable() {
    let h = harness(Options {
        ready: false,
        readiness_timeout_ms: 50,
        ..Options::default()
    })
    .await;
    let (status, body) = call_json(
        &h.router,
        post_json("/v1/messages", json!({ "recipient": "5511900000001", "body": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "session_not_usable");
    assert_eq!(h.client.sent_count().await, 0);
}

#[tokio::test]
async fn relink_is_accepted_and_logs_out() {
    let h = harness(Options::default()).await;
    let (status, _) = call_json(
        &h.router,
        Request::builder()
            .method("POST")
            .uri("/v1/session/relink")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let mut watch = h.session.watch();
    tokio::time::timeout(
        Duration::from_secs(1),
        watch.wait_for(|s| s.generation == 2 && s.state.is_usable()),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(h.client.count_calls(&MockCall::Logout).await, 1);
}
