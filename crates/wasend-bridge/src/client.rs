// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the automation sidecar.
//!
//! Every failure is classified into a [`ClientErrorKind`]: from the `kind`
//! field of the sidecar's error body when present, otherwise from the HTTP
//! status, otherwise from the transport error.

use std::str::FromStr;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use wasend_config::model::BridgeConfig;
use wasend_core::{
    ChatAddress, ClientError, ClientErrorKind, ClientEvent, ClientState, MessageId,
    MessagingClient, WasendError,
};

use crate::sse;
use crate::types::{ErrorEnvelope, SendMessageRequest, SendMessageResponse, StateResponse};

const API_KEY_HEADER: &str = "x-api-key";

/// [`MessagingClient`] implementation talking to the sidecar.
pub struct BridgeClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeClient {
    pub fn new(config: &BridgeConfig) -> Result<Self, WasendError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            headers.insert(
                API_KEY_HEADER,
                HeaderValue::from_str(key).map_err(|e| {
                    WasendError::Config(format!("invalid bridge API key header value: {e}"))
                })?,
            );
        }

        // No client-wide timeout: it would also cut the long-lived event stream.
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(config.request_timeout())
            .build()
            .map_err(|e| WasendError::Client {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_timeout: config.request_timeout(),
            event_task: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a bounded request and turn non-2xx answers into a [`ClientError`].
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await
    }

    fn stop_event_task(&self) {
        if let Some(handle) = self
            .event_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}

#[async_trait]
impl MessagingClient for BridgeClient {
    fn name(&self) -> &str {
        "bridge"
    }

    async fn initialize(&self, events: mpsc::Sender<ClientEvent>) -> Result<(), ClientError> {
        self.stop_event_task();

        // Subscribe before starting so the first QR code cannot be missed.
        // Only the response headers are bounded; the stream itself stays open.
        let subscribe = self
            .http
            .get(self.url("/events"))
            .header("accept", "text/event-stream")
            .send();
        let response = tokio::time::timeout(self.request_timeout, subscribe)
            .await
            .map_err(|_| {
                ClientError::new(
                    ClientErrorKind::Timeout,
                    format!(
                        "sidecar event stream did not answer within {:?}",
                        self.request_timeout
                    ),
                )
            })?
            .map_err(transport_error)?;
        let response = check_status(response).await?;

        let handle = tokio::spawn(async move {
            let mut stream = sse::parse_event_stream(response);
            while let Some(item) = stream.next().await {
                match item {
                    Ok(event) => {
                        debug!(?event, "sidecar event");
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "sidecar event stream failed");
                        let _ = events.send(ClientEvent::Disconnected(e.message)).await;
                        return;
                    }
                }
            }
            let _ = events
                .send(ClientEvent::Disconnected("sidecar event stream ended".to_string()))
                .await;
        });
        *self.event_task.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        if let Err(e) = self.execute(self.http.post(self.url("/session/start"))).await {
            self.stop_event_task();
            return Err(e);
        }
        info!(base_url = %self.base_url, "sidecar session starting");
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ClientError> {
        self.stop_event_task();
        self.execute(self.http.delete(self.url("/session"))).await?;
        debug!("sidecar session destroyed");
        Ok(())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.execute(self.http.post(self.url("/session/logout")))
            .await?;
        info!("sidecar session logged out");
        Ok(())
    }

    async fn send_message(&self, to: &ChatAddress, body: &str) -> Result<MessageId, ClientError> {
        let request = self.http.post(self.url("/messages")).json(&SendMessageRequest {
            chat_id: to.as_str(),
            body,
        });
        let response = self.execute(request).await?;
        let sent: SendMessageResponse = response.json().await.map_err(|e| {
            ClientError::new(ClientErrorKind::Other, format!("invalid send response: {e}"))
        })?;
        Ok(MessageId(sent.id))
    }

    async fn get_state(&self) -> Result<ClientState, ClientError> {
        let response = self.execute(self.http.get(self.url("/session/state"))).await?;
        let state: StateResponse = response.json().await.map_err(|e| {
            ClientError::new(ClientErrorKind::Other, format!("invalid state response: {e}"))
        })?;
        Ok(state.state)
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        self.stop_event_task();
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_error(status, &body))
}

/// Build a [`ClientError`] from a non-2xx sidecar answer.
pub fn classify_error(status: StatusCode, body: &str) -> ClientError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let kind = parsed
        .as_ref()
        .and_then(|e| e.error.kind.as_deref())
        .and_then(|k| ClientErrorKind::from_str(k).ok())
        .unwrap_or_else(|| kind_for_status(status));
    let message = parsed
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| format!("sidecar returned {status}: {}", body.trim()));
    ClientError::new(kind, message)
}

fn kind_for_status(status: StatusCode) -> ClientErrorKind {
    match status.as_u16() {
        400 | 404 | 422 => ClientErrorKind::InvalidAddress,
        409 | 503 => ClientErrorKind::NotConnected,
        408 | 504 => ClientErrorKind::Timeout,
        502 => ClientErrorKind::Unavailable,
        _ => ClientErrorKind::Other,
    }
}

fn transport_error(e: reqwest::Error) -> ClientError {
    let kind = if e.is_timeout() {
        ClientErrorKind::Timeout
    } else {
        ClientErrorKind::Unavailable
    };
    ClientError::new(kind, format!("sidecar request failed: {e}"))
}
