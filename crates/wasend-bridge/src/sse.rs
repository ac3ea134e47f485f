// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sidecar lifecycle events over Server-Sent Events.
//!
//! Event names map one to one onto [`ClientEvent`]. Payloads are JSON
//! (`{"qr": ...}` or `{"reason": ...}`); a bare string payload is accepted
//! too. Unknown event names are skipped.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use tracing::debug;

use wasend_core::{ClientError, ClientErrorKind, ClientEvent};

use crate::types::{QrPayload, ReasonPayload};

/// Parse one SSE event. `None` for events this adapter does not care about.
pub fn parse_event(name: &str, data: &str) -> Option<ClientEvent> {
    match name {
        "qr" => {
            let code = serde_json::from_str::<QrPayload>(data)
                .map(|p| p.qr)
                .unwrap_or_else(|_| data.trim().to_string());
            if code.is_empty() {
                debug!("qr event without payload");
                return None;
            }
            Some(ClientEvent::Qr(code))
        }
        "authenticated" => Some(ClientEvent::Authenticated),
        "ready" => Some(ClientEvent::Ready),
        "auth_failure" => Some(ClientEvent::AuthFailure(reason(data))),
        "disconnected" => Some(ClientEvent::Disconnected(reason(data))),
        other => {
            debug!(event = other, "ignoring sidecar event");
            None
        }
    }
}

fn reason(data: &str) -> String {
    serde_json::from_str::<ReasonPayload>(data)
        .map(|p| p.reason)
        .unwrap_or_else(|_| data.trim().to_string())
}

/// Turn an `/events` response into a stream of lifecycle events.
pub fn parse_event_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<ClientEvent, ClientError>> + Send>> {
    let mapped = response
        .bytes_stream()
        .eventsource()
        .filter_map(|result| async move {
            match result {
                Ok(event) => parse_event(&event.event, &event.data).map(Ok),
                Err(e) => Some(Err(ClientError::new(
                    ClientErrorKind::Unavailable,
                    format!("event stream error: {e}"),
                ))),
            }
        });
    Box::pin(mapped)
}
