// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types of the sidecar HTTP API.

use serde::{Deserialize, Serialize};
use wasend_core::ClientState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct StateResponse {
    pub state: ClientState,
}

/// `{"error": {"kind": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of `qr` events.
#[derive(Debug, Deserialize)]
pub struct QrPayload {
    pub qr: String,
}

/// Payload of `auth_failure` and `disconnected` events.
#[derive(Debug, Deserialize)]
pub struct ReasonPayload {
    pub reason: String,
}
