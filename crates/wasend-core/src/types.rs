// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the session, dispatch, and gateway crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::{SendErrorKind, WasendError};

/// Identifier assigned to a sent message by the messaging capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// A canonical chat address such as `5551234567@c.us` or `1203630@g.us`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatAddress(pub String);

impl ChatAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChatAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Session ---

/// States of the session FSM.
///
/// The normal path is `Initializing -> AwaitingPairing -> Authenticated -> Usable`.
/// `Failed` and `Disconnected` are reachable from anywhere and loop back to
/// `Initializing` through the reconnect supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Initializing,
    AwaitingPairing,
    Authenticated,
    Usable,
    Failed { reason: String },
    Disconnected { reason: String },
}

impl SessionState {
    /// Short uppercase label used in logs, metrics, and the health endpoint.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Initializing => "INITIALIZING",
            Self::AwaitingPairing => "AWAITING_PAIRING",
            Self::Authenticated => "AUTHENTICATED",
            Self::Usable => "USABLE",
            Self::Failed { .. } => "FAILED",
            Self::Disconnected { .. } => "DISCONNECTED",
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Usable)
    }

    /// `Failed` or `Disconnected`: the supervisor should act.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Failed { .. } | Self::Disconnected { .. })
    }

    /// Whether the FSM permits moving from `self` to `next`.
    ///
    /// `Initializing` is reachable from every state because `initialize()`
    /// is an explicit reset. A restored login skips pairing.
    pub fn can_transition_to(&self, next: &SessionState) -> bool {
        use SessionState::*;
        match (self, next) {
            (_, Initializing) => true,
            (_, Failed { .. } | Disconnected { .. }) => true,
            (Initializing, AwaitingPairing) => true,
            // A fresh QR code replaces the previous one.
            (AwaitingPairing, AwaitingPairing) => true,
            (Initializing | AwaitingPairing, Authenticated) => true,
            (Authenticated, Usable) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Failed { reason } | Self::Disconnected { reason } => {
                write!(f, "{} ({reason})", self.label())
            }
            _ => f.write_str(self.label()),
        }
    }
}

/// Overall service health derived from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ServiceHealth {
    /// Session is usable.
    Ok,
    /// Session is coming up or recovering.
    Degraded,
    /// Reconnection gave up; needs manual re-pairing.
    Failed,
}

/// Read-only view of the session published by the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub state: SessionState,
    pub last_transition_at: DateTime<Utc>,
    pub reconnect_attempts: u32,
    pub reconnect_exhausted: bool,
    /// Bumped by every `initialize()`; lets long-running work detect a restart.
    pub generation: u64,
    /// Latest pairing QR payload while awaiting pairing.
    #[serde(skip)]
    pub pairing_code: Option<String>,
}

impl SessionSnapshot {
    pub fn new() -> Self {
        Self {
            state: SessionState::Initializing,
            last_transition_at: Utc::now(),
            reconnect_attempts: 0,
            reconnect_exhausted: false,
            generation: 0,
            pairing_code: None,
        }
    }

    pub fn health(&self) -> ServiceHealth {
        if self.reconnect_exhausted {
            ServiceHealth::Failed
        } else if self.state.is_usable() {
            ServiceHealth::Ok
        } else {
            ServiceHealth::Degraded
        }
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// A state change published to lifecycle subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub generation: u64,
    pub from: SessionState,
    pub to: SessionState,
    pub at: DateTime<Utc>,
}

// --- Messaging capability ---

/// Connection state reported by the messaging capability's `get_state()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientState {
    Connected,
    Opening,
    Pairing,
    Conflict,
    Timeout,
    Unpaired,
    Unlaunched,
    #[serde(other)]
    Unknown,
}

impl ClientState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Lifecycle events emitted by the messaging capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A pairing QR payload is available.
    Qr(String),
    Authenticated,
    Ready,
    AuthFailure(String),
    Disconnected(String),
}

// --- Batches ---

/// One addressed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub recipient: String,
    pub body: String,
    /// Caller correlation token, echoed verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<serde_json::Value>,
}

impl SendRequest {
    pub fn new(recipient: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            body: body.into(),
            row_index: None,
        }
    }

    pub fn with_row_index(mut self, row_index: serde_json::Value) -> Self {
        self.row_index = Some(row_index);
        self
    }

    /// Checks that both recipient and body are non-blank.
    pub fn validate(&self) -> Result<(), WasendError> {
        match (self.recipient.trim().is_empty(), self.body.trim().is_empty()) {
            (false, false) => Ok(()),
            (true, true) => Err(WasendError::validation("recipient and body are required")),
            (true, false) => Err(WasendError::validation("recipient is required")),
            (false, true) => Err(WasendError::validation("body is required")),
        }
    }
}

/// Validates every request of a batch, collecting all offending positions.
pub fn validate_batch(requests: &[SendRequest]) -> Result<(), WasendError> {
    if requests.is_empty() {
        return Err(WasendError::validation("batch must contain at least one message"));
    }

    let positions: Vec<usize> = requests
        .iter()
        .enumerate()
        .filter(|(_, r)| r.validate().is_err())
        .map(|(i, _)| i)
        .collect();

    if positions.is_empty() {
        Ok(())
    } else {
        Err(WasendError::Validation {
            message: format!(
                "{} item(s) missing recipient or body at positions {positions:?}",
                positions.len()
            ),
            positions,
        })
    }
}

/// Outcome of a single send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// Ledger entry for one [`SendRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<serde_json::Value>,
    pub status: SendStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<SendErrorKind>,
    pub timestamp: DateTime<Utc>,
}

impl SendResult {
    pub fn ok(request: &SendRequest, chat_id: &ChatAddress) -> Self {
        Self {
            recipient: request.recipient.clone(),
            chat_id: Some(chat_id.0.clone()),
            row_index: request.row_index.clone(),
            status: SendStatus::Ok,
            error_detail: None,
            error_kind: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(
        request: &SendRequest,
        chat_id: Option<&ChatAddress>,
        kind: SendErrorKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            recipient: request.recipient.clone(),
            chat_id: chat_id.map(|c| c.0.clone()),
            row_index: request.row_index.clone(),
            status: SendStatus::Error,
            error_detail: Some(detail.into()),
            error_kind: Some(kind),
            timestamp: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == SendStatus::Ok
    }
}

/// Ordered per-item outcomes of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLedger {
    pub batch_id: uuid::Uuid,
    pub results: Vec<SendResult>,
}

impl BatchLedger {
    pub fn new(batch_id: uuid::Uuid, results: Vec<SendResult>) -> Self {
        Self { batch_id, results }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn ok_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    pub fn error_count(&self) -> usize {
        self.len() - self.ok_count()
    }
}
