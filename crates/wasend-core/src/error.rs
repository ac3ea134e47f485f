// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for wasend.
//!
//! Two layers live here:
//! - [`ClientError`] is what a [`MessagingClient`](crate::MessagingClient)
//!   adapter returns. It carries a structured [`ClientErrorKind`] so callers
//!   never have to sniff error message text.
//! - [`WasendError`] is the service-wide error used across crate seams.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Coarse classification of a messaging capability failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClientErrorKind {
    /// The chat address was rejected by the capability.
    InvalidAddress,
    /// The automation context died underneath the call (protocol error).
    ContextDestroyed,
    /// The capability is not connected to WhatsApp.
    NotConnected,
    /// The capability did not answer in time.
    Timeout,
    /// The capability itself could not be reached.
    Unavailable,
    /// Anything else.
    Other,
}

impl ClientErrorKind {
    /// Whether this failure means the session itself is gone, not just the item.
    pub fn is_session_fatal(self) -> bool {
        matches!(self, Self::NotConnected | Self::ContextDestroyed)
    }
}

/// Error returned by messaging capability adapters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Outcome classification recorded on a failed ledger item.
///
/// Superset of [`ClientErrorKind`] with the two dispatcher-level outcomes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SendErrorKind {
    InvalidAddress,
    ContextDestroyed,
    NotConnected,
    Timeout,
    Unavailable,
    /// The readiness gate timed out before the batch started.
    SessionNotUsable,
    /// The session dropped while the batch was running.
    SessionLost,
    Other,
}

impl From<ClientErrorKind> for SendErrorKind {
    fn from(kind: ClientErrorKind) -> Self {
        match kind {
            ClientErrorKind::InvalidAddress => Self::InvalidAddress,
            ClientErrorKind::ContextDestroyed => Self::ContextDestroyed,
            ClientErrorKind::NotConnected => Self::NotConnected,
            ClientErrorKind::Timeout => Self::Timeout,
            ClientErrorKind::Unavailable => Self::Unavailable,
            ClientErrorKind::Other => Self::Other,
        }
    }
}

/// The primary error type used across wasend crates.
#[derive(Debug, Error)]
pub enum WasendError {
    /// Configuration errors (invalid values, missing destinations).
    #[error("configuration error: {0}")]
    Config(String),

    /// Input rejected before any send was attempted.
    #[error("invalid request: {message}")]
    Validation {
        message: String,
        /// Zero-based positions of the offending batch items, if any.
        positions: Vec<usize>,
    },

    /// The readiness gate timed out.
    #[error("session not usable after waiting {waited:?}")]
    SessionNotUsable { waited: Duration },

    /// A single send failed.
    #[error("send failed ({kind}): {message}")]
    Send {
        kind: SendErrorKind,
        message: String,
    },

    /// Webhook delivery failed.
    #[error("webhook delivery failed: {message}")]
    Webhook {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Messaging capability lifecycle errors (initialize, destroy, logout).
    #[error("messaging client error: {message}")]
    Client {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The service cannot take more work right now.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WasendError {
    /// Shorthand for a validation error without item positions.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            positions: Vec::new(),
        }
    }
}

impl From<ClientError> for WasendError {
    fn from(err: ClientError) -> Self {
        Self::Send {
            kind: err.kind.into(),
            message: err.message,
        }
    }
}
