// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging capability trait (the wrapped WhatsApp automation client).

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ClientError;
use crate::types::{ChatAddress, ClientEvent, ClientState, MessageId};

/// An external WhatsApp automation client.
///
/// wasend never speaks the WhatsApp protocol itself; it drives an
/// implementation of this trait. Lifecycle events (`qr`, `authenticated`,
/// `ready`, `auth_failure`, `disconnected`) are pushed into the sender handed
/// to [`initialize`](MessagingClient::initialize). Each call to `initialize`
/// receives a fresh sender; events on an older sender are ignored upstream.
#[async_trait]
pub trait MessagingClient: Send + Sync + 'static {
    /// Human-readable adapter name for logs.
    fn name(&self) -> &str;

    /// Starts (or restarts) the underlying automation session.
    ///
    /// Returning `Ok` only means the start was accepted; readiness is
    /// signalled later through `events`.
    async fn initialize(&self, events: mpsc::Sender<ClientEvent>) -> Result<(), ClientError>;

    /// Tears down the underlying automation resources.
    async fn destroy(&self) -> Result<(), ClientError>;

    /// Logs the linked device out so the next `initialize` asks for a new QR.
    async fn logout(&self) -> Result<(), ClientError>;

    /// Sends a text message to an already-normalized chat address.
    async fn send_message(&self, to: &ChatAddress, body: &str) -> Result<MessageId, ClientError>;

    /// Queries the live connection state (used by the liveness probe).
    async fn get_state(&self) -> Result<ClientState, ClientError>;
}
