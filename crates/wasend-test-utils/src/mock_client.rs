// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging capability for deterministic testing.
//!
//! `MockClient` records every call, captures sent messages with timestamps,
//! and lets a test script failures, latency, and lifecycle events.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;

use wasend_core::{
    ChatAddress, ClientError, ClientErrorKind, ClientEvent, ClientState, MessageId,
    MessagingClient,
};

/// One call made against the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Initialize,
    Destroy,
    Logout,
    Send(String),
    GetState,
}

/// A message accepted by [`MockClient::send_message`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: ChatAddress,
    pub body: String,
    pub started_at: Instant,
    pub finished_at: Instant,
}

#[derive(Default)]
struct Script {
    calls: Vec<MockCall>,
    initialized_at: Vec<Instant>,
    sent: Vec<SentMessage>,
    /// Outcomes consumed one per send, before address rules apply.
    send_outcomes: VecDeque<Result<(), ClientError>>,
    /// Persistent failures keyed by chat address.
    address_failures: HashMap<String, ClientError>,
    send_delay: Option<Duration>,
    initialize_failures: VecDeque<ClientError>,
    ready_on_initialize: bool,
    client_state: Option<Result<ClientState, ClientError>>,
    state_delay: Option<Duration>,
    disconnect_after: Option<(usize, String)>,
    in_flight: usize,
    max_in_flight: usize,
}

/// A scriptable messaging capability.
///
/// By default `initialize` only stores the event sender; call
/// [`MockClient::ready_on_initialize`] to have it emit `Authenticated` and
/// `Ready` straight away, or drive events by hand with [`MockClient::emit`].
#[derive(Clone)]
pub struct MockClient {
    script: Arc<Mutex<Script>>,
    events: Arc<Mutex<Option<mpsc::Sender<ClientEvent>>>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            events: Arc::new(Mutex::new(None)),
        }
    }

    /// A mock that reports `Authenticated` then `Ready` on every initialize.
    pub fn ready() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                ready_on_initialize: true,
                ..Script::default()
            })),
            events: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn ready_on_initialize(&self, enabled: bool) {
        self.script.lock().await.ready_on_initialize = enabled;
    }

    /// Push an event through the sender handed over by the latest initialize.
    ///
    /// Returns false if initialize was never called or the receiver is gone.
    pub async fn emit(&self, event: ClientEvent) -> bool {
        let sender = self.events.lock().await.clone();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Script the outcome of the next send. Outcomes queue up in order.
    pub async fn push_send_outcome(&self, outcome: Result<(), ClientError>) {
        self.script.lock().await.send_outcomes.push_back(outcome);
    }

    /// Make every send to `address` fail with `error`.
    pub async fn fail_address(&self, address: &str, error: ClientError) {
        self.script
            .lock()
            .await
            .address_failures
            .insert(address.to_string(), error);
    }

    pub async fn set_send_delay(&self, delay: Duration) {
        self.script.lock().await.send_delay = Some(delay);
    }

    /// Fail the next initialize call. Failures queue up in order.
    pub async fn fail_next_initialize(&self, error: ClientError) {
        self.script.lock().await.initialize_failures.push_back(error);
    }

    /// What `get_state` answers. Defaults to `Connected`.
    pub async fn set_client_state(&self, state: Result<ClientState, ClientError>) {
        self.script.lock().await.client_state = Some(state);
    }

    pub async fn set_state_delay(&self, delay: Duration) {
        self.script.lock().await.state_delay = Some(delay);
    }

    /// Emit `Disconnected(reason)` right after the `n`th successful send.
    pub async fn disconnect_after_sends(&self, n: usize, reason: &str) {
        self.script.lock().await.disconnect_after = Some((n, reason.to_string()));
    }

    pub async fn calls(&self) -> Vec<MockCall> {
        self.script.lock().await.calls.clone()
    }

    pub async fn count_calls(&self, call: &MockCall) -> usize {
        self.script
            .lock()
            .await
            .calls
            .iter()
            .filter(|c| *c == call)
            .count()
    }

    /// When each initialize call happened, in order.
    pub async fn initialize_times(&self) -> Vec<Instant> {
        self.script.lock().await.initialized_at.clone()
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.script.lock().await.sent.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.script.lock().await.sent.len()
    }

    /// Highest number of sends that were ever in progress at once.
    pub async fn max_concurrent_sends(&self) -> usize {
        self.script.lock().await.max_in_flight
    }
}

impl Default for MockClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn initialize(&self, events: mpsc::Sender<ClientEvent>) -> Result<(), ClientError> {
        let (failure, ready) = {
            let mut script = self.script.lock().await;
            script.calls.push(MockCall::Initialize);
            script.initialized_at.push(Instant::now());
            (
                script.initialize_failures.pop_front(),
                script.ready_on_initialize,
            )
        };
        if let Some(err) = failure {
            return Err(err);
        }

        *self.events.lock().await = Some(events.clone());

        if ready {
            let _ = events.send(ClientEvent::Authenticated).await;
            let _ = events.send(ClientEvent::Ready).await;
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ClientError> {
        self.script.lock().await.calls.push(MockCall::Destroy);
        self.events.lock().await.take();
        Ok(())
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.script.lock().await.calls.push(MockCall::Logout);
        Ok(())
    }

    async fn send_message(&self, to: &ChatAddress, body: &str) -> Result<MessageId, ClientError> {
        let started_at = Instant::now();
        let (outcome, delay) = {
            let mut script = self.script.lock().await;
            script.calls.push(MockCall::Send(to.0.clone()));
            script.in_flight += 1;
            script.max_in_flight = script.max_in_flight.max(script.in_flight);
            let outcome = match script.send_outcomes.pop_front() {
                Some(outcome) => outcome,
                None => match script.address_failures.get(to.as_str()) {
                    Some(err) => Err(err.clone()),
                    None => Ok(()),
                },
            };
            (outcome, script.send_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let disconnect = {
            let mut script = self.script.lock().await;
            script.in_flight -= 1;
            if outcome.is_err() {
                None
            } else {
                script.sent.push(SentMessage {
                    to: to.clone(),
                    body: body.to_string(),
                    started_at,
                    finished_at: Instant::now(),
                });
                match &script.disconnect_after {
                    Some((n, reason)) if script.sent.len() == *n => Some(reason.clone()),
                    _ => None,
                }
            }
        };

        if let Some(reason) = disconnect {
            self.emit(ClientEvent::Disconnected(reason)).await;
            // Let the lifecycle's event pump observe the drop before we return.
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
        }

        outcome.map(|()| MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4())))
    }

    async fn get_state(&self) -> Result<ClientState, ClientError> {
        let (state, delay) = {
            let mut script = self.script.lock().await;
            script.calls.push(MockCall::GetState);
            (script.client_state.clone(), script.state_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        state.unwrap_or(Ok(ClientState::Connected))
    }
}

/// Shorthand for building a [`ClientError`] in tests.
pub fn client_error(kind: ClientErrorKind, message: &str) -> ClientError {
    ClientError::new(kind, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ready_mock_emits_lifecycle_events() {
        let client = MockClient::ready();
        let (tx, mut rx) = mpsc::channel(8);
        client.initialize(tx).await.unwrap();

        assert_eq!(rx.recv().await, Some(ClientEvent::Authenticated));
        assert_eq!(rx.recv().await, Some(ClientEvent::Ready));
        assert_eq!(client.calls().await, vec![MockCall::Initialize]);
    }

    #[tokio::test]
    async fn scripted_outcomes_apply_in_order() {
        let client = MockClient::new();
        client
            .push_send_outcome(Err(client_error(ClientErrorKind::Timeout, "slow")))
            .await;
        let to = ChatAddress("1@c.us".into());

        let first = client.send_message(&to, "a").await;
        let second = client.send_message(&to, "b").await;

        assert_eq!(first.unwrap_err().kind, ClientErrorKind::Timeout);
        assert!(second.unwrap().0.starts_with("mock-msg-"));
        assert_eq!(client.sent_count().await, 1);
    }

    #[tokio::test]
    async fn address_failures_are_persistent() {
        let client = MockClient::new();
        client
            .fail_address("9@c.us", client_error(ClientErrorKind::InvalidAddress, "invalid wid"))
            .await;
        let bad = ChatAddress("9@c.us".into());

        for _ in 0..2 {
            let err = client.send_message(&bad, "x").await.unwrap_err();
            assert_eq!(err.kind, ClientErrorKind::InvalidAddress);
        }
        assert_eq!(client.count_calls(&MockCall::Send("9@c.us".into())).await, 2);
    }

    #[tokio::test]
    async fn initialize_failure_is_consumed_once() {
        let client = MockClient::new();
        client
            .fail_next_initialize(client_error(ClientErrorKind::Unavailable, "no browser"))
            .await;
        let (tx, _rx) = mpsc::channel(8);

        assert!(client.initialize(tx.clone()).await.is_err());
        assert!(client.initialize(tx).await.is_ok());
    }

    #[tokio::test]
    async fn emit_without_initialize_returns_false() {
        let client = MockClient::new();
        assert!(!client.emit(ClientEvent::Ready).await);
    }

    #[tokio::test]
    async fn get_state_defaults_to_connected() {
        let client = MockClient::new();
        assert_eq!(client.get_state().await.unwrap(), ClientState::Connected);
        client.set_client_state(Ok(ClientState::Conflict)).await;
        assert_eq!(client.get_state().await.unwrap(), ClientState::Conflict);
    }
}
