// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sequential, readiness-gated dispatch of message batches.
//!
//! One send lane serializes every use of the session: a batch holds it from
//! the readiness wait to its last item, and single sends queue behind it for
//! at most the readiness timeout. Each capability call also holds the
//! session's use guard, so a reconnect waits for the send in flight.
//! Item failures are recorded in the ledger and never abort the batch. Only
//! a lost session (state left `Usable` or the generation moved) stops it
//! early, and then every remaining item is recorded as `session_lost`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use wasend_config::model::DispatchConfig;
use wasend_core::types::validate_batch;
use wasend_core::{
    BatchLedger, ChatAddress, ClientError, MessageId, SendErrorKind, SendRequest, SendResult,
    WasendError,
};
use wasend_session::{ReadinessGate, SessionLifecycle};

use crate::address::normalize_recipient;

const NOT_USABLE_DETAIL: &str = "session not usable";
const SESSION_LOST_DETAIL: &str = "session lost mid-batch";

/// A message the capability accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub chat_id: ChatAddress,
    pub message_id: MessageId,
}

pub struct BatchDispatcher {
    session: Arc<SessionLifecycle>,
    gate: ReadinessGate,
    readiness_timeout: Duration,
    send_timeout: Duration,
    check_liveness: bool,
    lane: Mutex<()>,
}

impl BatchDispatcher {
    pub fn new(session: Arc<SessionLifecycle>, config: &DispatchConfig) -> Self {
        Self {
            gate: session.gate(),
            session,
            readiness_timeout: config.readiness_timeout(),
            send_timeout: config.send_timeout(),
            check_liveness: config.check_liveness,
            lane: Mutex::new(()),
        }
    }

    /// Dispatch a batch under a fresh id.
    pub async fn dispatch(&self, requests: &[SendRequest]) -> Result<BatchLedger, WasendError> {
        self.dispatch_batch(Uuid::new_v4(), requests).await
    }

    /// Dispatch a batch whose id was assigned at submission.
    ///
    /// Fails only on invalid input. Every other outcome, including a session
    /// that never became usable, is reported per item in the ledger.
    pub async fn dispatch_batch(
        &self,
        batch_id: Uuid,
        requests: &[SendRequest],
    ) -> Result<BatchLedger, WasendError> {
        validate_batch(requests)?;

        let _lane = self.lane.lock().await;

        if !self.gate.await_usable(self.readiness_timeout).await {
            warn!(
                %batch_id,
                items = requests.len(),
                waited_ms = self.readiness_timeout.as_millis() as u64,
                "session not usable, failing batch without sending"
            );
            let results = requests
                .iter()
                .map(|r| SendResult::error(r, None, SendErrorKind::SessionNotUsable, NOT_USABLE_DETAIL))
                .collect();
            return Ok(self.finish(batch_id, results));
        }

        let generation = self.session.generation();
        info!(%batch_id, items = requests.len(), generation, "dispatching batch");

        let mut results = Vec::with_capacity(requests.len());
        let mut lost = false;
        for (position, request) in requests.iter().enumerate() {
            if lost {
                results.push(SendResult::error(
                    request,
                    None,
                    SendErrorKind::SessionLost,
                    SESSION_LOST_DETAIL,
                ));
                continue;
            }

            let _in_use = self.session.begin_use().await;
            // A restart that ran while we waited for the guard replaced the
            // session this batch was gated on.
            let restarted = self.session.generation() != generation;
            if restarted || (self.check_liveness && !self.is_alive(generation)) {
                lost = true;
                warn!(
                    %batch_id,
                    position,
                    remaining = requests.len() - position,
                    restarted,
                    "session lost mid-batch, failing remaining items"
                );
                self.session.mark_disconnected(generation, SESSION_LOST_DETAIL);
                results.push(SendResult::error(
                    request,
                    None,
                    SendErrorKind::SessionLost,
                    SESSION_LOST_DETAIL,
                ));
                continue;
            }

            results.push(self.send_item(generation, request).await);
        }

        Ok(self.finish(batch_id, results))
    }

    /// Send one message outside any batch, sharing the batch send lane.
    ///
    /// Waiting for the lane and for readiness share one readiness timeout: a
    /// batch still holding the lane when it runs out yields `Unavailable`, a
    /// session that is not usable yields `SessionNotUsable`.
    pub async fn send_one(&self, request: &SendRequest) -> Result<Delivery, WasendError> {
        request.validate()?;
        let chat_id = normalize_recipient(&request.recipient)?;

        let deadline = tokio::time::Instant::now() + self.readiness_timeout;
        let Ok(_lane) = tokio::time::timeout(self.readiness_timeout, self.lane.lock()).await else {
            warn!(
                waited_ms = self.readiness_timeout.as_millis() as u64,
                "send lane busy, rejecting single send"
            );
            return Err(WasendError::Unavailable(
                "a batch is still sending, try again later".into(),
            ));
        };

        let not_usable = WasendError::SessionNotUsable {
            waited: self.readiness_timeout,
        };
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if !self.gate.await_usable(remaining).await {
            return Err(not_usable);
        }

        let _in_use = self.session.begin_use().await;
        let snap = self.session.snapshot();
        if !snap.state.is_usable() {
            return Err(not_usable);
        }
        let generation = snap.generation;

        match self.send_with_timeout(generation, &chat_id, &request.body).await {
            Ok(message_id) => Ok(Delivery {
                chat_id,
                message_id,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn is_alive(&self, generation: u64) -> bool {
        let snap = self.session.snapshot();
        snap.state.is_usable() && snap.generation == generation
    }

    async fn send_item(&self, generation: u64, request: &SendRequest) -> SendResult {
        let chat_id = match normalize_recipient(&request.recipient) {
            Ok(chat_id) => chat_id,
            Err(e) => {
                wasend_prometheus::record_send(Some(SendErrorKind::InvalidAddress));
                return SendResult::error(request, None, SendErrorKind::InvalidAddress, e.message);
            }
        };

        match self.send_with_timeout(generation, &chat_id, &request.body).await {
            Ok(_) => SendResult::ok(request, &chat_id),
            Err(e) => SendResult::error(request, Some(&chat_id), e.kind.into(), e.message),
        }
    }

    /// The one place that talks to the capability.
    ///
    /// Session-fatal errors mark the session disconnected so the liveness
    /// check stops the rest of a running batch.
    async fn send_with_timeout(
        &self,
        generation: u64,
        chat_id: &ChatAddress,
        body: &str,
    ) -> Result<MessageId, ClientError> {
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.send_timeout,
            self.session.client().send_message(chat_id, body),
        )
        .await;
        wasend_prometheus::record_send_latency(started.elapsed().as_secs_f64());

        let result = match outcome {
            Ok(result) => result,
            Err(_) => Err(ClientError::new(
                wasend_core::ClientErrorKind::Timeout,
                format!("send timed out after {:?}", self.send_timeout),
            )),
        };

        match &result {
            Ok(id) => {
                debug!(chat_id = %chat_id, message_id = %id.0, "message sent");
                wasend_prometheus::record_send(None);
            }
            Err(e) => {
                warn!(chat_id = %chat_id, kind = %e.kind, error = %e.message, "send failed");
                wasend_prometheus::record_send(Some(e.kind.into()));
                if e.kind.is_session_fatal() {
                    self.session.mark_disconnected(generation, e.to_string());
                }
            }
        }
        result
    }

    fn finish(&self, batch_id: Uuid, results: Vec<SendResult>) -> BatchLedger {
        let ledger = BatchLedger::new(batch_id, results);
        info!(
            %batch_id,
            ok = ledger.ok_count(),
            failed = ledger.error_count(),
            "batch finished"
        );
        wasend_prometheus::record_batch(&ledger);
        ledger
    }
}
