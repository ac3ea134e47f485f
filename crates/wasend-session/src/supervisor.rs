// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconnect supervisor.
//!
//! Watches session transitions. When the current generation lands in Failed
//! or Disconnected it waits an exponentially growing delay and calls
//! `initialize()` again, up to `max_attempts` times. A usable session is
//! probed with `get_state()` on a fixed interval; a failed probe marks it
//! Disconnected, which feeds back into the same reconnect path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wasend_config::model::ReconnectConfig;

use crate::lifecycle::SessionLifecycle;

/// Exponential backoff: `min(base * 2^(attempt - 1), max_delay)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl BackoffPolicy {
    /// Delay before the 1-based `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

impl From<&ReconnectConfig> for BackoffPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            base: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            max_attempts: config.max_attempts,
        }
    }
}

/// Restarts failed sessions and probes usable ones.
pub struct ReconnectSupervisor {
    session: Arc<SessionLifecycle>,
    policy: BackoffPolicy,
    liveness_interval: Duration,
    probe_timeout: Duration,
}

impl ReconnectSupervisor {
    pub fn new(session: Arc<SessionLifecycle>, config: &ReconnectConfig) -> Self {
        Self {
            session,
            policy: BackoffPolicy::from(config),
            liveness_interval: Duration::from_secs(config.liveness_interval_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Start supervising in the background until `cancel` fires.
    ///
    /// Subscribes before spawning, so a failure during the very first
    /// `initialize()` after this call is never missed.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        let events = self.session.subscribe();
        tokio::spawn(self.run(events, cancel))
    }

    async fn run(
        self,
        mut events: tokio::sync::broadcast::Receiver<wasend_core::SessionEvent>,
        cancel: CancellationToken,
    ) {
        let mut probe = tokio::time::interval_at(
            tokio::time::Instant::now() + self.liveness_interval,
            self.liveness_interval,
        );
        probe.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            max_attempts = self.policy.max_attempts,
            base_ms = self.policy.base.as_millis() as u64,
            "reconnect supervisor started"
        );

        // The session may already be down when we start.
        let snap = self.session.snapshot();
        if snap.state.is_fatal() {
            self.recover(snap.generation, &cancel).await;
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => {
                        if event.to.is_fatal() && event.generation == self.session.generation() {
                            self.recover(event.generation, &cancel).await;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "supervisor lagged behind session events, resyncing");
                        let snap = self.session.snapshot();
                        if snap.state.is_fatal() {
                            self.recover(snap.generation, &cancel).await;
                        }
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = probe.tick() => self.probe().await,
            }
        }

        info!("reconnect supervisor stopped");
    }

    /// One reconnect step for a failed `generation`.
    async fn recover(&self, generation: u64, cancel: &CancellationToken) {
        let snap = self.session.snapshot();
        if snap.generation != generation || !snap.state.is_fatal() {
            return;
        }

        if snap.reconnect_attempts >= self.policy.max_attempts {
            if !snap.reconnect_exhausted {
                error!(
                    attempts = snap.reconnect_attempts,
                    state = %snap.state,
                    "reconnect attempts exhausted, manual relink required"
                );
                self.session.mark_exhausted();
            }
            return;
        }

        let attempt = self.session.begin_reconnect_attempt();
        let delay = self.policy.delay_for(attempt);
        info!(
            attempt,
            max_attempts = self.policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "scheduling session reconnect"
        );

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        if self.session.generation() != generation {
            debug!(generation, "session restarted while waiting, skipping reconnect");
            return;
        }
        self.session.initialize().await;
    }

    async fn probe(&self) {
        let snap = self.session.snapshot();
        if !snap.state.is_usable() {
            return;
        }

        let reason = match tokio::time::timeout(self.probe_timeout, self.session.client().get_state())
            .await
        {
            Ok(Ok(state)) if state.is_connected() => {
                debug!("liveness probe ok");
                return;
            }
            Ok(Ok(state)) => format!("liveness probe reported {state}"),
            Ok(Err(e)) => format!("liveness probe failed: {e}"),
            Err(_) => format!("liveness probe timed out after {:?}", self.probe_timeout),
        };

        warn!(generation = snap.generation, %reason, "session failed liveness probe");
        self.session.mark_disconnected(snap.generation, reason);
    }
}
