// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded wait for a usable session.

use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

use wasend_core::SessionSnapshot;

/// Waits for the session to reach `Usable`.
///
/// Cheap to clone. Each waiter owns its receiver, so any number of callers can
/// wait at once and each times out on its own.
#[derive(Clone)]
pub struct ReadinessGate {
    rx: watch::Receiver<SessionSnapshot>,
}

impl ReadinessGate {
    pub fn new(rx: watch::Receiver<SessionSnapshot>) -> Self {
        Self { rx }
    }

    /// True iff the session is (or becomes) usable within `timeout`.
    pub async fn await_usable(&self, timeout: Duration) -> bool {
        let mut rx = self.rx.clone();
        let ready = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|snap| snap.state.is_usable())).await,
            Ok(Ok(_))
        );
        if !ready {
            debug!(timeout_ms = timeout.as_millis() as u64, "session not usable before timeout");
        }
        ready
    }

    pub fn is_usable(&self) -> bool {
        self.rx.borrow().state.is_usable()
    }
}
