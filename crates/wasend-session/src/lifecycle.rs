// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session FSM over the messaging capability.
//!
//! States: Initializing -> AwaitingPairing -> Authenticated -> Usable, with
//! Failed and Disconnected reachable from anywhere. The current snapshot is
//! published on a `watch` channel (read by the gate and the HTTP layer) and
//! every transition is broadcast as a [`SessionEvent`] (read by the
//! supervisor).
//!
//! Each `initialize()` starts a new generation. Capability events are pumped
//! by a task bound to that generation, so events from a torn-down session can
//! never move the current one.
//!
//! Sends hold a read guard from [`SessionLifecycle::begin_use`]; initialize,
//! relink and shutdown take the write side before touching the capability,
//! so the resource is never torn down under an in-flight send.

use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use wasend_core::{
    ClientEvent, MessagingClient, SessionEvent, SessionSnapshot, SessionState,
};

use crate::gate::ReadinessGate;

/// Capacity of the capability event channel handed to `initialize`.
const CLIENT_EVENT_CAPACITY: usize = 32;

/// Capacity of the transition broadcast; slow subscribers see `Lagged`.
const TRANSITION_CAPACITY: usize = 64;

/// Owns the session and its connection to the messaging capability.
///
/// Shared as `Arc<SessionLifecycle>`; all mutation goes through its methods.
pub struct SessionLifecycle {
    client: Arc<dyn MessagingClient>,
    shared: Arc<Shared>,
    /// Serializes initialize/relink/shutdown.
    init_lock: Mutex<()>,
    /// Read side held per send, write side across teardown and restart.
    usage: RwLock<()>,
    pump: StdMutex<Option<JoinHandle<()>>>,
}

struct Shared {
    snapshot: watch::Sender<SessionSnapshot>,
    transitions: broadcast::Sender<SessionEvent>,
}

impl SessionLifecycle {
    pub fn new(client: Arc<dyn MessagingClient>) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::new());
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self {
            client,
            shared: Arc::new(Shared {
                snapshot,
                transitions,
            }),
            init_lock: Mutex::new(()),
            usage: RwLock::new(()),
            pump: StdMutex::new(None),
        }
    }

    pub fn client(&self) -> &Arc<dyn MessagingClient> {
        &self.client
    }

    /// (Re)start the session.
    ///
    /// Tears down any previous capability resource, starts a new generation
    /// in `Initializing`, and asks the capability to initialize. A failing
    /// capability lands the session in `Failed`; nothing is returned to the
    /// caller.
    ///
    /// Waits for in-flight sends to finish before destroying anything.
    pub async fn initialize(&self) {
        let _guard = self.init_lock.lock().await;
        let _exclusive = self.usage.write().await;
        self.initialize_locked().await;
    }

    /// Caller holds `init_lock` and the write side of `usage`.
    async fn initialize_locked(&self) {
        self.stop_pump();

        if self.generation() > 0
            && let Err(e) = self.client.destroy().await
        {
            warn!(client = self.client.name(), error = %e, "failed to destroy previous session");
        }

        let generation = {
            let mut next = 0;
            self.shared.snapshot.send_modify(|snap| {
                snap.generation += 1;
                next = snap.generation;
            });
            next
        };
        self.shared
            .transition(Some(generation), SessionState::Initializing, None);

        let (tx, rx) = mpsc::channel(CLIENT_EVENT_CAPACITY);
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(pump_events(shared, generation, rx));
        *self.pump.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        info!(client = self.client.name(), generation, "initializing session");
        if let Err(e) = self.client.initialize(tx).await {
            warn!(generation, error = %e, "messaging client failed to initialize");
            self.shared.transition(
                Some(generation),
                SessionState::Failed {
                    reason: e.to_string(),
                },
                None,
            );
        }
    }

    /// Log out on the capability, forget reconnect exhaustion, and start over.
    ///
    /// This is the manual re-pairing path: the next session will ask for a
    /// fresh QR code.
    pub async fn relink(&self) {
        let _guard = self.init_lock.lock().await;
        let _exclusive = self.usage.write().await;
        if let Err(e) = self.client.logout().await {
            warn!(error = %e, "logout failed during relink, reinitializing anyway");
        }
        self.shared.snapshot.send_modify(|snap| {
            snap.reconnect_attempts = 0;
            snap.reconnect_exhausted = false;
        });
        info!("session relink requested");
        self.initialize_locked().await;
    }

    /// Move a usable session of `generation` to `Disconnected`.
    ///
    /// No-op (returns false) if the session already left `Usable` or was
    /// restarted in the meantime, so repeated reports of the same loss start
    /// only one reconnect.
    pub fn mark_disconnected(&self, generation: u64, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        self.shared.apply(
            |snap| snap.generation == generation && snap.state.is_usable(),
            SessionState::Disconnected { reason },
            None,
        )
    }

    /// Count one reconnect attempt; returns the new total.
    pub fn begin_reconnect_attempt(&self) -> u32 {
        let mut attempts = 0;
        self.shared.snapshot.send_modify(|snap| {
            snap.reconnect_attempts += 1;
            attempts = snap.reconnect_attempts;
        });
        wasend_prometheus::record_reconnect_attempt();
        attempts
    }

    /// Record that the supervisor gave up. Health reports `failed` until a relink.
    pub fn mark_exhausted(&self) {
        self.shared
            .snapshot
            .send_if_modified(|snap| !std::mem::replace(&mut snap.reconnect_exhausted, true));
    }

    /// Stop pumping events and release the capability.
    pub async fn shutdown(&self) {
        let _guard = self.init_lock.lock().await;
        let _exclusive = self.usage.write().await;
        self.stop_pump();
        if let Err(e) = self.client.destroy().await {
            warn!(error = %e, "failed to destroy session on shutdown");
        }
    }

    /// Hold the capability for one send.
    ///
    /// While the guard lives no initialize, relink or shutdown can destroy the
    /// resource. Callers re-check the generation after acquiring it: a restart
    /// that ran while they waited has already replaced the session.
    pub async fn begin_use(&self) -> RwLockReadGuard<'_, ()> {
        self.usage.read().await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn current_state(&self) -> SessionState {
        self.shared.snapshot.borrow().state.clone()
    }

    pub fn generation(&self) -> u64 {
        self.shared.snapshot.borrow().generation
    }

    /// Stream of state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.transitions.subscribe()
    }

    /// Raw snapshot receiver, for callers that want change notification.
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn gate(&self) -> ReadinessGate {
        ReadinessGate::new(self.watch())
    }

    fn stop_pump(&self) {
        if let Some(handle) = self.pump.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

impl Drop for SessionLifecycle {
    fn drop(&mut self) {
        self.stop_pump();
    }
}

impl Shared {
    /// Transition if `generation` (when given) is still current and the FSM allows it.
    fn transition(
        &self,
        generation: Option<u64>,
        next: SessionState,
        pairing_code: Option<String>,
    ) -> bool {
        self.apply(
            |snap| match generation {
                Some(g) if g != snap.generation => {
                    debug!(event_generation = g, current = snap.generation, "dropping stale session event");
                    false
                }
                _ => true,
            },
            next,
            pairing_code,
        )
    }

    fn apply(
        &self,
        applicable: impl FnOnce(&SessionSnapshot) -> bool,
        next: SessionState,
        pairing_code: Option<String>,
    ) -> bool {
        let mut previous = None;
        let mut generation = 0;
        let changed = self.snapshot.send_if_modified(|snap| {
            if !applicable(snap) {
                return false;
            }
            if !snap.state.can_transition_to(&next) {
                warn!(from = %snap.state, to = %next, "ignoring invalid session transition");
                return false;
            }

            previous = Some(std::mem::replace(&mut snap.state, next.clone()));
            snap.last_transition_at = Utc::now();
            snap.pairing_code = match next {
                SessionState::AwaitingPairing => pairing_code,
                _ => None,
            };
            if next.is_usable() {
                snap.reconnect_attempts = 0;
                snap.reconnect_exhausted = false;
            }
            generation = snap.generation;
            true
        });

        let Some(from) = previous.filter(|_| changed) else {
            return false;
        };

        match &next {
            SessionState::Failed { reason } | SessionState::Disconnected { reason } => {
                warn!(generation, from = from.label(), to = next.label(), %reason, "session transition");
            }
            _ => info!(generation, from = from.label(), to = next.label(), "session transition"),
        }
        wasend_prometheus::record_session_transition(&next);

        // No subscribers is fine.
        let _ = self.transitions.send(SessionEvent {
            generation,
            from,
            to: next,
            at: Utc::now(),
        });
        true
    }

    fn on_client_event(&self, generation: u64, event: ClientEvent) {
        match event {
            ClientEvent::Qr(code) => {
                if self.transition(Some(generation), SessionState::AwaitingPairing, Some(code)) {
                    info!(generation, "pairing code available");
                }
            }
            ClientEvent::Authenticated => {
                self.transition(Some(generation), SessionState::Authenticated, None);
            }
            ClientEvent::Ready => {
                self.transition(Some(generation), SessionState::Usable, None);
            }
            ClientEvent::AuthFailure(reason) => {
                self.transition(Some(generation), SessionState::Failed { reason }, None);
            }
            ClientEvent::Disconnected(reason) => {
                self.transition(Some(generation), SessionState::Disconnected { reason }, None);
            }
        }
    }
}

async fn pump_events(shared: Arc<Shared>, generation: u64, mut rx: mpsc::Receiver<ClientEvent>) {
    while let Some(event) = rx.recv().await {
        debug!(generation, ?event, "client event");
        shared.on_client_event(generation, event);
    }
    debug!(generation, "client event stream closed");
}
