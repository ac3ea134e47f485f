// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session management for wasend.
//!
//! - [`SessionLifecycle`] owns the connection to the messaging capability and
//!   drives the session FSM from capability events.
//! - [`ReadinessGate`] lets callers wait, with a bound, for the session to
//!   become usable.
//! - [`ReconnectSupervisor`] restarts failed sessions with exponential backoff
//!   and probes a usable session for liveness.

pub mod gate;
pub mod lifecycle;
pub mod supervisor;

pub use gate::ReadinessGate;
pub use lifecycle::SessionLifecycle;
pub use supervisor::{BackoffPolicy, ReconnectSupervisor};
