// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for wasend.
//!
//! Public routes serve the pairing page, liveness and health, and Prometheus
//! metrics. The `/v1` API (single send, batch submission, relink) sits behind
//! an optional bearer token.

pub mod auth;
pub mod handlers;
pub mod pairing;
pub mod server;

pub use auth::AuthConfig;
pub use server::{build_router, start_server, GatewayState, HealthState};
