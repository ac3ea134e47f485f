// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging capability backed by a WhatsApp Web automation sidecar.
//!
//! The sidecar owns the browser and the WhatsApp protocol. [`BridgeClient`]
//! drives it over a small HTTP API and turns its Server-Sent Events stream
//! into [`ClientEvent`](wasend_core::ClientEvent)s.

pub mod client;
pub mod sse;
pub mod types;

pub use client::BridgeClient;
