// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capability trait definitions.
//!
//! The messaging capability is the only seam to the outside world that the
//! session and dispatch crates depend on. Adapters use `#[async_trait]` for
//! dynamic dispatch compatibility.

pub mod client;

pub use client::MessagingClient;
