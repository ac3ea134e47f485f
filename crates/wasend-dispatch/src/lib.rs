// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch dispatch for wasend.
//!
//! A submitted batch is validated, queued, and handed to a single worker. The
//! worker waits for a usable session, sends every item in order through the
//! [`BatchDispatcher`], and fires the resulting ledger at the webhook.

pub mod address;
pub mod dispatcher;
pub mod queue;
pub mod webhook;

pub use address::normalize_recipient;
pub use dispatcher::{BatchDispatcher, Delivery};
pub use queue::BatchQueue;
pub use webhook::WebhookReporter;
