// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for wasend.
//!
//! [`MockClient`] is a scriptable [`MessagingClient`](wasend_core::MessagingClient)
//! used by the session, dispatch, gateway, and binary tests.

pub mod mock_client;

pub use mock_client::{client_error, MockCall, MockClient, SentMessage};
