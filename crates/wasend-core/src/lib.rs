// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for wasend.
//!
//! This crate provides the error taxonomy, the batch and session data model,
//! and the [`MessagingClient`] capability trait that every other crate in the
//! workspace builds on.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ClientError, ClientErrorKind, SendErrorKind, WasendError};
pub use traits::MessagingClient;
pub use types::{
    BatchLedger, ChatAddress, ClientEvent, ClientState, MessageId, SendRequest, SendResult,
    SendStatus, ServiceHealth, SessionEvent, SessionSnapshot, SessionState,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasend_error_has_all_variants() {
        let _config = WasendError::Config("test".into());
        let _validation = WasendError::validation("test");
        let _not_usable = WasendError::SessionNotUsable {
            waited: std::time::Duration::from_secs(10),
        };
        let _send = WasendError::Send {
            kind: SendErrorKind::Other,
            message: "test".into(),
        };
        let _webhook = WasendError::Webhook {
            message: "test".into(),
            source: None,
        };
        let _client = WasendError::Client {
            message: "test".into(),
            source: Some(Box::new(std::io::Error::other("test"))),
        };
        let _unavailable = WasendError::Unavailable("queue full".into());
        let _internal = WasendError::Internal("test".into());
    }

    #[test]
    fn messaging_client_is_object_safe() {
        fn _assert_dyn(_: &dyn MessagingClient) {}
    }
}
