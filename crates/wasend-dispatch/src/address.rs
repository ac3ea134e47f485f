// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient normalization.

use wasend_core::{ChatAddress, ClientError, ClientErrorKind};

const USER_SUFFIX: &str = "@c.us";
const GROUP_SUFFIX: &str = "@g.us";

/// Canonical chat address for a submitted recipient.
///
/// Fully-qualified user or group ids pass through (trimmed). Anything else is
/// reduced to its digits and suffixed with `@c.us`, so `+55 (11) 98765-4321`
/// becomes `5511987654321@c.us`.
pub fn normalize_recipient(recipient: &str) -> Result<ChatAddress, ClientError> {
    let trimmed = recipient.trim();
    if trimmed.contains(USER_SUFFIX) || trimmed.contains(GROUP_SUFFIX) {
        return Ok(ChatAddress(trimmed.to_string()));
    }

    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(ClientError::new(
            ClientErrorKind::InvalidAddress,
            format!("recipient `{trimmed}` contains no digits"),
        ));
    }
    Ok(ChatAddress(format!("{digits}{USER_SUFFIX}")))
}
