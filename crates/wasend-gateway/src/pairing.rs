// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pairing QR rendering for the browser page and the terminal.

use qrcode::render::{svg, unicode};
use qrcode::QrCode;

use wasend_core::{SessionSnapshot, SessionState, WasendError};

/// Seconds between automatic reloads of the pairing page.
const REFRESH_SECS: u32 = 5;

fn encode(payload: &str) -> Result<QrCode, WasendError> {
    if payload.trim().is_empty() {
        return Err(WasendError::Internal("pairing payload is empty".into()));
    }
    QrCode::new(payload.as_bytes())
        .map_err(|e| WasendError::Internal(format!("failed to encode pairing QR: {e}")))
}

/// Inline SVG for the pairing page.
pub fn render_svg(payload: &str) -> Result<String, WasendError> {
    Ok(encode(payload)?
        .render::<svg::Color<'_>>()
        .min_dimensions(256, 256)
        .quiet_zone(true)
        .build())
}

/// Half-height block rendering for a terminal.
pub fn render_terminal(payload: &str) -> Result<String, WasendError> {
    Ok(encode(payload)?
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

/// Full HTML for `GET /`.
///
/// While the session awaits pairing the page embeds the current QR code.
/// Every other state gets a one-line status. The page reloads itself until
/// the session is usable.
pub fn render_page(snapshot: &SessionSnapshot) -> String {
    let (body, refresh) = match (&snapshot.state, snapshot.pairing_code.as_deref()) {
        (SessionState::AwaitingPairing, Some(code)) => match render_svg(code) {
            Ok(svg) => (
                format!(
                    "<h1>Link a device</h1>\n<p>Open WhatsApp, go to Linked Devices and scan this code.</p>\n<div class=\"qr\">{svg}</div>"
                ),
                true,
            ),
            Err(e) => {
                tracing::warn!(error = %e, "cannot render pairing QR");
                (
                    "<h1>Pairing code unavailable</h1>\n<p>Check the service logs.</p>".to_string(),
                    true,
                )
            }
        },
        (SessionState::AwaitingPairing, None) | (SessionState::Initializing, _) => (
            "<h1>Starting session</h1>\n<p>Waiting for a pairing code.</p>".to_string(),
            true,
        ),
        (SessionState::Authenticated, _) => (
            "<h1>Authenticated</h1>\n<p>Loading chats.</p>".to_string(),
            true,
        ),
        (SessionState::Usable, _) => (
            "<h1>Connected</h1>\n<p>The session is ready to send messages.</p>".to_string(),
            false,
        ),
        (SessionState::Failed { reason } | SessionState::Disconnected { reason }, _) => {
            let headline = if snapshot.reconnect_exhausted {
                "Reconnection gave up"
            } else {
                "Reconnecting"
            };
            (
                format!(
                    "<h1>{headline}</h1>\n<p>{}</p>",
                    escape_html(reason)
                ),
                !snapshot.reconnect_exhausted,
            )
        }
    };

    let meta = if refresh {
        format!("<meta http-equiv=\"refresh\" content=\"{REFRESH_SECS}\">\n")
    } else {
        String::new()
    };

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n{meta}<title>wasend</title>\n\
         <style>body{{font-family:sans-serif;text-align:center;margin-top:3em}}.qr svg{{max-width:320px}}</style>\n\
         </head>\n<body>\n{body}\n<p><small>state: {}</small></p>\n</body>\n</html>\n",
        snapshot.state.label()
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
