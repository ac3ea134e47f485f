// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express: URL schemes, non-zero
//! timeouts, and a coherent backoff window. All errors are collected.

use crate::diagnostic::ConfigError;
use crate::model::WasendConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns every problem found, not just the first one.
pub fn validate_config(config: &WasendConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        fail(format!(
            "service.log_level `{}` must be one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        fail(format!(
            "gateway.host `{host}` is not a valid IP address or hostname"
        ));
    }

    if let Some(token) = &config.gateway.bearer_token
        && token.trim().is_empty()
    {
        fail("gateway.bearer_token must not be blank when set".to_string());
    }

    if !is_http_url(&config.bridge.base_url) {
        fail(format!(
            "bridge.base_url `{}` must start with http:// or https://",
            config.bridge.base_url
        ));
    }

    if let Some(url) = &config.webhook.url
        && !is_http_url(url)
    {
        fail(format!(
            "webhook.url `{url}` must start with http:// or https://"
        ));
    }

    for (key, value) in [
        ("bridge.request_timeout_secs", config.bridge.request_timeout_secs),
        ("dispatch.readiness_timeout_ms", config.dispatch.readiness_timeout_ms),
        ("dispatch.send_timeout_secs", config.dispatch.send_timeout_secs),
        ("webhook.timeout_secs", config.webhook.timeout_secs),
        ("reconnect.base_delay_ms", config.reconnect.base_delay_ms),
        ("reconnect.liveness_interval_secs", config.reconnect.liveness_interval_secs),
        ("reconnect.probe_timeout_secs", config.reconnect.probe_timeout_secs),
    ] {
        if value == 0 {
            fail(format!("{key} must be greater than zero"));
        }
    }

    if config.dispatch.queue_capacity == 0 {
        fail("dispatch.queue_capacity must be at least 1".to_string());
    }

    if config.reconnect.max_attempts == 0 {
        fail("reconnect.max_attempts must be at least 1".to_string());
    }

    if config.reconnect.base_delay_ms > config.reconnect.max_delay_ms {
        fail(format!(
            "reconnect.base_delay_ms ({}) must not exceed reconnect.max_delay_ms ({})",
            config.reconnect.base_delay_ms, config.reconnect.max_delay_ms
        ));
    }

    if config.webhook.url.is_some() && config.webhook.secret.is_none() {
        tracing::warn!("webhook.url is set without webhook.secret; payloads will carry an empty secret");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    ["http://", "https://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(errors: &[ConfigError]) -> Vec<String> {
        errors.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&WasendConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = WasendConfig::default();
        config.dispatch.send_timeout_secs = 0;
        config.dispatch.queue_capacity = 0;
        config.reconnect.base_delay_ms = 120_000;
        config.bridge.base_url = "localhost:3001".to_string();

        let errors = validate_config(&config).unwrap_err();
        let text = messages(&errors).join("\n");
        assert_eq!(errors.len(), 4, "{text}");
        assert!(text.contains("dispatch.send_timeout_secs"));
        assert!(text.contains("dispatch.queue_capacity"));
        assert!(text.contains("reconnect.base_delay_ms"));
        assert!(text.contains("bridge.base_url"));
    }

    #[test]
    fn rejects_non_http_webhook() {
        let mut config = WasendConfig::default();
        config.webhook.url = Some("ftp://example.com/hook".to_string());
        config.webhook.secret = Some("s".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(messages(&errors)[0].contains("webhook.url"));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = WasendConfig::default();
        config.service.log_level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_blank_bearer_token() {
        let mut config = WasendConfig::default();
        config.gateway.bearer_token = Some("  ".to_string());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn http_url_check() {
        assert!(is_http_url("https://script.google.com/macros/s/abc/exec"));
        assert!(is_http_url("http://127.0.0.1:3001"));
        assert!(!is_http_url("http://"));
        assert!(!is_http_url("127.0.0.1"));
    }
}
