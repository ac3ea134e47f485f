// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for wasend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of silently falling back to a default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level wasend configuration.
///
/// Every section is optional and defaults to values that work against a
/// bridge sidecar on localhost.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WasendConfig {
    /// Process-wide settings (name, logging).
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP surface settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Automation sidecar connection settings.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// Batch dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Result webhook settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Reconnect supervisor settings.
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Process-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Instance name, shown on the pairing page and in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "wasend".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token required on `/v1/*` routes. `None` leaves them open.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

/// Automation sidecar configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Base URL of the sidecar HTTP API.
    #[serde(default = "default_bridge_url")]
    pub base_url: String,

    /// Optional API key sent as `x-api-key`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Timeout for lifecycle calls to the sidecar, in seconds.
    #[serde(default = "default_bridge_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            api_key: None,
            request_timeout_secs: default_bridge_timeout_secs(),
        }
    }
}

impl BridgeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_bridge_url() -> String {
    "http://127.0.0.1:3001".to_string()
}

fn default_bridge_timeout_secs() -> u64 {
    30
}

/// Batch dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// How long a batch or single send waits for the session, in milliseconds.
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,

    /// Upper bound for one send, in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Re-check session liveness before every item of a batch.
    #[serde(default = "default_check_liveness")]
    pub check_liveness: bool,

    /// Batches that may wait behind the running one.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            readiness_timeout_ms: default_readiness_timeout_ms(),
            send_timeout_secs: default_send_timeout_secs(),
            check_liveness: default_check_liveness(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl DispatchConfig {
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

fn default_readiness_timeout_ms() -> u64 {
    10_000
}

fn default_send_timeout_secs() -> u64 {
    30
}

fn default_check_liveness() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    32
}

/// Result webhook configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Destination URL. `None` disables reporting (ledgers are only logged).
    #[serde(default)]
    pub url: Option<String>,

    /// Shared secret included in every payload.
    #[serde(default)]
    pub secret: Option<String>,

    /// Delivery timeout, in seconds.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            secret: None,
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl WebhookConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_webhook_timeout_secs() -> u64 {
    30
}

/// Reconnect supervisor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    /// First backoff delay, in milliseconds. Doubles per attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Attempts before giving up and reporting a terminal failure.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Interval between liveness probes, in seconds.
    #[serde(default = "default_liveness_interval_secs")]
    pub liveness_interval_secs: u64,

    /// Timeout for a single liveness probe, in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
            liveness_interval_secs: default_liveness_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_liveness_interval_secs() -> u64 {
    30
}

fn default_probe_timeout_secs() -> u64 {
    10
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Expose `/metrics`.
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}
