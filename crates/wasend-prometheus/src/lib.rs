// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for wasend.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. The recording
//! helpers in [`recording`] are safe to call whether or not a recorder is
//! installed, so library crates record unconditionally and the binary
//! decides whether to export.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use wasend_core::WasendError;

pub use recording::{
    record_batch, record_reconnect_attempt, record_send, record_send_latency,
    record_session_transition, record_webhook, set_queue_depth,
};

/// Owns the installed Prometheus recorder.
pub struct PrometheusExporter {
    handle: PrometheusHandle,
}

impl PrometheusExporter {
    /// Installs the Prometheus recorder globally.
    ///
    /// Only one recorder can be installed per process; a second call fails.
    pub fn install() -> Result<Self, WasendError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            WasendError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
