// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wasend status` command implementation.
//!
//! Reads `/health` from a running gateway and prints the session state.
//! A failed session answers 503 with the same body, so the body is parsed
//! regardless of status code.

use std::io::IsTerminal;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wasend_config::model::WasendConfig;
use wasend_core::WasendError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    state: String,
    #[serde(default)]
    reason: Option<String>,
    reconnect_attempts: u32,
    uptime_secs: u64,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusReport {
    pub running: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconnect_attempts: Option<u32>,
    pub uptime_secs: Option<u64>,
    pub endpoint: String,
}

impl StatusReport {
    fn offline(endpoint: String) -> Self {
        Self {
            running: false,
            status: "not running".to_string(),
            state: None,
            reason: None,
            reconnect_attempts: None,
            uptime_secs: None,
            endpoint,
        }
    }
}

fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Health endpoint for the configured gateway. A wildcard bind address is
/// queried over loopback.
pub fn health_url(config: &WasendConfig) -> String {
    let host = match config.gateway.host.as_str() {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        host => host,
    };
    format!("http://{host}:{}/health", config.gateway.port)
}

/// Query `url`; any transport or decode failure reports "not running".
pub async fn fetch_status(url: &str) -> Result<StatusReport, WasendError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .map_err(|e| WasendError::Internal(format!("failed to create HTTP client: {e}")))?;

    let health = match client.get(url).send().await {
        Ok(resp) => resp.json::<HealthResponse>().await.ok(),
        Err(e) => {
            tracing::debug!(error = %e, url, "health request failed");
            None
        }
    };

    Ok(match health {
        Some(h) => StatusReport {
            running: true,
            status: h.status,
            state: Some(h.state),
            reason: h.reason,
            reconnect_attempts: Some(h.reconnect_attempts),
            uptime_secs: Some(h.uptime_secs),
            endpoint: url.to_string(),
        },
        None => StatusReport::offline(url.to_string()),
    })
}

pub async fn run_status(config: &WasendConfig, json: bool, plain: bool) -> Result<(), WasendError> {
    let report = fetch_status(&health_url(config)).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| WasendError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        print_report(&report, use_color);
    }
    Ok(())
}

fn print_report(report: &StatusReport, use_color: bool) {
    use colored::Colorize;

    println!();
    println!("  wasend status");
    println!("  {}", "-".repeat(35));

    let state = report.state.as_deref().unwrap_or("-");
    let line = match (report.running, report.status.as_str()) {
        (false, _) if use_color => format!("{} {}", "✗".red(), "not running".red()),
        (false, _) => "[FAIL] not running".to_string(),
        (true, "ok") if use_color => format!("{} {}", "✓".green(), state.green()),
        (true, "ok") => format!("[OK] {state}"),
        (true, "failed") if use_color => format!("{} {}", "✗".red(), state.red()),
        (true, "failed") => format!("[FAIL] {state}"),
        (true, _) if use_color => format!("{} {}", "~".yellow(), state.yellow()),
        (true, _) => format!("[WAIT] {state}"),
    };
    println!("    State:    {line}");

    if let Some(uptime) = report.uptime_secs {
        println!("    Uptime:   {}", format_uptime(uptime));
    }
    if let Some(attempts) = report.reconnect_attempts
        && attempts > 0
    {
        println!("    Retries:  {attempts}");
    }
    if let Some(reason) = &report.reason {
        println!("    Reason:   {reason}");
    }
    println!("    Endpoint: {}", report.endpoint);
    if !report.running {
        println!();
        println!("  Start with: wasend serve");
    }
    println!();
}
