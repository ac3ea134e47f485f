// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wasend serve` command implementation.
//!
//! Wires the bridge capability into the session lifecycle, starts the
//! reconnect supervisor and the dispatch worker, then serves the gateway
//! until a shutdown signal arrives.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use wasend_bridge::BridgeClient;
use wasend_config::model::WasendConfig;
use wasend_core::{SessionSnapshot, WasendError};
use wasend_dispatch::{BatchDispatcher, BatchQueue, WebhookReporter};
use wasend_gateway::{pairing, start_server, AuthConfig, GatewayState, HealthState};
use wasend_session::{ReconnectSupervisor, SessionLifecycle};

use crate::shutdown;

/// Crates whose logs follow the configured level.
const LOG_TARGETS: &[&str] = &[
    "wasend",
    "wasend_core",
    "wasend_config",
    "wasend_session",
    "wasend_dispatch",
    "wasend_bridge",
    "wasend_gateway",
    "wasend_prometheus",
];

pub async fn run_serve(config: WasendConfig) -> Result<(), WasendError> {
    init_tracing(&config.service.log_level);
    info!(name = %config.service.name, bridge = %config.bridge.base_url, "starting wasend");

    let cancel = shutdown::install_signal_handler();
    let health = health_state(&config)?;

    let client = Arc::new(BridgeClient::new(&config.bridge)?);
    let session = Arc::new(SessionLifecycle::new(client));

    let supervisor =
        ReconnectSupervisor::new(Arc::clone(&session), &config.reconnect).spawn(cancel.clone());
    let pairing_printer = tokio::spawn(print_pairing_codes(session.watch(), cancel.clone()));

    // Initialize in the background so the gateway (and its pairing page)
    // comes up even while the sidecar is slow to answer.
    {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.initialize().await });
    }

    let dispatcher = Arc::new(BatchDispatcher::new(Arc::clone(&session), &config.dispatch));
    let reporter = Arc::new(WebhookReporter::new(&config.webhook)?);
    if !reporter.is_configured() {
        warn!("no webhook url configured, batch results will only be logged");
    }
    let (queue, worker) = BatchQueue::start(
        Arc::clone(&dispatcher),
        reporter,
        config.dispatch.queue_capacity,
        cancel.clone(),
    );

    let state = GatewayState {
        session: Arc::clone(&session),
        dispatcher,
        queue,
        auth: AuthConfig {
            bearer_token: config.gateway.bearer_token.clone(),
        },
        health,
    };

    let served = start_server(&config.gateway, state, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "gateway failed");
    }

    // The server only returns on shutdown or failure; stop everything else.
    cancel.cancel();
    if let Err(e) = supervisor.await {
        warn!(error = %e, "reconnect supervisor task failed");
    }
    if let Err(e) = worker.await {
        warn!(error = %e, "dispatch worker task failed");
    }
    let _ = pairing_printer.await;
    session.shutdown().await;

    info!("wasend stopped");
    served
}

#[cfg(feature = "prometheus")]
fn health_state(config: &WasendConfig) -> Result<HealthState, WasendError> {
    let mut health = HealthState::new();
    if config.prometheus.enabled {
        let exporter = Arc::new(wasend_prometheus::PrometheusExporter::install()?);
        health.prometheus_render = Some(Arc::new(move || exporter.render()));
    }
    Ok(health)
}

#[cfg(not(feature = "prometheus"))]
fn health_state(config: &WasendConfig) -> Result<HealthState, WasendError> {
    if config.prometheus.enabled {
        warn!("prometheus enabled in config but not compiled in");
    }
    Ok(HealthState::new())
}

/// Render each new pairing code to stderr as a terminal QR.
async fn print_pairing_codes(mut rx: watch::Receiver<SessionSnapshot>, cancel: CancellationToken) {
    let mut last: Option<String> = None;
    loop {
        let code = rx.borrow_and_update().pairing_code.clone();
        if code != last {
            if let Some(code) = &code {
                match pairing::render_terminal(code) {
                    Ok(rendered) => {
                        eprintln!();
                        eprintln!("Scan in WhatsApp > Linked Devices:");
                        eprintln!("{rendered}");
                    }
                    Err(e) => warn!(error = %e, "failed to render pairing QR in terminal"),
                }
            }
            last = code;
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            changed = rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={log_level}"))
            .chain(std::iter::once("warn".to_string()))
            .collect();
        EnvFilter::new(directives.join(","))
    });

    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
