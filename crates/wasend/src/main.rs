// SPDX-FileCopyrightText: 2026 Wasend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! wasend - readiness-gated WhatsApp batch sender.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wasend_config::model::WasendConfig;

/// wasend - readiness-gated WhatsApp batch sender.
#[derive(Parser, Debug)]
#[command(name = "wasend", version, about, long_about = None)]
struct Cli {
    /// Load this TOML file instead of the standard search path.
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the session, dispatcher and HTTP gateway.
    Serve,
    /// Query a running instance's health endpoint.
    Status {
        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Print the effective configuration as TOML (secrets redacted).
    Config,
}

fn load_config(path: Option<&PathBuf>) -> WasendConfig {
    let loaded = match path {
        Some(path) => wasend_config::load_and_validate_path(path),
        None => wasend_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            wasend_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Status { json, plain } => status::run_status(&config, json, plain).await,
        Commands::Config => print_config(&config),
    };

    if let Err(e) = result {
        eprintln!("wasend: {e}");
        std::process::exit(1);
    }
}

fn print_config(config: &WasendConfig) -> Result<(), wasend_core::WasendError> {
    let rendered = toml::to_string_pretty(&redacted(config))
        .map_err(|e| wasend_core::WasendError::Internal(format!("failed to render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}

/// Copy of `config` with credentials masked.
fn redacted(config: &WasendConfig) -> WasendConfig {
    const MASK: &str = "[redacted]";
    let mut out = config.clone();
    if out.gateway.bearer_token.is_some() {
        out.gateway.bearer_token = Some(MASK.into());
    }
    if out.bridge.api_key.is_some() {
        out.bridge.api_key = Some(MASK.into());
    }
    if out.webhook.secret.is_some() {
        out.webhook.secret = Some(MASK.into());
    }
    out
}
