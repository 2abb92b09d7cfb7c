//! Ember server binary - ephemeral note service entry point.
//!
//! Serves the burn-after-reading note API over HTTP, backed by a shared
//! Redis store. Any number of instances may run against the same store;
//! all coordination (view counting, rate limiting, expiry) happens through
//! atomic store operations, never process-local state. Configuration is
//! loaded from environment variables, TOML files, or CLI arguments.
//!
//! # Usage
//!
//! ```bash
//! # Start with a TOML config
//! ember-server --config /etc/ember/config.toml
//!
//! # Start with CLI args
//! ember-server --http-addr 0.0.0.0:8080 --redis-url redis://cache:6379/
//!
//! # Environment variables
//! export EMBER_REDIS_URL=redis://cache:6379/
//! ember-server
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use ember::config::EmberConfig;
use ember::kv::RedisBackend;
use ember::server;
use ember::state::AppState;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ember-server")]
struct Args {
    /// Path to TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address for the HTTP API.
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Redis connection URL for the shared store.
    #[arg(long)]
    redis_url: Option<String>,

    /// Disable creator-chosen view counts and expirations.
    /// Every note then gets exactly one view and no TTL.
    #[arg(long)]
    disable_advanced: bool,
}

/// Initialize tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

/// Build configuration overrides from CLI arguments.
fn build_cli_overrides(args: &Args) -> EmberConfig {
    let mut overrides = EmberConfig::default();
    if let Some(addr) = args.http_addr {
        overrides.http_addr = addr;
    }
    if let Some(ref url) = args.redis_url {
        overrides.redis_url = url.clone();
    }
    if args.disable_advanced {
        overrides.allow_advanced = false;
    }
    overrides
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let overrides = build_cli_overrides(&args);
    let config = EmberConfig::load(args.config.as_deref(), overrides)
        .context("failed to load configuration")?;

    info!(
        http_addr = %config.http_addr,
        max_views = config.max_views,
        max_expiration_minutes = config.max_expiration_minutes,
        allow_advanced = config.allow_advanced,
        "starting ember v{}",
        env!("CARGO_PKG_VERSION")
    );

    let backend = RedisBackend::connect(&config.redis_url)
        .await
        .context("failed to connect to redis")?;
    info!("connected to redis store");

    let addr = config.http_addr;
    let state = AppState::new(config, Arc::new(backend));

    server::serve(addr, state, shutdown_signal()).await
}

/// Wait for shutdown signal (SIGINT or SIGTERM).
///
/// Handles both signals for graceful shutdown in production (systemd
/// sends SIGTERM) and development (Ctrl-C sends SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(err) => error!("failed to install Ctrl+C handler: {}", err),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => error!("failed to install SIGTERM handler: {}", err),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received SIGINT, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("received SIGTERM, initiating graceful shutdown");
        }
    }
}
