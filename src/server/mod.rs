//! HTTP server assembly and lifecycle.

use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

mod client_ip;
mod handlers;
mod router;

pub use client_ip::{ClientIp, FORWARDED_IP_HEADER};
pub use handlers::{CreateNoteResult, LiveResult, StatusResult};
pub use router::build_router;

use crate::state::AppState;

/// Serve the HTTP API on `addr` until `shutdown` resolves.
///
/// The listener records peer addresses so handlers can fall back to them
/// for rate-limit identity when no forwarding header is present.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "http listener started");

    axum::serve(
        listener,
        build_router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("http server terminated")
}
