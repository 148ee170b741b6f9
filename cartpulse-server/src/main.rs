//! cartpulse server binary.
//!
//! Wires configuration, the event store, and the conversion relay into
//! the axum HTTP surface.

mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use cartpulse_core::{config::Config, logging, ConversionClient, Database};

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let _log_guard =
        logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cartpulse starting");

    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening event store");
    let db = Arc::new(Database::open(&db_path).context("failed to open event store")?);
    db.migrate().context("failed to run store migrations")?;

    let relay = ConversionClient::new(&config.relay)
        .context("failed to build conversion relay client")?;
    if relay.is_none() {
        tracing::info!("Conversion relay not configured; events stay local only");
    }

    let state = AppState::new(db, relay, config.server.admin_token.clone());
    let app = handlers::router(state);

    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
