//! NovaBill server entry point: config, store, engine, router, serve.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use novabill_engine::BillingEngine;
use novabill_server::config::ServerConfig;
use novabill_server::app;
use novabill_store::{SqliteStore, StoreConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("novabill=debug,tower_http=info,info")),
        )
        .init();

    let config = ServerConfig::from_env();
    info!(?config, "starting novabill server");

    let store_config = match &config.database_path {
        Some(path) => StoreConfig::at_path(path),
        None => StoreConfig::in_memory(),
    };
    let store = Arc::new(SqliteStore::open(store_config).await?);
    let engine = Arc::new(BillingEngine::open_with_buffer(store, config.event_buffer).await?);

    let addr = config.socket_addr().map_err(std::io::Error::other)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app(engine))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    info!("shutdown signal received");
}
