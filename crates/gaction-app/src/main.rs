//! Bridge binary - composition root.
//!
//! 1. Start tracing, then load configuration from TOML
//! 2. Build the Recast dialog client
//! 3. Populate the connector registry from the `[[connectors]]` table
//! 4. Start the axum webhook server

mod cli;

use std::sync::Arc;

use clap::Parser;

use gaction_api::{create_router, AppState, ConnectorRegistry, FileConnectorStore};
use gaction_bridge::RecastClient;
use gaction_core::BridgeConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{reload, EnvFilter};

use crate::cli::CliArgs;

const DEFAULT_LOG_LEVEL: &str = "info";

/// Filter used until the config is loaded, and whether it is final.
fn startup_filter(from_env: Option<EnvFilter>, cli_level: Option<&str>) -> (EnvFilter, bool) {
    match (from_env, cli_level) {
        (Some(filter), _) => (filter, true),
        (None, Some(level)) => (EnvFilter::new(level), true),
        (None, None) => (EnvFilter::new(DEFAULT_LOG_LEVEL), false),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing starts before the config is read. The configured level replaces
    // the startup filter unless RUST_LOG or --log-level set one.
    let (filter, pinned) = startup_filter(
        EnvFilter::try_from_default_env().ok(),
        args.log_level.as_deref(),
    );
    let (filter, filter_handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting recast-gaction v{}", env!("CARGO_PKG_VERSION"));

    let config_file = args.resolve_config_path();
    let config = BridgeConfig::load_or_default(&config_file);

    if !pinned {
        let level = args.resolve_log_level(&config.logging.level);
        if let Err(e) = filter_handle.reload(EnvFilter::new(&level)) {
            tracing::warn!(level = %level, error = %e, "Failed to apply configured log level");
        }
    }

    // Backend.
    let backend = Arc::new(RecastClient::new(&config.backend)?);
    tracing::info!(base_url = %config.backend.base_url, "Recast client ready");

    // Connectors are re-read from the same file on reload.
    let store = Arc::new(FileConnectorStore::new(config_file.clone()));
    let registry = ConnectorRegistry::new(store, backend);
    match registry.reload().await {
        Ok(count) => tracing::info!(connectors = count, "Connectors loaded"),
        Err(e) => tracing::warn!(error = %e, "No connectors loaded at startup"),
    }

    let state = AppState::new(registry, config.server.body_limit_bytes);
    let router = create_router(state);

    // === Webhook server ===
    let host = args.resolve_host(&config.server.host);
    let port = args.resolve_port(config.server.port);
    let addr = format!("{}:{}", host, port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind, is another instance running?");
            return Err(e.into());
        }
    };

    tracing::info!(addr = %addr, "Webhook server listening");
    axum::serve(listener, router).await?;

    Ok(())
}
