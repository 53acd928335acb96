//! Gateway binary.
//!
//! Usage: `searchgate [CONFIG_PATH]`. Without an argument the default config
//! path is used; a missing file means built-in defaults.
//!
//! All tracing output goes to stderr.

use std::path::PathBuf;

use searchgate::server::{AppState, serve};
use searchgate::GatewayConfig;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(GatewayConfig::default_config_path);
    let config = GatewayConfig::load_or_default(&config_path)
        .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", config_path.display()))?;

    // RUST_LOG wins over the configured filter.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.filter)),
        )
        .init();

    tracing::info!(config = %config_path.display(), "searchgate starting");

    let cancel = CancellationToken::new();
    let state = AppState::from_config(&config, cancel.clone())
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("searchgate listening on http://{}", listener.local_addr()?);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("shutdown requested");
                cancel.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "cannot listen for ctrl-c"),
        }
    });

    serve(listener, state).await.map_err(|e| {
        tracing::error!(error = %e, "searchgate exited with error");
        anyhow::anyhow!("searchgate failed: {e}")
    })?;

    tracing::info!("searchgate shut down cleanly");
    Ok(())
}
