use anyhow::{Context, Result};
use mainram_bridge::config::{validate_config, ConfigLoader};
use mainram_bridge::session::{build_context, run_session};
use mainram_bridge::{logging, HostProcess};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args().nth(1);
    let config = match &path {
        Some(path) => ConfigLoader::new(path).load(),
        None => ConfigLoader::new("config.toml").load_or_default(),
    }
    .with_context(|| format!("failed to load {}", path.as_deref().unwrap_or("config.toml")))?;
    validate_config(&config).context("invalid configuration")?;

    let _log_guard = logging::init(&config.logging)?;
    info!("Starting mainram-bridge v{}", mainram_bridge::VERSION);

    let host = HostProcess::current();
    info!("Attached to {}", host);

    let shutdown = CancellationToken::new();
    let context = build_context(&config, Arc::new(host));
    let session = tokio::spawn(run_session(config, context, shutdown.clone()));

    info!("Press Ctrl+C to shut down");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }

    info!("Shutting down mainram-bridge");
    shutdown.cancel();
    session.await?;
    Ok(())
}
