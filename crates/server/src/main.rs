//! Authoritative RTS game server.

use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("RTS Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = server::Config::load()?;
    info!("Loaded configuration");
    info!("  Bind: {}:{}", config.server.bind, config.server.port);
    info!("  Tick rate: {}/s", config.server.tick_rate);

    // Start the game server
    server::run(config).await?;

    Ok(())
}
