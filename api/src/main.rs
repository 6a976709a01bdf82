//! Marketstream API Server binary.
//!
//! Entry point for the WebSocket fan-out server.

use marketstream_api::{Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marketstream_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env()?;
    if config.tokens.is_empty() {
        tracing::warn!("API_TOKENS is empty; every WebSocket upgrade will be rejected");
    }

    tracing::info!("Starting Marketstream API server on {}", config.addr());

    let server = Server::from_config(config);
    server.run().await?;

    Ok(())
}
