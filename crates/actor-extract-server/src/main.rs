//! API server binary entry point
//!
//! Usage: `actor-extract-server [CONFIG.toml]`. Without an argument the
//! path in `ACTOR_EXTRACT_CONFIG` is used, if set.

use std::path::PathBuf;

use actor_extract_core::ActorExtractor;
use actor_extract_server::{config::load_config, start_server, ApiState};
use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CONFIG_ENV: &str = "ACTOR_EXTRACT_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os(CONFIG_ENV))
        .map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;

    // RUST_LOG wins over the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.server.log_level)
            .with_context(|| format!("Invalid log level: {}", config.server.log_level))?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let extractor =
        ActorExtractor::new(config.processor).context("Failed to start actor extractor")?;

    tracing::info!("Starting actor extraction API server");
    start_server(config.server.bind_addr.as_str(), ApiState::new(extractor))
        .await
        .context("API server failed")?;

    Ok(())
}
