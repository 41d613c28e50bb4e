mod backend;
mod classify;
mod commands;
mod config;
mod dispatch;
mod error;
mod platform;
mod render;
mod sanitize;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,predbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Backend: {:?}", config.backend);
    info!("  Workers: {}", config.dispatch.workers);
    info!(
        "  Updates: {}",
        if config.telegram.webhook.is_some() {
            "webhook"
        } else {
            "long polling"
        }
    );

    let backend = backend::from_config(&config.backend)?;

    // Run the Telegram bot
    info!("Bot is starting...");
    platform::telegram::run(&config, backend).await?;

    Ok(())
}
