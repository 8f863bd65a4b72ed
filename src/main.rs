/// memberd - directory group membership service
///
/// Answers "who is in this group" and "which groups is this user in" from an
/// LDAP directory, with a Redis cache in front and bulk cache refresh.

mod api;
mod auth;
mod cache;
mod config;
mod context;
mod directory;
mod error;
mod lookup;
mod metrics;
mod refresh;
mod server;

use anyhow::Context;
use config::{LogFormat, ServerConfig};
use context::AppContext;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::from_env().context("loading configuration")?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.as_str().into());
    match config.logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    tracing::info!("memberd v{} starting", env!("CARGO_PKG_VERSION"));

    // Create application context
    let ctx = AppContext::new(config)
        .await
        .context("initializing directory and cache")?;

    // Start server
    server::serve(ctx).await.context("serving HTTP")?;

    Ok(())
}
