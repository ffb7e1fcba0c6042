use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fibonatix_queue::infrastructure::config::AppConfig;
use fibonatix_queue::infrastructure::startup::configure_services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fibonatix_queue=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FibonatixQueue");

    let config = AppConfig::load().inspect_err(|e| tracing::error!("{}", e))?;
    tracing::info!("Configuration loaded (environment: {})", config.environment());

    let registry = configure_services(&config)
        .map(Arc::new)
        .inspect_err(|e| tracing::error!("Startup aborted: {}", e))?;
    tracing::info!("Services configured");

    // Check the backend without holding up startup
    let health_task = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            match registry.health_check().await {
                Ok(true) => tracing::info!("Queue backend reachable"),
                Ok(false) => tracing::warn!("Queue backend not reachable yet"),
                Err(e) => tracing::warn!("Health check skipped: {}", e),
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    health_task.abort();
    registry.shutdown().await;

    Ok(())
}
