use anyhow::Context;
use rentify_bookings::config::AppConfig;
use rentify_bookings::server::{create_router, AppState, InMemoryRepository};
use std::sync::Arc;
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

    info!("🏠 Rentify Bookings");
    info!("===================");

    let config = AppConfig::load().context("Failed to load configuration")?;
    let addr = config.bind_address()?;

    let repository = InMemoryRepository::with_properties(config.properties.clone()).await;
    info!("Seeded {} properties", config.properties.len());

    let clock = config.clock();
    info!("Calendar offset: {}", clock.offset());

    let state = AppState::new(Arc::new(repository), Arc::new(clock));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 Listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
