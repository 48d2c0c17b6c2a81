//! Retention Hub - Main Application Entry Point
//!
//! Configures data-retention policies for database sources feeding an
//! archival pipeline and serves the resolution/export API.

use retention_hub_api::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,retention_hub=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid u16");

    tracing::info!("Starting Retention Hub server on {}:{}", host, port);

    // Create shared application state backed by the in-memory store
    let app_state = Arc::new(AppState::new());

    // Optionally preload the demo dataset
    if std::env::var("RETENTION_SEED").is_ok_and(|v| v == "1") {
        retention_hub_api::seed::seed_demo(&app_state.store).await?;
    }

    // Build our application with routes
    let app = retention_hub_api::create_router(app_state);

    // Run it
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
