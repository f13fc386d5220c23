//! Rolegate Server - Main Entry Point

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use rolegate_server::{
    api, authority::AuthorizationEngine, authority::PgAuthorityStore, config, db,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rolegate_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Rolegate Server"
    );

    let tree = config.load_authority_tree()?;
    info!(authorities = tree.len(), "Authority dependency tree loaded");

    // Initialize database
    let db_pool = db::create_pool(&config).await?;
    db::run_migrations(&db_pool).await?;

    let engine = AuthorizationEngine::new(Arc::new(PgAuthorityStore::new(db_pool)), tree);

    // Build application state
    let state = api::AppState::new(engine, config.clone());

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
