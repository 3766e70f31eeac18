//! gitnaughty - a small blog server

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gitnaughty::{
    api::{self, AppState},
    config::{Config, DEFAULT_SESSION_SECRET},
    db,
    services::UserService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gitnaughty=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting gitnaughty...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");
    if config.session.secret == DEFAULT_SESSION_SECRET {
        tracing::warn!("Using the default session secret; set GITNAUGHTY_SESSION_SECRET");
    }

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let sweep_interval = config.session.sweep_interval_seconds;

    let state = AppState::new(pool.clone(), config)?;

    // Expired sessions are also rejected on lookup; this only reclaims rows
    spawn_session_sweeper(state.user_service.clone(), sweep_interval);

    let app = api::build_router(state)?;

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

/// Delete expired sessions every `interval_seconds`
fn spawn_session_sweeper(user_service: Arc<UserService>, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds.max(1)));
        loop {
            interval.tick().await;
            match user_service.cleanup_expired_sessions().await {
                Ok(0) => {}
                Ok(count) => tracing::debug!("Swept {} expired sessions", count),
                Err(e) => tracing::warn!("Session sweep failed: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}
