//! Pitlane Server - Chat Backend Daemon
//!
//! A pure Rust HTTP server that:
//! - Serves the chat API on /api/* (streamed model output on /api/chat)
//! - Handles the OAuth sign-in flow and cookie sessions
//! - Persists chats and messages to Postgres
//!
//! Access via: http://localhost:8080

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod router;
mod scheduler;
mod state;

#[cfg(test)]
mod test_helpers;

use pitlane_core::repository::postgres::PostgresChatRepository;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = pitlane_core::config::from_env();
    if config.database_url.is_empty() {
        anyhow::bail!("DATABASE_URL is not set");
    }

    info!("🚀 Pitlane Server starting on port {}...", config.port);

    let repo = PostgresChatRepository::connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    repo.run_migrations()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("📦 Database connected, migrations applied");

    let port = config.port;
    let state = AppState::new(config, Arc::new(repo));
    info!("✅ Application state initialized");

    scheduler::start(state.clone());

    let app = router::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("🌐 Server listening on http://{}", addr);
    info!("🔌 API available at http://localhost:{}/api/", port);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
