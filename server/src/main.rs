//! FRC Stats Server - merge server for scouting event data.
//!
//! This server hosts merge sessions: a scouting device uploads an event
//! snapshot, the server reconciles it against the records it holds, the
//! operator resolves conflicts and the merged result is written back in two
//! batches using the frcstats-engine merge logic.

mod config;
mod db;
mod error;
mod handlers;
mod routes;
mod session;

use crate::config::Config;
use crate::db::PgRecordStore;
use crate::session::SessionManager;
use axum::Router;
use frcstats_engine::{GameRegistry, RecordStore};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<GameRegistry>,
    pub store: Arc<dyn RecordStore>,
    pub sessions: Arc<SessionManager>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "frcstats_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting FRC Stats Server on {}:{}", config.host, config.port);

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.max_connections).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // Build application state
    let registry = GameRegistry::standard();
    for game in registry.games() {
        tracing::info!(game = %game.game_code, name = %game.name, "Registered game");
    }
    let state = AppState {
        registry: Arc::new(registry),
        store: Arc::new(PgRecordStore::new(pool)),
        sessions: SessionManager::new_shared(config.session_ttl),
    };

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
