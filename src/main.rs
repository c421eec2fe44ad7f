//! Average bot - weighted grade average conversations
//!
//! A Rust backend implementing a per-user conversation state machine that
//! collects university grades, computes weighted averages, and keeps a small
//! per-user profile in sqlite.

mod api;
mod config;
mod db;
mod grades;
mod runtime;
mod state_machine;

use api::{create_router, AppState};
use config::AppConfig;
use db::Database;
use runtime::{OutboxChannel, RuntimeManager, SessionRegistry};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Buffered deliveries per outbox subscriber
const OUTBOX_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "average_bot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path, "Opening database");
    let db = Database::open(&config.db_path)?;

    if config.admin_ids.is_empty() {
        tracing::warn!("No admins configured. Set AVERAGE_BOT_ADMIN_IDS to enable /broadcast and /single.");
    } else {
        tracing::info!(admins = ?config.admin_ids, "Admin commands enabled");
    }

    let outbox = OutboxChannel::new(OUTBOX_CAPACITY);
    let registry = Arc::new(SessionRegistry::new());
    let runtime = Arc::new(RuntimeManager::from_config(
        db,
        outbox.clone(),
        registry,
        &config,
    ));
    let state = AppState::new(runtime, outbox);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Average bot server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
