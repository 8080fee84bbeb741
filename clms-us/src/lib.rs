//! clms-us library - Unlock Scheduler module
//!
//! Daily content unlock scheduler for CLMS batches, with a small
//! operational HTTP surface (health, status, manual trigger).

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod gateway;
pub mod scheduler;

use gateway::SqliteUnlockGateway;
use scheduler::UnlockScheduler;

/// Default listen address when module_config has no row for this service
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5810;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared database connection pool
    pub db: SqlitePool,
    /// The unlock scheduler (also driven by the background loop)
    pub scheduler: Arc<UnlockScheduler<SqliteUnlockGateway>>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, scheduler: Arc<UnlockScheduler<SqliteUnlockGateway>>) -> Self {
        Self { db, scheduler }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/status", get(api::get_status))
        .route("/api/run", post(api::trigger_run))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
