//! Scheduler status and manual trigger endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::scheduler::SchedulerStatus;
use crate::AppState;

/// GET /api/status
///
/// Snapshot of the scheduler: configured run hour, next scheduled run,
/// completed run count, and the last run's report.
pub async fn get_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status().await)
}

/// POST /api/run
///
/// Manually trigger an unlock pass. Returns the run report, 409 when a run
/// is already in flight, or 500 when the batch list cannot be fetched.
pub async fn trigger_run(State(state): State<AppState>) -> Response {
    match state.scheduler.try_run().await {
        None => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "Unlock run already in progress" })),
        )
            .into_response(),
        Some(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
        Some(Ok(report)) => Json(report).into_response(),
    }
}
