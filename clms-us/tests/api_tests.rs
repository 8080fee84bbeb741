//! Integration tests for clms-us API endpoints
//!
//! Covers the health endpoint, scheduler status snapshot, and the manual
//! trigger including its report payload.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

use clms_common::db::init_database;
use clms_us::gateway::SqliteUnlockGateway;
use clms_us::scheduler::UnlockScheduler;
use clms_us::{build_router, AppState};

/// Test helper: fresh database + router (scheduler loop not started)
async fn setup_app_with_enabled(enabled: bool) -> (TempDir, SqlitePool, axum::Router) {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("clms.db")).await.unwrap();

    let gateway = SqliteUnlockGateway::new(pool.clone());
    let scheduler = Arc::new(UnlockScheduler::new(gateway, 0, enabled));
    let state = AppState::new(pool.clone(), scheduler);

    (dir, pool, build_router(state))
}

async fn setup_app() -> (TempDir, SqlitePool, axum::Router) {
    setup_app_with_enabled(true).await
}

/// Test helper: Create request with empty body
fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, _pool, app) = setup_app().await;

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "clms-us");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_status_before_any_run() {
    let (_dir, _pool, app) = setup_app().await;

    let response = app.oneshot(test_request("GET", "/api/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["enabled"], true);
    assert_eq!(body["run_hour"], 0);
    assert_eq!(body["runs_completed"], 0);
    assert!(body["last_run"].is_null());
    assert!(body["last_error"].is_null());
}

#[tokio::test]
async fn test_disabled_scheduler_still_serves_status_and_trigger() {
    // With the daily loop disabled, the service stays up: status reports
    // the disabled state and the manual trigger keeps working
    let (_dir, _pool, app) = setup_app_with_enabled(false).await;

    let response = app
        .clone()
        .oneshot(test_request("GET", "/api/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["enabled"], false);
    assert!(body["next_run"].is_null(), "no loop, nothing scheduled");
    assert_eq!(body["runs_completed"], 0);

    let response = app.oneshot(test_request("POST", "/api/run")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["batches_processed"], 0);
}

#[tokio::test]
async fn test_manual_trigger_on_empty_database() {
    let (_dir, _pool, app) = setup_app().await;

    let response = app.oneshot(test_request("POST", "/api/run")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["batches_processed"], 0);
    assert_eq!(body["unlocks_written"], 0);
    assert!(body["failures"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_manual_trigger_reports_unlocks() {
    let (_dir, pool, app) = setup_app().await;

    // One batch three days in, two enrolled students
    let batch_id = Uuid::new_v4();
    sqlx::query("INSERT INTO batches (guid, name, start_date, active) VALUES (?, 'Rust Basics', ?, 1)")
        .bind(batch_id.to_string())
        .bind((Utc::now() - Duration::days(3)).to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();
    for name in ["alice", "bob"] {
        let user_id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (guid, username) VALUES (?, ?)")
            .bind(user_id.to_string())
            .bind(name)
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO batch_users (batch_id, user_id) VALUES (?, ?)")
            .bind(batch_id.to_string())
            .bind(user_id.to_string())
            .execute(&pool)
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(test_request("POST", "/api/run"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["batches_processed"], 1);
    assert_eq!(body["unlocks_written"], 2);

    // Status now reflects the completed run
    let response = app.oneshot(test_request("GET", "/api/status")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["runs_completed"], 1);
    assert_eq!(body["last_run"]["unlocks_written"], 2);
}
