//! Database initialization
//!
//! Creates the database on first run, applies the baseline schema, runs
//! pending migrations, and seeds default settings. Safe to call from every
//! service at startup; all steps are idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer, so the scheduler's
    // unlock writes do not block status reads
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Default busy timeout; re-applied below from settings once they exist
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Baseline schema (idempotent - safe to call multiple times)
    create_schema_version_table(&pool).await?;
    create_users_table(&pool).await?;
    create_batches_table(&pool).await?;
    create_batch_users_table(&pool).await?;
    create_content_unlocks_table(&pool).await?;
    create_settings_table(&pool).await?;
    create_module_config_table(&pool).await?;

    // Versioned migrations for schema changes past the baseline
    crate::db::migrations::run_migrations(&pool).await?;

    // Initialize default settings
    init_default_settings(&pool).await?;

    // Apply configurable busy timeout from settings
    let timeout_ms: i64 = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'database_busy_timeout_ms'",
    )
    .fetch_optional(&pool)
    .await?
    .unwrap_or(5000);

    let pragma_sql = format!("PRAGMA busy_timeout = {}", timeout_ms);
    sqlx::query(&pragma_sql).execute(&pool).await?;

    Ok(pool)
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_batches_table(pool: &SqlitePool) -> Result<()> {
    // start_date is stored as RFC3339 text; active batches are the ones the
    // unlock scheduler iterates
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS batches (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            start_date TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_batch_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS batch_users (
            batch_id TEXT NOT NULL REFERENCES batches(guid),
            user_id TEXT NOT NULL REFERENCES users(guid),
            enrolled_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(batch_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_content_unlocks_table(pool: &SqlitePool) -> Result<()> {
    // The UNIQUE constraint is the idempotence key for the unlock write:
    // repeated scheduler runs INSERT OR IGNORE against it
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_unlocks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL REFERENCES batches(guid),
            week INTEGER NOT NULL,
            user_id TEXT NOT NULL REFERENCES users(guid),
            unlocked_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(batch_id, week, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_module_config_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS module_config (
            module_name TEXT PRIMARY KEY,
            host TEXT NOT NULL,
            port INTEGER NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Default settings seeded on first run (INSERT OR IGNORE preserves any
/// value an administrator has already changed)
const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    // Hour of day (UTC) the unlock scheduler runs
    ("unlock_run_hour", "0"),
    // Master switch for the daily unlock run
    ("unlock_scheduler_enabled", "1"),
    ("database_busy_timeout_ms", "5000"),
];

async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for (key, value) in DEFAULT_SETTINGS {
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    }

    Ok(())
}
