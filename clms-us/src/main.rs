//! clms-us (Unlock Scheduler) - Daily content unlock service
//!
//! Iterates active batches once per day, computes each batch's current
//! course week, and unlocks that week's content for every enrolled student.
//! Exposes health, status, and manual-trigger endpoints.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use clms_common::config;
use clms_common::db::init_database;
use clms_common::time::clamp_run_hour;
use clms_us::gateway::SqliteUnlockGateway;
use clms_us::scheduler::UnlockScheduler;
use clms_us::{build_router, AppState, DEFAULT_HOST, DEFAULT_PORT};

/// CLMS content unlock scheduler service
#[derive(Parser, Debug)]
#[command(name = "clms-us", version)]
struct Args {
    /// Root folder holding the shared database (overrides CLMS_ROOT and the
    /// config file)
    #[arg(long)]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init, before any
    // database delays
    info!(
        "Starting CLMS Unlock Scheduler (clms-us) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    // Zero-config startup: CLI arg -> env var -> config file -> OS default
    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), "CLMS_ROOT");
    config::ensure_root_folder(&root_folder)?;

    let db_path = config::database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;

    // Listen address from module_config, with compiled defaults as fallback
    let (host, port) = match config::load_module_config(&pool, "clms-us").await {
        Ok(module) => {
            if !module.enabled {
                warn!("clms-us is disabled in module_config, starting anyway");
            }
            (module.host, module.port)
        }
        Err(_) => {
            info!(
                "No module_config entry for clms-us, using {}:{}",
                DEFAULT_HOST, DEFAULT_PORT
            );
            (DEFAULT_HOST.to_string(), DEFAULT_PORT)
        }
    };

    // Scheduler configuration from settings
    let run_hour = clamp_run_hour(config::load_setting_i64(&pool, "unlock_run_hour", 0).await?);
    let enabled = config::load_setting_i64(&pool, "unlock_scheduler_enabled", 1).await? != 0;

    let gateway = SqliteUnlockGateway::new(pool.clone());
    let scheduler = Arc::new(UnlockScheduler::new(gateway, run_hour, enabled));

    // The handle keeps the shutdown channel alive for the process lifetime
    let _scheduler_handle = if enabled {
        Some(scheduler.start())
    } else {
        warn!("Unlock scheduler disabled via settings (manual trigger still available)");
        None
    };

    // Create application state and router
    let state = AppState::new(pool, scheduler);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("clms-us listening on http://{}:{}", host, port);
    info!("Health check: http://{}:{}/health", host, port);

    axum::serve(listener, app).await?;

    Ok(())
}
