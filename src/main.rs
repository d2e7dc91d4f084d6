//! StallHub Server - stall allocation core
//!
//! Connects to PostgreSQL, applies migrations, and keeps the expired-lock
//! reaper running until shutdown. Allocation itself is driven by the
//! services that embed `stallhub-booking` against the same database.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use stallhub_core::config::AppConfig;
use stallhub_core::error::AppError;
use stallhub_database::{BookingStore, DatabasePool};
use stallhub_worker::{CronScheduler, LockReaper};

#[tokio::main]
async fn main() {
    let env = std::env::var("STALLHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting StallHub v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db_pool = DatabasePool::connect(&config.database).await?;
    if !db_pool.health_check().await? {
        return Err(AppError::service_unavailable("Database health check failed"));
    }
    stallhub_database::migration::run_migrations(db_pool.pool()).await?;

    // ── Step 2: Booking store ────────────────────────────────────
    let store: Arc<dyn BookingStore> = Arc::new(db_pool.booking_store(&config.database));
    let transactional = store.supports_transactions().await.unwrap_or(false);
    tracing::info!(
        transactional,
        lock_ttl_seconds = config.booking.lock_ttl_seconds,
        "Booking store ready"
    );

    // ── Step 3: Reclaim locks abandoned while we were down ───────
    let reaper = Arc::new(LockReaper::new(Arc::clone(&store)));
    match reaper.sweep().await {
        Ok(released) => tracing::info!(released, "Startup lock sweep complete"),
        Err(e) => tracing::warn!(error = %e, "Startup lock sweep failed"),
    }

    // ── Step 4: Scheduled reaper ─────────────────────────────────
    let mut scheduler = CronScheduler::new(Arc::clone(&reaper)).await?;
    scheduler.register_default_tasks(&config.reaper).await?;
    scheduler.start().await?;

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "Scheduler shutdown failed");
    }
    db_pool.close().await;

    tracing::info!("StallHub shut down");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
