//! Cron scheduler for the lock reaper.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use stallhub_core::config::ReaperConfig;
use stallhub_core::error::AppError;

use crate::jobs::LockReaper;

/// Cron-based scheduler for periodic background tasks
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Expired-lock reaper run on every tick
    reaper: Arc<LockReaper>,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(reaper: Arc<LockReaper>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {e}")))?;

        Ok(Self { scheduler, reaper })
    }

    /// Register the configured tasks. Returns how many were registered.
    pub async fn register_default_tasks(&self, config: &ReaperConfig) -> Result<usize, AppError> {
        if !config.enabled {
            tracing::info!("Lock reaper disabled by configuration");
            return Ok(0);
        }

        self.register_lock_reaper(&config.schedule).await?;
        tracing::info!("All scheduled tasks registered");
        Ok(1)
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {e}")))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {e}")))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Lock reaper on `schedule` (six-field cron, seconds first)
    async fn register_lock_reaper(&self, schedule: &str) -> Result<(), AppError> {
        let reaper = Arc::clone(&self.reaper);
        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let reaper = Arc::clone(&reaper);
            Box::pin(async move {
                tracing::trace!("Running lock reaper");
                if let Err(e) = reaper.sweep().await {
                    tracing::error!(error = %e, "Lock reaper sweep failed");
                }
            })
        })
        .map_err(|e| {
            AppError::configuration(format!("Invalid lock reaper schedule '{schedule}': {e}"))
        })?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::internal(format!("Failed to add lock_reaper schedule: {e}")))?;

        tracing::info!(schedule = %schedule, "Registered: lock_reaper");
        Ok(())
    }
}
