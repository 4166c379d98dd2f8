//! Cron scheduler for the periodic attendance sweeps.

use std::sync::Arc;

use tokio_cron_scheduler::{Job as CronJob, JobScheduler};

use halqa_core::config::WorkerConfig;
use halqa_core::error::AppError;
use halqa_entity::job::{JobPayload, JobPriority};

use crate::queue::{ATTENDANCE_QUEUE, JobCreateParams, JobQueue};

/// Cron-based scheduler that enqueues the sweep jobs
pub struct CronScheduler {
    /// The underlying job scheduler
    scheduler: JobScheduler,
    /// Job queue for enqueuing scheduled work
    queue: Arc<JobQueue>,
    /// Cron expressions for each sweep
    config: WorkerConfig,
}

impl std::fmt::Debug for CronScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronScheduler").finish()
    }
}

impl CronScheduler {
    /// Create a new cron scheduler
    pub async fn new(queue: Arc<JobQueue>, config: WorkerConfig) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::internal(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            queue,
            config,
        })
    }

    /// Register all scheduled tasks
    pub async fn register_default_tasks(&self) -> Result<(), AppError> {
        self.register_reconciliation().await?;
        self.register_attendance_calculation().await?;
        self.register_earnings_sweep().await?;
        self.register_queue_maintenance().await?;

        tracing::info!("All scheduled tasks registered");
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<(), AppError> {
        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::internal(format!("Failed to start scheduler: {}", e)))?;

        tracing::info!("Cron scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    pub async fn shutdown(&mut self) -> Result<(), AppError> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::internal(format!("Failed to shutdown scheduler: {}", e)))?;

        tracing::info!("Cron scheduler shut down");
        Ok(())
    }

    /// Orphaned join reconciliation
    async fn register_reconciliation(&self) -> Result<(), AppError> {
        let schedule = self.config.reconcile_schedule.clone();
        self.register_sweep(&JobPayload::ReconcileOrphanedEvents, &schedule)
            .await
    }

    /// Attendance calculation
    async fn register_attendance_calculation(&self) -> Result<(), AppError> {
        let schedule = self.config.attendance_schedule.clone();
        self.register_sweep(&JobPayload::CalculateSessionAttendance, &schedule)
            .await
    }

    /// Earnings catch-up for sessions completed after their attendance was final
    async fn register_earnings_sweep(&self) -> Result<(), AppError> {
        let schedule = self.config.earnings_schedule.clone();
        self.register_sweep(&JobPayload::SweepSessionEarnings, &schedule)
            .await
    }

    /// Lease recovery and finished-job purge
    async fn register_queue_maintenance(&self) -> Result<(), AppError> {
        let schedule = self.config.maintenance_schedule.clone();
        self.register_sweep(&JobPayload::MaintainJobQueue, &schedule)
            .await
    }

    /// Enqueue a single-attempt sweep job on every tick of `schedule`.
    /// A sweep that fails is simply run again on the next tick.
    async fn register_sweep(&self, payload: &JobPayload, schedule: &str) -> Result<(), AppError> {
        let job_type = payload.job_type();
        let params = JobCreateParams::from_payload(payload, ATTENDANCE_QUEUE, JobPriority::Normal, 1)?;
        let queue = Arc::clone(&self.queue);

        let job = CronJob::new_async(schedule, move |_uuid, _lock| {
            let queue = Arc::clone(&queue);
            let params = params.clone();
            Box::pin(async move {
                tracing::debug!("Scheduling {} job", job_type);
                if let Err(e) = queue.enqueue(params).await {
                    tracing::error!("Failed to enqueue {}: {}", job_type, e);
                }
            })
        })
        .map_err(|e| {
            AppError::internal(format!("Failed to create {} schedule: {}", job_type, e))
        })?;

        self.scheduler.add(job).await.map_err(|e| {
            AppError::internal(format!("Failed to add {} schedule: {}", job_type, e))
        })?;

        tracing::info!("Registered: {} ({})", job_type, schedule);
        Ok(())
    }
}
