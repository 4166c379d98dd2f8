//! Job queue abstraction for enqueuing and dequeuing background jobs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use halqa_core::error::AppError;
use halqa_database::store::JobStore;
use halqa_entity::job::{CreateJob, ExpiredJobs, Job, JobPayload, JobPriority, JobStatus};

/// Queue for the periodic sweeps and recording retries.
pub const ATTENDANCE_QUEUE: &str = "attendance";

/// Queue for earnings calculations.
pub const EARNINGS_QUEUE: &str = "earnings";

/// Parameters for creating a new job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreateParams {
    /// Type of job (e.g., "calculate_session_earnings")
    pub job_type: String,
    /// Queue name (e.g., "attendance", "earnings")
    pub queue: String,
    /// Priority level
    pub priority: JobPriority,
    /// Job payload as JSON
    pub payload: serde_json::Value,
    /// Maximum attempts, including the first one
    pub max_attempts: i32,
    /// Optional scheduled time (run after this time)
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl JobCreateParams {
    /// Build parameters from a typed payload. The job type is taken from the payload.
    pub fn from_payload(
        payload: &JobPayload,
        queue: &str,
        priority: JobPriority,
        max_attempts: i32,
    ) -> Result<Self, AppError> {
        Ok(Self {
            job_type: payload.job_type().to_string(),
            queue: queue.to_string(),
            priority,
            payload: serde_json::to_value(payload)?,
            max_attempts,
            scheduled_at: None,
        })
    }
}

/// Job queue for enqueuing and dequeuing work
#[derive(Debug, Clone)]
pub struct JobQueue {
    /// Job store for persistence
    store: Arc<dyn JobStore>,
    /// Worker identifier for claiming jobs
    worker_id: String,
}

impl JobQueue {
    /// Create a new job queue
    pub fn new(store: Arc<dyn JobStore>, worker_id: String) -> Self {
        Self { store, worker_id }
    }

    /// Enqueue a new job
    pub async fn enqueue(&self, params: JobCreateParams) -> Result<Job, AppError> {
        self.enqueue_at(params, Utc::now()).await
    }

    /// Enqueue a new job, stamping it with `now`
    pub async fn enqueue_at(
        &self,
        params: JobCreateParams,
        now: DateTime<Utc>,
    ) -> Result<Job, AppError> {
        let data = CreateJob {
            job_type: params.job_type,
            queue: params.queue,
            priority: params.priority,
            payload: params.payload,
            max_attempts: params.max_attempts.max(1),
            scheduled_at: params.scheduled_at,
        };

        let job = self
            .store
            .create(&data, now)
            .await
            .map_err(|e| AppError::internal(format!("Failed to enqueue job: {}", e)))?;

        tracing::debug!(
            "Enqueued job: id={}, type='{}', queue='{}', priority={}",
            job.id,
            job.job_type,
            job.queue,
            job.priority
        );

        Ok(job)
    }

    /// Dequeue the next due job from the given queues, in order
    pub async fn dequeue(
        &self,
        queues: &[&str],
        now: DateTime<Utc>,
    ) -> Result<Option<Job>, AppError> {
        for queue in queues {
            let job = self
                .store
                .claim_next(queue, &self.worker_id, now)
                .await
                .map_err(|e| AppError::internal(format!("Failed to dequeue job: {}", e)))?;

            if let Some(job) = job {
                tracing::debug!(
                    "Dequeued job: id={}, type='{}', queue='{}'",
                    job.id,
                    job.job_type,
                    job.queue
                );
                return Ok(Some(job));
            }
        }

        Ok(None)
    }

    /// Mark a job as completed successfully
    pub async fn complete(
        &self,
        job_id: Uuid,
        result: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.store
            .complete(job_id, result.as_ref(), now)
            .await
            .map_err(|e| AppError::internal(format!("Failed to complete job: {}", e)))?;

        tracing::debug!("Job completed: id={}", job_id);
        Ok(())
    }

    /// Mark a job as failed for good
    pub async fn fail(&self, job_id: Uuid, error: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        self.store
            .fail(job_id, error, now)
            .await
            .map_err(|e| AppError::internal(format!("Failed to mark job as failed: {}", e)))?;

        tracing::debug!("Job failed: id={}, error='{}'", job_id, error);
        Ok(())
    }

    /// Put a job back on the queue, not claimable before `run_at`
    pub async fn reschedule(
        &self,
        job_id: Uuid,
        error: &str,
        run_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.store
            .reschedule(job_id, error, run_at, now)
            .await
            .map_err(|e| AppError::internal(format!("Failed to reschedule job: {}", e)))?;

        tracing::debug!("Job rescheduled: id={}, run_at={}", job_id, run_at);
        Ok(())
    }

    /// Recover jobs still running after `lease`, presumed lost with their worker
    pub async fn requeue_expired(
        &self,
        lease: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<ExpiredJobs, AppError> {
        let recovered = self
            .store
            .requeue_expired(now - lease, now)
            .await
            .map_err(|e| AppError::internal(format!("Failed to requeue expired jobs: {}", e)))?;

        if recovered.requeued > 0 || recovered.failed > 0 {
            tracing::warn!(
                "Recovered expired jobs: requeued={}, failed={}",
                recovered.requeued,
                recovered.failed
            );
        }
        Ok(recovered)
    }

    /// Delete completed and failed jobs last touched before `before`
    pub async fn purge_finished(&self, before: DateTime<Utc>) -> Result<u64, AppError> {
        let purged = self
            .store
            .purge_finished(before)
            .await
            .map_err(|e| AppError::internal(format!("Failed to purge finished jobs: {}", e)))?;

        tracing::debug!("Purged {} finished jobs", purged);
        Ok(purged)
    }

    /// Get queue statistics
    pub async fn stats(&self) -> Result<QueueStats, AppError> {
        let pending = self
            .store
            .count_by_status(JobStatus::Pending)
            .await
            .map_err(|e| AppError::internal(format!("Failed to count pending jobs: {}", e)))?;

        let running = self
            .store
            .count_by_status(JobStatus::Running)
            .await
            .map_err(|e| AppError::internal(format!("Failed to count running jobs: {}", e)))?;

        let failed = self
            .store
            .count_by_status(JobStatus::Failed)
            .await
            .map_err(|e| AppError::internal(format!("Failed to count failed jobs: {}", e)))?;

        Ok(QueueStats {
            pending,
            running,
            failed,
            worker_id: self.worker_id.clone(),
        })
    }
}

/// Queue statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    /// Number of pending jobs
    pub pending: i64,
    /// Number of running jobs
    pub running: i64,
    /// Number of failed jobs
    pub failed: i64,
    /// Current worker identifier
    pub worker_id: String,
}
