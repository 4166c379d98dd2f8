//! Worker runner: main loop that polls for jobs and executes them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Semaphore, watch};
use tokio::time;

use halqa_core::config::WorkerConfig;
use halqa_core::error::AppError;
use halqa_entity::job::Job;

use crate::executor::{JobExecutionError, JobExecutor};
use crate::queue::{ATTENDANCE_QUEUE, EARNINGS_QUEUE, JobQueue};

/// Main worker runner that polls queues and executes jobs
#[derive(Debug)]
pub struct WorkerRunner {
    /// Job queue for polling
    queue: Arc<JobQueue>,
    /// Job executor for dispatching
    executor: Arc<JobExecutor>,
    /// Worker configuration
    config: WorkerConfig,
    /// Worker identifier
    worker_id: String,
    /// Queues to poll (in priority order)
    queues: Vec<String>,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(
        queue: Arc<JobQueue>,
        executor: Arc<JobExecutor>,
        config: WorkerConfig,
        worker_id: String,
    ) -> Self {
        Self {
            queue,
            executor,
            config,
            worker_id,
            queues: vec![ATTENDANCE_QUEUE.to_string(), EARNINGS_QUEUE.to_string()],
        }
    }

    /// Start the worker runner; runs until the cancel signal is received
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            "Worker '{}' started with concurrency={}, poll_interval={}s, queues={:?}",
            self.worker_id,
            self.config.concurrency,
            self.config.poll_interval_seconds,
            self.queues
        );

        let concurrency = self.config.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        tracing::info!("Worker '{}' received shutdown signal", self.worker_id);
                        break;
                    }
                }
                _ = self.poll_and_execute(&semaphore) => {
                    tokio::select! {
                        _ = cancel.changed() => {
                            if *cancel.borrow() {
                                tracing::info!("Worker '{}' shutting down", self.worker_id);
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        tracing::info!(
            "Worker '{}' waiting for in-flight jobs to complete...",
            self.worker_id
        );

        let _ = time::timeout(
            Duration::from_secs(30),
            semaphore.acquire_many(concurrency as u32),
        )
        .await;

        tracing::info!("Worker '{}' shut down complete", self.worker_id);
    }

    /// Claim and fully process at most one job due at `now`.
    ///
    /// Returns the claimed job, or `None` when nothing was due.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<Option<Job>, AppError> {
        let queue_refs: Vec<&str> = self.queues.iter().map(|s| s.as_str()).collect();
        let Some(job) = self.queue.dequeue(&queue_refs, now).await? else {
            return Ok(None);
        };

        process(&self.queue, &self.executor, &job, now, self.backoff()).await;
        Ok(Some(job))
    }

    fn backoff(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.config.retry_backoff_seconds as i64)
    }

    /// Poll for a job and execute it if available
    async fn poll_and_execute(&self, semaphore: &Arc<Semaphore>) {
        let permit = match semaphore.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(_) => {
                tracing::trace!("All worker slots occupied, waiting...");
                return;
            }
        };

        let queue_refs: Vec<&str> = self.queues.iter().map(|s| s.as_str()).collect();
        let now = Utc::now();

        match self.queue.dequeue(&queue_refs, now).await {
            Ok(Some(job)) => {
                let queue = Arc::clone(&self.queue);
                let executor = Arc::clone(&self.executor);
                let backoff = self.backoff();

                tokio::spawn(async move {
                    let _permit = permit;
                    process(&queue, &executor, &job, now, backoff).await;
                });
            }
            Ok(None) => {
                drop(permit);
                tracing::trace!("No jobs available in queues");
            }
            Err(e) => {
                drop(permit);
                tracing::error!("Failed to dequeue job: {}", e);
            }
        }
    }
}

/// Execute a claimed job and settle its outcome.
///
/// Transient failures go back on the queue after `backoff` while attempts
/// remain; anything else that fails is marked failed and the handler's
/// terminal failure hook runs.
async fn process(
    queue: &JobQueue,
    executor: &JobExecutor,
    job: &Job,
    now: DateTime<Utc>,
    backoff: chrono::Duration,
) {
    let job_id = job.id;

    let error = match executor.execute(job, now).await {
        Ok(result) => {
            if let Err(e) = queue.complete(job_id, result, now).await {
                tracing::error!("Failed to mark job {} as completed: {}", job_id, e);
            }
            tracing::info!("Job {} completed successfully", job_id);
            return;
        }
        Err(JobExecutionError::Transient(msg)) if job.has_attempts_left() => {
            tracing::warn!(
                "Job {} failed (transient, attempt {}/{}): {}",
                job_id,
                job.attempts,
                job.max_attempts,
                msg
            );
            if let Err(e) = queue.reschedule(job_id, &msg, now + backoff, now).await {
                tracing::error!("Failed to reschedule job {}: {}", job_id, e);
            }
            return;
        }
        Err(e) => e,
    };

    let msg = error.to_string();
    tracing::error!(
        "Job {} failed permanently after {} attempt(s): {}",
        job_id,
        job.attempts,
        msg
    );
    if let Err(e) = queue.fail(job_id, &msg, now).await {
        tracing::error!("Failed to mark job {} as failed: {}", job_id, e);
    }
    executor.notify_permanent_failure(job, &error).await;
}
