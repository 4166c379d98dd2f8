//! Job queue maintenance: lost-claim recovery and retention purge.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use halqa_core::config::WorkerConfig;
use halqa_entity::job::Job;

use crate::executor::{JobExecutionError, JobHandler};
use crate::queue::JobQueue;

/// Handles queue maintenance jobs
#[derive(Debug)]
pub struct QueueMaintenanceJobHandler {
    queue: Arc<JobQueue>,
    lease: Duration,
    retention: Duration,
}

impl QueueMaintenanceJobHandler {
    /// Create a new queue maintenance job handler
    pub fn new(queue: Arc<JobQueue>, config: &WorkerConfig) -> Self {
        Self {
            queue,
            lease: Duration::seconds(config.job_lease_seconds as i64),
            retention: Duration::days(i64::from(config.job_retention_days)),
        }
    }
}

#[async_trait]
impl JobHandler for QueueMaintenanceJobHandler {
    fn job_type(&self) -> &str {
        "maintain_job_queue"
    }

    async fn execute(&self, _job: &Job, now: DateTime<Utc>) -> Result<Option<Value>, JobExecutionError> {
        tracing::info!("Running job queue maintenance");

        let recovered = self
            .queue
            .requeue_expired(self.lease, now)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Lease recovery failed: {}", e)))?;

        let purged = self
            .queue
            .purge_finished(now - self.retention)
            .await
            .map_err(|e| JobExecutionError::Transient(format!("Job purge failed: {}", e)))?;

        Ok(Some(serde_json::json!({
            "task": "maintain_job_queue",
            "requeued": recovered.requeued,
            "failed": recovered.failed,
            "purged": purged,
        })))
    }
}

#[cfg(test)]
mod tests {
    use halqa_database::MemoryStore;
    use halqa_entity::job::{JobPayload, JobPriority, JobStatus};

    use super::*;
    use crate::queue::{EARNINGS_QUEUE, JobCreateParams};

    fn earnings_job() -> JobCreateParams {
        JobCreateParams::from_payload(
            &JobPayload::CalculateSessionEarnings {
                session_kind: halqa_entity::session::SessionKind::Quran,
                session_id: halqa_core::types::SessionId::new(),
            },
            EARNINGS_QUEUE,
            JobPriority::Normal,
            3,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_claim_lost_with_its_worker_is_redelivered() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(JobQueue::new(store.clone(), "worker-1".to_string()));
        let handler = QueueMaintenanceJobHandler::new(queue.clone(), &WorkerConfig::default());
        let t0 = Utc::now();
        let job = queue.enqueue_at(earnings_job(), t0).await.unwrap();
        queue.dequeue(&[EARNINGS_QUEUE], t0).await.unwrap().unwrap();

        let within_lease = t0 + Duration::minutes(10);
        let result = handler.execute(&job, within_lease).await.unwrap().unwrap();
        assert_eq!(result["requeued"], 0);
        assert!(queue.dequeue(&[EARNINGS_QUEUE], within_lease).await.unwrap().is_none());

        let past_lease = t0 + Duration::minutes(16);
        let result = handler.execute(&job, past_lease).await.unwrap().unwrap();
        assert_eq!(result["requeued"], 1);

        let redelivered = queue.dequeue(&[EARNINGS_QUEUE], past_lease).await.unwrap().unwrap();
        assert_eq!(redelivered.id, job.id);
        assert_eq!(redelivered.attempts, 2);
    }

    #[tokio::test]
    async fn test_finished_jobs_are_purged_after_retention() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(JobQueue::new(store.clone(), "worker-1".to_string()));
        let handler = QueueMaintenanceJobHandler::new(queue.clone(), &WorkerConfig::default());
        let t0 = Utc::now();
        let done = queue.enqueue_at(earnings_job(), t0).await.unwrap();
        queue.enqueue_at(earnings_job(), t0).await.unwrap();
        queue.complete(done.id, None, t0).await.unwrap();

        let result = handler.execute(&done, t0 + Duration::days(8)).await.unwrap().unwrap();

        assert_eq!(result["purged"], 1);
        let jobs = store.jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Pending);
    }
}
