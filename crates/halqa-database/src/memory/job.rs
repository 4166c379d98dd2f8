use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use halqa_core::error::AppError;
use halqa_core::result::AppResult;
use halqa_entity::job::{CreateJob, ExpiredJobs, Job, JobStatus};

use super::MemoryStore;
use crate::store::JobStore;

impl MemoryStore {
    async fn update_job(&self, id: Uuid, apply: impl FnOnce(&mut Job)) -> AppResult<()> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| AppError::not_found(format!("Job {id} not found")))?;
        apply(job);
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, data: &CreateJob, now: DateTime<Utc>) -> AppResult<Job> {
        let job = Job {
            id: Uuid::new_v4(),
            job_type: data.job_type.clone(),
            queue: data.queue.clone(),
            priority: data.priority,
            payload: data.payload.clone(),
            result: None,
            error_message: None,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: data.max_attempts,
            scheduled_at: data.scheduled_at,
            started_at: None,
            completed_at: None,
            worker_id: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs.lock().await.push(job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>> {
        Ok(self.jobs.lock().await.iter().find(|j| j.id == id).cloned())
    }

    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Job>> {
        let mut jobs = self.jobs.lock().await;
        let next = jobs
            .iter_mut()
            .filter(|j| j.queue == queue && j.is_due(now))
            .min_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            });

        Ok(next.map(|job| {
            job.status = JobStatus::Running;
            job.attempts += 1;
            job.started_at = Some(now);
            job.worker_id = Some(worker_id.to_string());
            job.updated_at = now;
            job.clone()
        }))
    }

    async fn complete(
        &self,
        id: Uuid,
        result: Option<&serde_json::Value>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.update_job(id, |job| {
            job.status = JobStatus::Completed;
            job.result = result.cloned();
            job.error_message = None;
            job.completed_at = Some(now);
            job.updated_at = now;
        })
        .await
    }

    async fn fail(&self, id: Uuid, error_message: &str, now: DateTime<Utc>) -> AppResult<()> {
        self.update_job(id, |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(error_message.to_string());
            job.completed_at = Some(now);
            job.updated_at = now;
        })
        .await
    }

    async fn reschedule(
        &self,
        id: Uuid,
        error_message: &str,
        run_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.update_job(id, |job| {
            job.status = JobStatus::Pending;
            job.error_message = Some(error_message.to_string());
            job.scheduled_at = Some(run_at);
            job.started_at = None;
            job.worker_id = None;
            job.updated_at = now;
        })
        .await
    }

    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64> {
        let count = self
            .jobs
            .lock()
            .await
            .iter()
            .filter(|j| j.status == status)
            .count();
        Ok(count as i64)
    }

    async fn requeue_expired(
        &self,
        started_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<ExpiredJobs> {
        let mut outcome = ExpiredJobs::default();
        let mut jobs = self.jobs.lock().await;
        let expired = jobs.iter_mut().filter(|j| {
            j.status == JobStatus::Running && j.started_at.is_some_and(|at| at < started_before)
        });

        for job in expired {
            job.error_message = Some("lease expired".to_string());
            job.updated_at = now;
            if job.has_attempts_left() {
                job.status = JobStatus::Pending;
                job.scheduled_at = Some(now);
                job.started_at = None;
                job.worker_id = None;
                outcome.requeued += 1;
            } else {
                job.status = JobStatus::Failed;
                job.completed_at = Some(now);
                outcome.failed += 1;
            }
        }
        Ok(outcome)
    }

    async fn purge_finished(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let mut jobs = self.jobs.lock().await;
        let len = jobs.len();
        jobs.retain(|j| {
            !(matches!(j.status, JobStatus::Completed | JobStatus::Failed) && j.updated_at < before)
        });
        Ok((len - jobs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use halqa_entity::job::JobPriority;

    use super::*;

    fn create_job(max_attempts: i32) -> CreateJob {
        CreateJob {
            job_type: "calculate_session_earnings".to_string(),
            queue: "earnings".to_string(),
            priority: JobPriority::Normal,
            payload: serde_json::json!({}),
            max_attempts,
            scheduled_at: None,
        }
    }

    #[tokio::test]
    async fn test_expired_claim_is_redelivered_until_attempts_run_out() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        let job = store.create(&create_job(2), t0).await.unwrap();

        store.claim_next("earnings", "worker-a", t0).await.unwrap().unwrap();
        let t1 = t0 + Duration::minutes(1);
        let recovered = store.requeue_expired(t1, t1).await.unwrap();
        assert_eq!(recovered, ExpiredJobs { requeued: 1, failed: 0 });

        let again = store.claim_next("earnings", "worker-b", t1).await.unwrap().unwrap();
        assert_eq!(again.id, job.id);
        assert_eq!(again.attempts, 2);

        let t2 = t1 + Duration::minutes(1);
        let recovered = store.requeue_expired(t2, t2).await.unwrap();
        assert_eq!(recovered, ExpiredJobs { requeued: 0, failed: 1 });
        let failed = store.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("lease expired"));
    }

    #[tokio::test]
    async fn test_recent_claim_is_left_running() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        store.create(&create_job(3), t0).await.unwrap();
        store.claim_next("earnings", "worker-a", t0).await.unwrap().unwrap();

        let recovered = store.requeue_expired(t0, t0 + Duration::seconds(30)).await.unwrap();

        assert_eq!(recovered, ExpiredJobs::default());
        assert_eq!(store.count_by_status(JobStatus::Running).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_keeps_pending_and_recent_jobs() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        let old_done = store.create(&create_job(1), t0).await.unwrap();
        let old_failed = store.create(&create_job(1), t0).await.unwrap();
        let recent_done = store.create(&create_job(1), t0).await.unwrap();
        let pending = store.create(&create_job(1), t0).await.unwrap();
        store.complete(old_done.id, None, t0).await.unwrap();
        store.fail(old_failed.id, "boom", t0).await.unwrap();
        store.complete(recent_done.id, None, t0 + Duration::days(8)).await.unwrap();

        let purged = store.purge_finished(t0 + Duration::days(7)).await.unwrap();

        assert_eq!(purged, 2);
        let remaining: Vec<Uuid> = store.jobs().await.iter().map(|j| j.id).collect();
        assert_eq!(remaining, vec![recent_done.id, pending.id]);
    }
}
