//! Join/leave recording retry job.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use halqa_core::config::WorkerConfig;
use halqa_core::error::AppError;
use halqa_core::result::AppResult;
use halqa_core::types::UserId;
use halqa_entity::attendance::AttendanceOperation;
use halqa_entity::job::{Job, JobPayload, JobPriority};
use halqa_entity::session::{SessionKind, SessionRef};
use halqa_service::{RecordingError, RecordingRetryScheduler, RecordingRetryService};

use crate::executor::{JobExecutionError, JobHandler, parse_payload};
use crate::queue::{ATTENDANCE_QUEUE, JobCreateParams, JobQueue};

/// Job parameters for retrying a failed join or leave.
pub fn recording_retry_params(
    session: SessionRef,
    user_id: UserId,
    operation: AttendanceOperation,
    max_attempts: i32,
) -> Result<JobCreateParams, AppError> {
    JobCreateParams::from_payload(
        &JobPayload::RetryAttendanceRecording {
            session_id: session.id,
            session_kind: session.kind.to_string(),
            user_id,
            operation: operation.to_string(),
        },
        ATTENDANCE_QUEUE,
        JobPriority::High,
        max_attempts,
    )
}

/// Schedules recording retries as delayed jobs on the attendance queue.
#[derive(Debug, Clone)]
pub struct QueuedRecordingRetries {
    queue: Arc<JobQueue>,
    max_attempts: i32,
    backoff: Duration,
}

impl QueuedRecordingRetries {
    /// Create a scheduler using the worker's retry policy.
    pub fn new(queue: Arc<JobQueue>, config: &WorkerConfig) -> Self {
        Self {
            queue,
            max_attempts: config.retry_max_attempts,
            backoff: Duration::seconds(config.retry_backoff_seconds as i64),
        }
    }
}

#[async_trait]
impl RecordingRetryScheduler for QueuedRecordingRetries {
    async fn schedule(
        &self,
        session: SessionRef,
        user_id: UserId,
        operation: AttendanceOperation,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut params = recording_retry_params(session, user_id, operation, self.max_attempts)?;
        params.scheduled_at = Some(now + self.backoff);
        let job = self.queue.enqueue_at(params, now).await?;

        tracing::info!(
            job_id = %job.id,
            session_id = %session.id,
            user_id = %user_id,
            operation = %operation,
            "Attendance recording retry scheduled"
        );
        Ok(())
    }
}

/// Re-invokes the recorder for a failed join/leave
#[derive(Debug)]
pub struct RecordingRetryJobHandler {
    service: RecordingRetryService,
}

impl RecordingRetryJobHandler {
    /// Create a new recording retry job handler
    pub fn new(service: RecordingRetryService) -> Self {
        Self { service }
    }
}

fn skipped(reason: &str) -> Option<Value> {
    Some(serde_json::json!({
        "task": "retry_attendance_recording",
        "outcome": reason,
    }))
}

#[async_trait]
impl JobHandler for RecordingRetryJobHandler {
    fn job_type(&self) -> &str {
        "retry_attendance_recording"
    }

    async fn execute(&self, job: &Job, now: DateTime<Utc>) -> Result<Option<Value>, JobExecutionError> {
        let JobPayload::RetryAttendanceRecording {
            session_id,
            session_kind,
            user_id,
            operation,
        } = parse_payload(job)?
        else {
            return Err(JobExecutionError::Permanent(format!(
                "Unexpected payload for recording retry job {}",
                job.id
            )));
        };

        let kind: SessionKind = match session_kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    user_id = %user_id,
                    error = %e,
                    "Unknown session kind for attendance retry"
                );
                return Ok(skipped("invalid_session_kind"));
            }
        };

        let operation: AttendanceOperation = match operation.parse() {
            Ok(op) => op,
            Err(e) => {
                tracing::error!(
                    session_id = %session_id,
                    user_id = %user_id,
                    error = %e,
                    "Unknown operation for attendance retry"
                );
                return Ok(skipped("invalid_operation"));
            }
        };

        match self
            .service
            .retry(SessionRef::new(kind, session_id), user_id, operation, now)
            .await
        {
            Ok(()) => Ok(Some(serde_json::json!({
                "task": "retry_attendance_recording",
                "outcome": "recorded",
                "operation": operation,
            }))),
            Err(RecordingError::SessionNotFound(_)) => Ok(skipped("session_not_found")),
            Err(RecordingError::UserNotFound(_)) => Ok(skipped("user_not_found")),
            Err(e) => Err(JobExecutionError::Transient(e.to_string())),
        }
    }

    async fn on_permanent_failure(&self, job: &Job, error: &JobExecutionError) {
        tracing::error!(
            job_id = %job.id,
            attempts = job.attempts,
            payload = %job.payload,
            error = %error,
            "Attendance recording retry gave up"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use halqa_database::MemoryStore;
    use halqa_entity::job::JobStatus;
    use halqa_entity::session::Session;
    use halqa_entity::user::User;
    use halqa_service::AttendanceRecorder;
    use uuid::Uuid;

    use super::*;

    #[derive(Debug, Default)]
    struct CountingRecorder {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl AttendanceRecorder for CountingRecorder {
        async fn handle_join(&self, _s: &Session, _u: &User, _at: DateTime<Utc>) -> AppResult<bool> {
            *self.calls.lock().unwrap() += 1;
            Ok(true)
        }

        async fn handle_leave(&self, _s: &Session, _u: &User, _at: DateTime<Utc>) -> AppResult<bool> {
            *self.calls.lock().unwrap() += 1;
            Ok(true)
        }
    }

    fn handler(recorder: Arc<CountingRecorder>) -> RecordingRetryJobHandler {
        let store = Arc::new(MemoryStore::new());
        RecordingRetryJobHandler::new(RecordingRetryService::new(store.clone(), store, recorder))
    }

    fn job(payload: Value) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            job_type: "retry_attendance_recording".to_string(),
            queue: ATTENDANCE_QUEUE.to_string(),
            priority: JobPriority::High,
            payload,
            result: None,
            error_message: None,
            status: JobStatus::Running,
            attempts: 1,
            max_attempts: 3,
            scheduled_at: None,
            started_at: Some(now),
            completed_at: None,
            worker_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn payload(kind: &str, operation: &str) -> Value {
        serde_json::json!({
            "job_type": "retry_attendance_recording",
            "session_id": Uuid::new_v4(),
            "session_kind": kind,
            "user_id": Uuid::new_v4(),
            "operation": operation,
        })
    }

    #[tokio::test]
    async fn test_unknown_operation_ends_without_error() {
        let recorder = Arc::new(CountingRecorder::default());
        let result = handler(recorder.clone())
            .execute(&job(payload("quran", "teleport")), Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result["outcome"], "invalid_operation");
        assert_eq!(*recorder.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_session_kind_ends_without_error() {
        let result = handler(Arc::default())
            .execute(&job(payload("circle", "join")), Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result["outcome"], "invalid_session_kind");
    }

    #[tokio::test]
    async fn test_missing_session_ends_without_error() {
        let recorder = Arc::new(CountingRecorder::default());
        let result = handler(recorder.clone())
            .execute(&job(payload("academic", "leave")), Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result["outcome"], "session_not_found");
        assert_eq!(*recorder.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_scheduled_retry_waits_for_backoff() {
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(JobQueue::new(store.clone(), "worker-1".to_string()));
        let retries = QueuedRecordingRetries::new(queue.clone(), &WorkerConfig::default());
        let session = SessionRef::new(SessionKind::Quran, halqa_core::types::SessionId::new());
        let now = Utc::now();

        retries
            .schedule(session, UserId::new(), AttendanceOperation::Join, now)
            .await
            .unwrap();

        let jobs = store.jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job_type, "retry_attendance_recording");
        assert_eq!(jobs[0].max_attempts, 3);
        assert_eq!(jobs[0].scheduled_at, Some(now + Duration::seconds(60)));
        assert!(queue.dequeue(&[ATTENDANCE_QUEUE], now).await.unwrap().is_none());
        assert!(
            queue
                .dequeue(&[ATTENDANCE_QUEUE], now + Duration::seconds(60))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_retry_params_round_trip_through_payload() {
        let session = SessionRef::new(SessionKind::Academic, halqa_core::types::SessionId::new());
        let params =
            recording_retry_params(session, UserId::new(), AttendanceOperation::Leave, 3).unwrap();

        assert_eq!(params.job_type, "retry_attendance_recording");
        assert_eq!(params.max_attempts, 3);
        assert_eq!(params.payload["session_kind"], "academic");
        assert_eq!(params.payload["operation"], "leave");
    }
}
