//! Teacher earnings jobs: one session at a time, and the catch-up sweep.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use halqa_core::error::AppError;
use halqa_entity::job::{Job, JobPayload, JobPriority};
use halqa_entity::session::SessionRef;
use halqa_service::{EarningsOutcome, EarningsService};

use crate::executor::{JobExecutionError, JobHandler, parse_payload};
use crate::queue::{EARNINGS_QUEUE, JobCreateParams};

/// Job parameters for calculating one session's earning.
pub fn earnings_job_params(session: SessionRef, max_attempts: i32) -> Result<JobCreateParams, AppError> {
    JobCreateParams::from_payload(
        &JobPayload::CalculateSessionEarnings {
            session_kind: session.kind,
            session_id: session.id,
        },
        EARNINGS_QUEUE,
        JobPriority::Normal,
        max_attempts,
    )
}

/// Computes the earning of one completed session
#[derive(Debug)]
pub struct EarningsJobHandler {
    service: EarningsService,
}

impl EarningsJobHandler {
    /// Create a new earnings job handler
    pub fn new(service: EarningsService) -> Self {
        Self { service }
    }
}

fn session_of(job: &Job) -> Result<SessionRef, JobExecutionError> {
    match parse_payload(job)? {
        JobPayload::CalculateSessionEarnings {
            session_kind,
            session_id,
        } => Ok(SessionRef::new(session_kind, session_id)),
        other => Err(JobExecutionError::Permanent(format!(
            "Unexpected payload '{}' for earnings job {}",
            other.job_type(),
            job.id
        ))),
    }
}

#[async_trait]
impl JobHandler for EarningsJobHandler {
    fn job_type(&self) -> &str {
        "calculate_session_earnings"
    }

    async fn execute(&self, job: &Job, now: DateTime<Utc>) -> Result<Option<Value>, JobExecutionError> {
        let session = session_of(job)?;

        let outcome = self
            .service
            .calculate_for_session(session, now)
            .await
            .map_err(|e| JobExecutionError::Transient(e.to_string()))?;

        let (status, earning_id) = match &outcome {
            EarningsOutcome::SessionNotFound => ("session_not_found", None),
            EarningsOutcome::NotEligible => ("not_eligible", None),
            EarningsOutcome::Recorded(earning) => ("recorded", Some(earning.id)),
        };

        Ok(Some(serde_json::json!({
            "task": "calculate_session_earnings",
            "session_id": session.id,
            "session_kind": session.kind,
            "outcome": status,
            "earning_id": earning_id,
        })))
    }

    async fn on_permanent_failure(&self, job: &Job, error: &JobExecutionError) {
        match session_of(job) {
            Ok(session) => tracing::error!(
                session_id = %session.id,
                session_kind = %session.kind,
                attempts = job.attempts,
                error = %error,
                "Earnings calculation failed permanently"
            ),
            Err(_) => tracing::error!(
                job_id = %job.id,
                error = %error,
                "Earnings calculation failed permanently"
            ),
        }
    }
}

/// Runs one earnings catch-up sweep per job
#[derive(Debug)]
pub struct EarningsSweepJobHandler {
    service: EarningsService,
}

impl EarningsSweepJobHandler {
    /// Create a new earnings sweep job handler
    pub fn new(service: EarningsService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl JobHandler for EarningsSweepJobHandler {
    fn job_type(&self) -> &str {
        "sweep_session_earnings"
    }

    async fn execute(&self, _job: &Job, now: DateTime<Utc>) -> Result<Option<Value>, JobExecutionError> {
        let summary = self.service.sweep(now).await.map_err(|e| {
            JobExecutionError::Transient(format!("Failed to load sessions for earnings: {}", e))
        })?;

        Ok(Some(serde_json::json!({
            "task": "sweep_session_earnings",
            "checked": summary.checked,
            "recorded": summary.recorded,
            "not_eligible": summary.not_eligible,
            "failed": summary.failed,
        })))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use uuid::Uuid;

    use halqa_core::config::{AttendanceConfig, EarningsConfig};
    use halqa_core::types::{AcademyId, SessionId, UserId};
    use halqa_database::MemoryStore;
    use halqa_entity::job::JobStatus;
    use halqa_entity::session::{Session, SessionKind, SessionStatus};
    use halqa_service::FlatRateEarningsCalculator;

    use super::*;

    fn service(store: &Arc<MemoryStore>) -> EarningsService {
        EarningsService::new(
            store.clone(),
            Arc::new(FlatRateEarningsCalculator::new(
                store.clone(),
                store.clone(),
                EarningsConfig::default(),
            )),
            &AttendanceConfig::default(),
        )
    }

    fn completed_session(scheduled_at: DateTime<Utc>) -> Session {
        Session {
            id: SessionId::new(),
            kind: SessionKind::Academic,
            academy_id: Some(AcademyId::new()),
            teacher_id: Some(UserId::new()),
            status: SessionStatus::Completed,
            scheduled_at,
            duration_minutes: Some(45),
            meeting_room_name: None,
            created_at: scheduled_at,
            updated_at: scheduled_at,
        }
    }

    fn job(payload: Value, now: DateTime<Utc>) -> Job {
        Job {
            id: Uuid::new_v4(),
            job_type: payload["job_type"].as_str().unwrap_or_default().to_string(),
            queue: EARNINGS_QUEUE.to_string(),
            priority: JobPriority::Normal,
            payload,
            result: None,
            error_message: None,
            status: JobStatus::Running,
            attempts: 1,
            max_attempts: 1,
            scheduled_at: None,
            started_at: Some(now),
            completed_at: None,
            worker_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_sweep_job_pays_unpaid_completed_session() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let session = completed_session(now - Duration::hours(3));
        store.insert_session(session.clone()).await;
        let payload = serde_json::to_value(JobPayload::SweepSessionEarnings).unwrap();

        let result = EarningsSweepJobHandler::new(service(&store))
            .execute(&job(payload, now), now)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result["recorded"], 1);
        assert_eq!(store.earnings().await[0].amount_cents, 7500);
    }

    #[tokio::test]
    async fn test_session_job_rejects_foreign_payload() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let payload = serde_json::to_value(JobPayload::SweepSessionEarnings).unwrap();

        let err = EarningsJobHandler::new(service(&store))
            .execute(&job(payload, now), now)
            .await
            .unwrap_err();

        assert!(matches!(err, JobExecutionError::Permanent(_)));
    }
}
