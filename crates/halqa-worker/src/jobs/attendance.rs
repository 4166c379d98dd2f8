//! Attendance calculation job.
//!
//! After each sweep, every completed session that had records finalized gets
//! an earnings job, so earnings never run ahead of attendance. Sessions
//! marked completed only later are paid by the earnings sweep.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use halqa_entity::job::Job;
use halqa_service::AttendanceCalculationService;

use super::earnings::earnings_job_params;
use crate::executor::{JobExecutionError, JobHandler};
use crate::queue::JobQueue;

/// Runs one attendance calculation sweep per job
#[derive(Debug)]
pub struct AttendanceCalculationJobHandler {
    service: AttendanceCalculationService,
    queue: Arc<JobQueue>,
    earnings_max_attempts: i32,
}

impl AttendanceCalculationJobHandler {
    /// Create a new attendance calculation job handler
    pub fn new(
        service: AttendanceCalculationService,
        queue: Arc<JobQueue>,
        earnings_max_attempts: i32,
    ) -> Self {
        Self {
            service,
            queue,
            earnings_max_attempts,
        }
    }
}

#[async_trait]
impl JobHandler for AttendanceCalculationJobHandler {
    fn job_type(&self) -> &str {
        "calculate_session_attendance"
    }

    async fn execute(&self, _job: &Job, now: DateTime<Utc>) -> Result<Option<Value>, JobExecutionError> {
        let summary = self.service.run(now).await.map_err(|e| {
            JobExecutionError::Transient(format!("Failed to load sessions for calculation: {}", e))
        })?;

        let mut earnings_enqueued = 0;
        for session in &summary.finalized_completed_sessions {
            let params = earnings_job_params(*session, self.earnings_max_attempts)?;
            match self.queue.enqueue_at(params, now).await {
                Ok(_) => earnings_enqueued += 1,
                Err(e) => tracing::error!(
                    session_id = %session.id,
                    session_kind = %session.kind,
                    error = %e,
                    "Failed to enqueue earnings calculation"
                ),
            }
        }

        if earnings_enqueued > 0 {
            tracing::info!("Enqueued {} earnings calculations", earnings_enqueued);
        }

        Ok(Some(serde_json::json!({
            "task": "calculate_session_attendance",
            "sessions_checked": summary.sessions_checked,
            "processed": summary.processed,
            "skipped": summary.skipped,
            "failed": summary.failed,
            "report_failures": summary.report_failures,
            "earnings_enqueued": earnings_enqueued,
        })))
    }
}
