//! Orphaned join reconciliation job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use halqa_entity::job::Job;
use halqa_service::AttendanceReconciler;

use crate::executor::{JobExecutionError, JobHandler};

/// Runs one reconciliation sweep per job
#[derive(Debug)]
pub struct ReconcileJobHandler {
    reconciler: AttendanceReconciler,
}

impl ReconcileJobHandler {
    /// Create a new reconcile job handler
    pub fn new(reconciler: AttendanceReconciler) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl JobHandler for ReconcileJobHandler {
    fn job_type(&self) -> &str {
        "reconcile_orphaned_events"
    }

    async fn execute(&self, _job: &Job, now: DateTime<Utc>) -> Result<Option<Value>, JobExecutionError> {
        let summary = self.reconciler.run(now).await.map_err(|e| {
            JobExecutionError::Transient(format!("Failed to find orphaned join events: {}", e))
        })?;

        Ok(Some(serde_json::json!({
            "task": "reconcile_orphaned_events",
            "found": summary.found,
            "closed": summary.closed,
            "skipped": summary.skipped,
        })))
    }
}
