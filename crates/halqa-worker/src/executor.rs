//! Job executor: dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use halqa_core::error::AppError;
use halqa_entity::job::{Job, JobPayload};

/// Trait for job handler implementations
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// Get the job type this handler processes
    fn job_type(&self) -> &str;

    /// Execute the job. `now` is the instant the worker claimed it.
    async fn execute(&self, job: &Job, now: DateTime<Utc>) -> Result<Option<Value>, JobExecutionError>;

    /// Called once when the job has failed for good (attempts exhausted,
    /// permanent, or internal failure).
    async fn on_permanent_failure(&self, _job: &Job, _error: &JobExecutionError) {}
}

/// Error from job execution
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure, do not retry
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure, may retry
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Decode a job's typed payload. A payload that does not decode never will.
pub fn parse_payload(job: &Job) -> Result<JobPayload, JobExecutionError> {
    serde_json::from_value(job.payload.clone()).map_err(|e| {
        JobExecutionError::Permanent(format!("Invalid payload for job {}: {}", job.id, e))
    })
}

/// Dispatches jobs to the appropriate handler based on job_type
#[derive(Debug)]
pub struct JobExecutor {
    /// Registered job handlers by type
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    /// Create a new job executor
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a job handler
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        tracing::info!("Registered job handler for type '{}'", job_type);
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to the correct handler
    pub async fn execute(&self, job: &Job, now: DateTime<Utc>) -> Result<Option<Value>, JobExecutionError> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job type '{}'",
                job.job_type
            ))
        })?;

        tracing::info!(
            "Executing job: id={}, type='{}', attempt={}/{}",
            job.id,
            job.job_type,
            job.attempts,
            job.max_attempts
        );

        handler.execute(job, now).await
    }

    /// Run the handler's terminal failure hook for a job
    pub async fn notify_permanent_failure(&self, job: &Job, error: &JobExecutionError) {
        if let Some(handler) = self.handlers.get(&job.job_type) {
            handler.on_permanent_failure(job, error).await;
        }
    }

    /// Check if a handler is registered for a job type
    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Get the list of registered job types
    pub fn registered_types(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

impl Default for JobExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use halqa_entity::job::{JobPriority, JobStatus};
    use uuid::Uuid;

    use super::*;

    fn job(job_type: &str, payload: Value) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::new_v4(),
            job_type: job_type.to_string(),
            queue: "attendance".to_string(),
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
    async fn test_unknown_job_type_is_permanent() {
        let executor = JobExecutor::new();
        let err = executor
            .execute(&job("mystery", Value::Null), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, JobExecutionError::Permanent(_)));
        assert!(!executor.has_handler("mystery"));
    }

    #[test]
    fn test_malformed_payload_is_permanent() {
        let bad = job("calculate_session_earnings", serde_json::json!({"job_type": "nope"}));
        assert!(matches!(parse_payload(&bad), Err(JobExecutionError::Permanent(_))));
    }
}
