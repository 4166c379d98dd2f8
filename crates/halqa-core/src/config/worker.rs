//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Number of concurrent job processing tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between job queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Attempts allowed for retryable jobs (earnings, recording retries).
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: i32,
    /// Fixed delay in seconds before a failed attempt is re-run.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_seconds: u64,
    /// Cron expression (with seconds) for the orphaned-event reconciliation sweep.
    #[serde(default = "default_reconcile_schedule")]
    pub reconcile_schedule: String,
    /// Cron expression (with seconds) for the attendance calculation sweep.
    #[serde(default = "default_attendance_schedule")]
    pub attendance_schedule: String,
    /// Cron expression (with seconds) for the earnings catch-up sweep.
    #[serde(default = "default_earnings_schedule")]
    pub earnings_schedule: String,
    /// Cron expression (with seconds) for job queue maintenance.
    #[serde(default = "default_maintenance_schedule")]
    pub maintenance_schedule: String,
    /// A running job claimed longer ago than this is presumed lost with its worker.
    #[serde(default = "default_job_lease")]
    pub job_lease_seconds: u64,
    /// Days finished jobs are kept before being purged.
    #[serde(default = "default_job_retention_days")]
    pub job_retention_days: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_seconds: default_retry_backoff(),
            reconcile_schedule: default_reconcile_schedule(),
            attendance_schedule: default_attendance_schedule(),
            earnings_schedule: default_earnings_schedule(),
            maintenance_schedule: default_maintenance_schedule(),
            job_lease_seconds: default_job_lease(),
            job_retention_days: default_job_retention_days(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    5
}

fn default_retry_max_attempts() -> i32 {
    3
}

fn default_retry_backoff() -> u64 {
    60
}

fn default_reconcile_schedule() -> String {
    "0 */5 * * * *".to_string()
}

fn default_attendance_schedule() -> String {
    "30 */5 * * * *".to_string()
}

fn default_earnings_schedule() -> String {
    "45 */15 * * * *".to_string()
}

fn default_maintenance_schedule() -> String {
    "15 */10 * * * *".to_string()
}

fn default_job_lease() -> u64 {
    900
}

fn default_job_retention_days() -> u32 {
    7
}
