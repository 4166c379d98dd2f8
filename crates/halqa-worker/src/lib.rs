//! Background job processing and scheduled tasks for Halqa.
//!
//! This crate provides:
//! - A job queue over the persistent job store
//! - A worker runner that polls for and executes queued jobs, retrying
//!   transient failures with a fixed backoff
//! - A cron scheduler that enqueues the periodic attendance sweeps
//! - A job executor that dispatches jobs to the correct handler
//! - The job handlers for reconciliation, calculation, earnings,
//!   recording retries and queue maintenance

pub mod executor;
pub mod jobs;
pub mod queue;
pub mod runner;
pub mod scheduler;

pub use executor::{JobExecutionError, JobExecutor, JobHandler};
pub use queue::{JobCreateParams, JobQueue, QueueStats};
pub use runner::WorkerRunner;
pub use scheduler::CronScheduler;
