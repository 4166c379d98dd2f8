//! Persistent queue rows for the sweeps, earnings and recording retries.

pub mod model;
pub mod payload;
pub mod status;

pub use model::{CreateJob, ExpiredJobs, Job};
pub use payload::JobPayload;
pub use status::{JobPriority, JobStatus};
