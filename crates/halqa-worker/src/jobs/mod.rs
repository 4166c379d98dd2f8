//! Job handler implementations.

pub mod attendance;
pub mod earnings;
pub mod maintenance;
pub mod reconcile;
pub mod recording;

pub use attendance::AttendanceCalculationJobHandler;
pub use earnings::{EarningsJobHandler, EarningsSweepJobHandler};
pub use maintenance::QueueMaintenanceJobHandler;
pub use reconcile::ReconcileJobHandler;
pub use recording::{QueuedRecordingRetries, RecordingRetryJobHandler};
