//! # halqa-service
//!
//! Business logic for the attendance pipeline. Each service is written
//! against the store traits in `halqa-database` and the collaborator traits
//! in `halqa-core`, with all dependencies provided at construction time via
//! `Arc` references.
//!
//! Every operation that depends on the current time takes it as a `now`
//! argument; callers pass `Utc::now()`.

pub mod attendance;
pub mod conferencing;
pub mod earnings;
pub mod reconciler;
pub mod recording;
pub mod report;

#[cfg(test)]
pub(crate) mod testing;

pub use attendance::{AttendanceCalculationService, AttendanceEventService, AttendancePolicy};
pub use conferencing::LiveKitRoomClient;
pub use earnings::{
    EarningsCalculator, EarningsOutcome, EarningsService, EarningsSweepSummary,
    FlatRateEarningsCalculator,
};
pub use reconciler::AttendanceReconciler;
pub use recording::{
    AttendanceRecorder, MeetingAttendanceRecorder, RecordingError, RecordingRetryScheduler,
    RecordingRetryService,
};
pub use report::ReportSynchronizer;
