//! Attendance verdict calculation and telemetry ingestion.

pub mod calculator;
pub mod ingest;
pub mod sweep;

pub use calculator::{AttendancePolicy, CalculationError};
pub use ingest::AttendanceEventService;
pub use sweep::{AttendanceCalculationService, CalculationSummary};
