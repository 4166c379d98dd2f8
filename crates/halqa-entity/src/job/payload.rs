//! Typed job payload definitions.

use serde::{Deserialize, Serialize};

use halqa_core::types::{SessionId, UserId};

use crate::session::SessionKind;

/// Typed payloads for known job types.
///
/// The retry payload keeps `session_kind` and `operation` as raw strings:
/// they come from the ingestion path and are validated by the handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job_type")]
pub enum JobPayload {
    /// Close join events whose leave webhook never arrived.
    #[serde(rename = "reconcile_orphaned_events")]
    ReconcileOrphanedEvents,
    /// Finalize attendance for sessions past their grace period.
    #[serde(rename = "calculate_session_attendance")]
    CalculateSessionAttendance,
    /// Pay completed sessions that no earnings job reached.
    #[serde(rename = "sweep_session_earnings")]
    SweepSessionEarnings,
    /// Recover lost claims and purge old finished jobs.
    #[serde(rename = "maintain_job_queue")]
    MaintainJobQueue,
    /// Compute the teacher earning for one session.
    #[serde(rename = "calculate_session_earnings")]
    CalculateSessionEarnings {
        /// Session kind.
        session_kind: SessionKind,
        /// Session ID.
        session_id: SessionId,
    },
    /// Re-run a failed join/leave recording.
    #[serde(rename = "retry_attendance_recording")]
    RetryAttendanceRecording {
        /// Session ID.
        session_id: SessionId,
        /// Session kind as received (`quran` or `academic`).
        session_kind: String,
        /// Participant user ID.
        user_id: UserId,
        /// Operation as received (`join` or `leave`).
        operation: String,
    },
}

impl JobPayload {
    /// The job type string this payload is stored under.
    pub fn job_type(&self) -> &'static str {
        match self {
            Self::ReconcileOrphanedEvents => "reconcile_orphaned_events",
            Self::CalculateSessionAttendance => "calculate_session_attendance",
            Self::SweepSessionEarnings => "sweep_session_earnings",
            Self::MaintainJobQueue => "maintain_job_queue",
            Self::CalculateSessionEarnings { .. } => "calculate_session_earnings",
            Self::RetryAttendanceRecording { .. } => "retry_attendance_recording",
        }
    }
}
