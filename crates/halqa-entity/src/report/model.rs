//! Session report entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use halqa_core::types::{AcademyId, SessionId, UserId};

use crate::attendance::AttendanceStatus;
use crate::session::{SessionKind, SessionRef};

/// A student's attendance row in the per-kind session report
/// (`quran_session_reports` or `academic_session_reports`).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionReport {
    /// Row identifier.
    pub id: Uuid,
    /// Reported session.
    pub session_id: SessionId,
    /// Reported student.
    pub student_id: UserId,
    /// Session teacher.
    pub teacher_id: Option<UserId>,
    /// Owning academy.
    pub academy_id: Option<AcademyId>,
    /// First join time.
    pub meeting_enter_time: Option<DateTime<Utc>>,
    /// Last leave time.
    pub meeting_leave_time: Option<DateTime<Utc>>,
    /// Clipped presence in minutes.
    pub actual_attendance_minutes: i32,
    /// Mirrored verdict.
    pub attendance_status: AttendanceStatus,
    /// Mirrored percentage.
    pub attendance_percentage: f64,
    /// Whether the student joined after the late tolerance.
    pub is_late: bool,
    /// Minutes late.
    pub late_minutes: i32,
    /// Whether the row reflects a final verdict.
    pub is_calculated: bool,
    /// When the verdict was projected.
    pub evaluated_at: Option<DateTime<Utc>>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data written by the report synchronizer. Keyed by (session, student).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertSessionReport {
    /// Reported session; the kind selects the report table.
    pub session: SessionRef,
    /// Reported student.
    pub student_id: UserId,
    /// Session teacher.
    pub teacher_id: Option<UserId>,
    /// Owning academy.
    pub academy_id: Option<AcademyId>,
    /// First join time.
    pub meeting_enter_time: Option<DateTime<Utc>>,
    /// Last leave time.
    pub meeting_leave_time: Option<DateTime<Utc>>,
    /// Clipped presence in minutes.
    pub actual_attendance_minutes: i32,
    /// Verdict.
    pub attendance_status: AttendanceStatus,
    /// Percentage.
    pub attendance_percentage: f64,
    /// Late flag.
    pub is_late: bool,
    /// Minutes late.
    pub late_minutes: i32,
    /// Projection time.
    pub evaluated_at: DateTime<Utc>,
}

impl SessionKind {
    /// Name of the report table owned by this kind.
    pub fn report_table(&self) -> &'static str {
        match self {
            Self::Quran => "quran_session_reports",
            Self::Academic => "academic_session_reports",
        }
    }
}
