//! Per-participant meeting attendance record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use halqa_core::types::{SessionId, UserId};

use super::status::{AttendanceStatus, ParticipantRole};
use crate::session::{SessionKind, SessionRef};

/// One continuous presence interval inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinLeaveCycle {
    /// When the participant connected.
    pub joined_at: DateTime<Utc>,
    /// When the participant disconnected (None = still connected).
    pub left_at: Option<DateTime<Utc>>,
    /// Length of the cycle in whole minutes, set on close.
    pub duration_minutes: Option<i32>,
}

impl JoinLeaveCycle {
    /// Start a new open cycle.
    pub fn open(joined_at: DateTime<Utc>) -> Self {
        Self {
            joined_at,
            left_at: None,
            duration_minutes: None,
        }
    }

    /// Whether the cycle has not been closed yet.
    pub fn is_open(&self) -> bool {
        self.left_at.is_none()
    }
}

/// The computed-or-pending attendance verdict for one (session, user) pair.
///
/// Once `is_calculated` is true the record is final.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MeetingAttendance {
    /// Row identifier.
    pub id: Uuid,
    /// Kind of the owning session.
    pub session_kind: SessionKind,
    /// Owning session.
    pub session_id: SessionId,
    /// Participant user.
    pub user_id: UserId,
    /// Participant role.
    pub user_role: ParticipantRole,
    /// First time the participant joined.
    pub first_join_time: Option<DateTime<Utc>>,
    /// Last time the participant left.
    pub last_leave_time: Option<DateTime<Utc>>,
    /// Ordered presence intervals.
    pub join_leave_cycles: Json<Vec<JoinLeaveCycle>>,
    /// Presence clipped to the scheduled window, in minutes.
    pub total_duration_minutes: i32,
    /// Final verdict (None until calculated).
    pub attendance_status: Option<AttendanceStatus>,
    /// Presence as a percentage of the scheduled duration (0-100).
    pub attendance_percentage: f64,
    /// Whether the verdict is final.
    pub is_calculated: bool,
    /// When the verdict was computed.
    pub attendance_calculated_at: Option<DateTime<Utc>>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl MeetingAttendance {
    /// Start an empty, pending record for a participant.
    pub fn pending(
        session: SessionRef,
        user_id: UserId,
        user_role: ParticipantRole,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_kind: session.kind,
            session_id: session.id,
            user_id,
            user_role,
            first_join_time: None,
            last_leave_time: None,
            join_leave_cycles: Json(Vec::new()),
            total_duration_minutes: 0,
            attendance_status: None,
            attendance_percentage: 0.0,
            is_calculated: false,
            attendance_calculated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The kind-qualified session this record belongs to.
    pub fn session_ref(&self) -> SessionRef {
        SessionRef::new(self.session_kind, self.session_id)
    }

    /// Presence intervals in recorded order.
    pub fn cycles(&self) -> &[JoinLeaveCycle] {
        &self.join_leave_cycles.0
    }

    /// Whether the last recorded cycle is still open.
    pub fn has_open_cycle(&self) -> bool {
        self.cycles().last().is_some_and(JoinLeaveCycle::is_open)
    }
}

/// Output of the attendance calculator, written back onto a pending record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceVerdict {
    /// Presence clipped to the scheduled window, in minutes.
    pub total_duration_minutes: i32,
    /// Presence percentage, 0-100, two decimals.
    pub attendance_percentage: f64,
    /// Classification.
    pub attendance_status: AttendanceStatus,
    /// Whether the first join came after the late tolerance.
    pub is_late: bool,
    /// Minutes between scheduled start and first join (0 when on time).
    pub late_minutes: i32,
}
