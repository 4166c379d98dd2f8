//! Raw attendance telemetry event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use halqa_core::types::{SessionId, UserId};

use super::status::EventType;
use crate::session::{SessionKind, SessionRef};

/// One join or leave fact reported by the conferencing provider.
///
/// A `join` event is open while `left_at` is `None`. Only join events are
/// ever closed; leave events are terminal facts.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceEvent {
    /// Row identifier.
    pub id: Uuid,
    /// Provider event id used for deduplication.
    pub event_id: String,
    /// Join or leave.
    pub event_type: EventType,
    /// When the provider observed the event.
    pub event_timestamp: DateTime<Utc>,
    /// Kind of the owning session.
    pub session_kind: SessionKind,
    /// Owning session.
    pub session_id: SessionId,
    /// Participant user.
    pub user_id: UserId,
    /// Provider-assigned participant connection id.
    pub participant_sid: String,
    /// Display name at connection time.
    pub participant_name: Option<String>,
    /// When the connection ended (None = still open).
    pub left_at: Option<DateTime<Utc>>,
    /// Connection length in minutes, set on close.
    pub duration_minutes: Option<i32>,
    /// Why the event was closed synthetically.
    pub termination_reason: Option<String>,
    /// When the row was inserted.
    pub created_at: DateTime<Utc>,
}

impl AttendanceEvent {
    /// The kind-qualified session this event belongs to.
    pub fn session_ref(&self) -> SessionRef {
        SessionRef::new(self.session_kind, self.session_id)
    }

    /// Whether this is a join event that has not been closed.
    pub fn is_open(&self) -> bool {
        self.event_type == EventType::Join && self.left_at.is_none()
    }
}

/// Data required to append a telemetry event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttendanceEvent {
    /// Provider event id.
    pub event_id: String,
    /// Join or leave.
    pub event_type: EventType,
    /// When the provider observed the event.
    pub event_timestamp: DateTime<Utc>,
    /// Owning session.
    pub session: SessionRef,
    /// Participant user.
    pub user_id: UserId,
    /// Provider-assigned participant connection id.
    pub participant_sid: String,
    /// Display name at connection time.
    pub participant_name: Option<String>,
}
