//! Session entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use halqa_core::types::{AcademyId, SessionId, UserId};

use super::kind::{SessionKind, SessionRef, SessionStatus};

/// A scheduled live session, read-only to the attendance pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Session identifier (unique within `kind`).
    pub id: SessionId,
    /// Session kind.
    pub kind: SessionKind,
    /// Owning academy.
    pub academy_id: Option<AcademyId>,
    /// Teacher running the session.
    pub teacher_id: Option<UserId>,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Scheduled start time.
    pub scheduled_at: DateTime<Utc>,
    /// Scheduled duration in minutes (None = academy default).
    pub duration_minutes: Option<i32>,
    /// Conferencing room name, once a meeting has been created.
    pub meeting_room_name: Option<String>,
    /// When the session row was created.
    pub created_at: DateTime<Utc>,
    /// When the session row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// The kind-qualified reference for this session.
    pub fn session_ref(&self) -> SessionRef {
        SessionRef::new(self.kind, self.id)
    }

    /// Scheduled duration, falling back to `default_minutes` when unset or
    /// non-positive.
    pub fn effective_duration_minutes(&self, default_minutes: i32) -> i32 {
        match self.duration_minutes {
            Some(d) if d > 0 => d,
            _ => default_minutes,
        }
    }

    /// Scheduled end time.
    pub fn scheduled_end(&self, default_minutes: i32) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.effective_duration_minutes(default_minutes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(duration: Option<i32>) -> Session {
        let at = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Session {
            id: SessionId::new(),
            kind: SessionKind::Academic,
            academy_id: None,
            teacher_id: None,
            status: SessionStatus::Completed,
            scheduled_at: at,
            duration_minutes: duration,
            meeting_room_name: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_missing_duration_uses_default() {
        let s = session(None);
        assert_eq!(s.effective_duration_minutes(60), 60);
        assert_eq!(s.scheduled_end(60), s.scheduled_at + Duration::minutes(60));
    }

    #[test]
    fn test_explicit_duration_wins() {
        assert_eq!(session(Some(45)).effective_duration_minutes(60), 45);
        assert_eq!(session(Some(0)).effective_duration_minutes(60), 60);
    }
}
