//! Fixtures and fakes shared by the service tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use halqa_core::AppError;
use halqa_core::result::AppResult;
use halqa_core::traits::{CacheProvider, LiveRoomProvider};
use halqa_core::types::{AcademyId, SessionId, UserId};
use halqa_entity::attendance::{JoinLeaveCycle, MeetingAttendance, ParticipantRole};
use halqa_entity::session::{Session, SessionKind, SessionStatus};
use halqa_entity::user::User;

/// Fixed reference instant all fixtures are relative to.
pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// A completed Quran session starting `offset_minutes` after [`base_time`].
pub fn session_at(offset_minutes: i64, duration_minutes: Option<i32>) -> Session {
    let scheduled_at = base_time() + Duration::minutes(offset_minutes);
    let id = SessionId::new();
    Session {
        id,
        kind: SessionKind::Quran,
        academy_id: Some(AcademyId::new()),
        teacher_id: Some(UserId::new()),
        status: SessionStatus::Completed,
        scheduled_at,
        duration_minutes,
        meeting_room_name: Some(format!("room-{id}")),
        created_at: scheduled_at - Duration::days(1),
        updated_at: scheduled_at,
    }
}

/// `minutes` after the session's scheduled start.
pub fn minutes_after(session: &Session, minutes: i64) -> DateTime<Utc> {
    session.scheduled_at + Duration::minutes(minutes)
}

/// A presence interval in minutes relative to a session's start.
#[derive(Debug, Clone, Copy)]
pub struct RelativeCycle {
    start: i64,
    end: Option<i64>,
}

/// Shorthand for a [`RelativeCycle`].
pub fn cycle(start: i64, end: Option<i64>) -> RelativeCycle {
    RelativeCycle { start, end }
}

/// A pending student record built from relative cycles.
pub fn attendance_with_cycles(session: &Session, cycles: Vec<RelativeCycle>) -> MeetingAttendance {
    let mut record = MeetingAttendance::pending(
        session.session_ref(),
        UserId::new(),
        ParticipantRole::Student,
        session.scheduled_at,
    );

    for c in &cycles {
        let joined_at = minutes_after(session, c.start);
        let left_at = c.end.map(|m| minutes_after(session, m));
        record.join_leave_cycles.0.push(JoinLeaveCycle {
            joined_at,
            left_at,
            duration_minutes: left_at.map(|l| (l - joined_at).num_minutes() as i32),
        });
    }

    record.first_join_time = record.cycles().first().map(|c| c.joined_at);
    record.last_leave_time = record.cycles().last().and_then(|c| c.left_at);
    record
}

/// An active user.
pub fn user() -> User {
    User {
        id: UserId::new(),
        academy_id: None,
        display_name: "Participant".to_string(),
        is_active: true,
        created_at: base_time() - Duration::days(30),
    }
}

/// Scripted conferencing provider.
///
/// Rooms listed in `active` report their participants as connected; rooms in
/// `failing` return an error; everything else is gone.
#[derive(Debug, Default)]
pub struct FakeRooms {
    active: Mutex<HashMap<String, Vec<String>>>,
    failing: Mutex<Vec<String>>,
}

impl FakeRooms {
    pub fn with_participant(self, room: &str, sid: &str) -> Self {
        if let Ok(mut active) = self.active.lock() {
            active.entry(room.to_string()).or_default().push(sid.to_string());
        }
        self
    }

    pub fn with_failing_room(self, room: &str) -> Self {
        if let Ok(mut failing) = self.failing.lock() {
            failing.push(room.to_string());
        }
        self
    }
}

#[async_trait]
impl LiveRoomProvider for FakeRooms {
    async fn is_participant_active(&self, room_name: &str, participant_sid: &str) -> AppResult<bool> {
        if self.failing.lock().unwrap().iter().any(|r| r == room_name) {
            return Err(AppError::external_service("room service unavailable"));
        }
        Ok(self
            .active
            .lock()
            .unwrap()
            .get(room_name)
            .is_some_and(|sids| sids.iter().any(|s| s == participant_sid)))
    }
}

/// Cache that remembers which keys were invalidated.
#[derive(Debug, Default)]
pub struct TrackingCache {
    deleted: Mutex<Vec<String>>,
    unavailable: bool,
}

impl TrackingCache {
    /// A cache whose every call fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CacheProvider for TrackingCache {
    async fn delete(&self, key: &str) -> AppResult<()> {
        if self.unavailable {
            return Err(AppError::cache("cache unreachable"));
        }
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(!self.unavailable)
    }
}
