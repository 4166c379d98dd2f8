//! Live join/leave bookkeeping on meeting attendance records.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use halqa_cache::keys;
use halqa_core::result::AppResult;
use halqa_core::traits::CacheProvider;
use halqa_database::store::MeetingAttendanceStore;
use halqa_entity::attendance::{JoinLeaveCycle, MeetingAttendance, ParticipantRole};
use halqa_entity::session::Session;
use halqa_entity::user::User;

/// Records a participant joining or leaving a live session.
///
/// Both operations return `Ok(false)` when the change was refused (for
/// example the record is already final) and `Err` when a store failed.
#[async_trait]
pub trait AttendanceRecorder: Send + Sync + std::fmt::Debug {
    /// Record a join at `at`.
    async fn handle_join(&self, session: &Session, user: &User, at: DateTime<Utc>) -> AppResult<bool>;

    /// Record a leave at `at`.
    async fn handle_leave(&self, session: &Session, user: &User, at: DateTime<Utc>) -> AppResult<bool>;
}

/// [`AttendanceRecorder`] that maintains join/leave cycles on
/// [`MeetingAttendance`] records.
#[derive(Debug, Clone)]
pub struct MeetingAttendanceRecorder {
    attendances: Arc<dyn MeetingAttendanceStore>,
    cache: Arc<dyn CacheProvider>,
}

impl MeetingAttendanceRecorder {
    /// Create a new recorder.
    pub fn new(attendances: Arc<dyn MeetingAttendanceStore>, cache: Arc<dyn CacheProvider>) -> Self {
        Self { attendances, cache }
    }

    async fn save(&self, record: &MeetingAttendance) -> AppResult<bool> {
        if !self.attendances.save_pending(record).await? {
            warn!(
                session_id = %record.session_id,
                user_id = %record.user_id,
                "Attendance finalized while recording, change dropped"
            );
            return Ok(false);
        }

        self.cache
            .delete(&keys::attendance_status(record.session_id, record.user_id))
            .await?;
        Ok(true)
    }
}

fn role_of(session: &Session, user: &User) -> ParticipantRole {
    if session.teacher_id == Some(user.id) {
        ParticipantRole::Teacher
    } else {
        ParticipantRole::Student
    }
}

#[async_trait]
impl AttendanceRecorder for MeetingAttendanceRecorder {
    async fn handle_join(&self, session: &Session, user: &User, at: DateTime<Utc>) -> AppResult<bool> {
        let mut record = match self.attendances.find(session.session_ref(), user.id).await? {
            Some(record) => record,
            None => MeetingAttendance::pending(session.session_ref(), user.id, role_of(session, user), at),
        };

        if record.is_calculated {
            warn!(session_id = %session.id, user_id = %user.id, "Join after attendance was finalized");
            return Ok(false);
        }

        if record.has_open_cycle() {
            debug!(session_id = %session.id, user_id = %user.id, "Join while already connected");
            return Ok(true);
        }

        record.join_leave_cycles.0.push(JoinLeaveCycle::open(at));
        record.first_join_time = Some(record.first_join_time.map_or(at, |first| first.min(at)));
        record.updated_at = at;

        self.save(&record).await
    }

    async fn handle_leave(&self, session: &Session, user: &User, at: DateTime<Utc>) -> AppResult<bool> {
        let Some(mut record) = self.attendances.find(session.session_ref(), user.id).await? else {
            warn!(session_id = %session.id, user_id = %user.id, "Leave without attendance record");
            return Ok(false);
        };

        if record.is_calculated {
            warn!(session_id = %session.id, user_id = %user.id, "Leave after attendance was finalized");
            return Ok(false);
        }

        let Some(cycle) = record.join_leave_cycles.0.last_mut().filter(|c| c.is_open()) else {
            warn!(session_id = %session.id, user_id = %user.id, "Leave without an open cycle");
            return Ok(false);
        };

        let left_at = at.max(cycle.joined_at);
        let minutes = ((left_at - cycle.joined_at).num_seconds() as f64 / 60.0).round() as i32;
        cycle.left_at = Some(left_at);
        cycle.duration_minutes = Some(minutes);
        record.last_leave_time = Some(left_at);
        record.updated_at = at;

        self.save(&record).await
    }
}
