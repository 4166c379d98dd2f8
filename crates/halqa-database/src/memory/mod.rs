//! In-process implementation of every store trait.
//!
//! Each table is a `Vec` or `HashMap` behind a `tokio::sync::Mutex`, so the
//! conditional updates keep the same check-and-set semantics as their SQL
//! counterparts. Used by tests and by local runs without PostgreSQL.

mod attendance;
mod job;
mod ledger;
mod session;

use std::collections::HashMap;

use tokio::sync::Mutex;

use halqa_core::types::UserId;
use halqa_entity::attendance::{AttendanceEvent, MeetingAttendance};
use halqa_entity::earning::TeacherEarning;
use halqa_entity::job::Job;
use halqa_entity::report::SessionReport;
use halqa_entity::session::{Session, SessionRef};
use halqa_entity::user::User;

/// In-memory store backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<SessionRef, Session>>,
    users: Mutex<HashMap<UserId, User>>,
    events: Mutex<Vec<AttendanceEvent>>,
    attendances: Mutex<Vec<MeetingAttendance>>,
    reports: Mutex<HashMap<(SessionRef, UserId), SessionReport>>,
    earnings: Mutex<Vec<TeacherEarning>>,
    jobs: Mutex<Vec<Job>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a session.
    pub async fn insert_session(&self, session: Session) {
        self.sessions
            .lock()
            .await
            .insert(session.session_ref(), session);
    }

    /// Insert or replace a user.
    pub async fn insert_user(&self, user: User) {
        self.users.lock().await.insert(user.id, user);
    }

    /// Insert an attendance record as-is, replacing any record for the same
    /// participant.
    pub async fn insert_attendance(&self, record: MeetingAttendance) {
        let mut rows = self.attendances.lock().await;
        rows.retain(|r| {
            !(r.session_ref() == record.session_ref() && r.user_id == record.user_id)
        });
        rows.push(record);
    }

    /// Snapshot of all telemetry events.
    pub async fn events(&self) -> Vec<AttendanceEvent> {
        self.events.lock().await.clone()
    }

    /// Snapshot of all attendance records.
    pub async fn attendances(&self) -> Vec<MeetingAttendance> {
        self.attendances.lock().await.clone()
    }

    /// Snapshot of all report rows.
    pub async fn reports(&self) -> Vec<SessionReport> {
        self.reports.lock().await.values().cloned().collect()
    }

    /// Snapshot of all earnings.
    pub async fn earnings(&self) -> Vec<TeacherEarning> {
        self.earnings.lock().await.clone()
    }

    /// Snapshot of all jobs.
    pub async fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().await.clone()
    }
}
