//! Store traits the attendance pipeline is written against.
//!
//! Each trait has a PostgreSQL implementation in [`crate::repositories`] and
//! an in-process implementation on [`crate::memory::MemoryStore`]. Every
//! write that guards an idempotence flag is a single conditional update and
//! reports whether it took effect.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use async_trait::async_trait;

use halqa_core::result::AppResult;
use halqa_core::types::UserId;
use halqa_entity::attendance::{
    AttendanceEvent, AttendanceVerdict, CreateAttendanceEvent, MeetingAttendance,
};
use halqa_entity::earning::{CreateTeacherEarning, TeacherEarning};
use halqa_entity::job::{CreateJob, ExpiredJobs, Job, JobStatus};
use halqa_entity::report::{SessionReport, UpsertSessionReport};
use halqa_entity::session::{Session, SessionRef};
use halqa_entity::user::User;

/// Append-only log of raw join/leave telemetry.
#[async_trait]
pub trait AttendanceEventStore: Send + Sync + std::fmt::Debug {
    /// Append an event. Returns `None` when `event_id` was already recorded.
    async fn append(&self, data: &CreateAttendanceEvent) -> AppResult<Option<AttendanceEvent>>;

    /// Find a single event by row id.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<AttendanceEvent>>;

    /// All join events with no `left_at` whose timestamp is before `cutoff`,
    /// oldest first.
    async fn find_open_joins_before(&self, cutoff: DateTime<Utc>)
    -> AppResult<Vec<AttendanceEvent>>;

    /// Close an open join synthetically. Returns `false` when the event was
    /// already closed.
    async fn close_orphaned(
        &self,
        id: Uuid,
        left_at: DateTime<Utc>,
        duration_minutes: i32,
        reason: &str,
    ) -> AppResult<bool>;

    /// Close the open join(s) for a participant connection when its leave
    /// webhook arrives. Returns the number of events closed.
    async fn close_open_joins_for_participant(
        &self,
        session: SessionRef,
        user_id: UserId,
        participant_sid: &str,
        left_at: DateTime<Utc>,
    ) -> AppResult<u64>;
}

/// Per-(session, user) attendance records.
#[async_trait]
pub trait MeetingAttendanceStore: Send + Sync + std::fmt::Debug {
    /// Find the record for a participant.
    async fn find(&self, session: SessionRef, user_id: UserId)
    -> AppResult<Option<MeetingAttendance>>;

    /// Records of a session not yet finalized.
    async fn find_pending_for_session(&self, session: SessionRef)
    -> AppResult<Vec<MeetingAttendance>>;

    /// Number of records of a session not yet finalized.
    async fn count_pending_for_session(&self, session: SessionRef) -> AppResult<i64>;

    /// Insert or update the join/leave bookkeeping of a pending record.
    /// Returns `false` when the stored record is already finalized.
    async fn save_pending(&self, record: &MeetingAttendance) -> AppResult<bool>;

    /// Write the verdict and set `is_calculated`, only if the record is still
    /// pending. Returns whether this call finalized it.
    async fn finalize(
        &self,
        id: Uuid,
        verdict: &AttendanceVerdict,
        calculated_at: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// Selection window for sessions that are due for attendance calculation.
#[derive(Debug, Clone, Copy)]
pub struct CalculationWindow {
    /// Scheduled end (start + duration) must be at or before this instant.
    pub ended_before: DateTime<Utc>,
    /// Scheduled start must be at or after this instant.
    pub scheduled_after: DateTime<Utc>,
    /// Duration assumed when a session has none.
    pub default_duration_minutes: i32,
}

/// Read access to scheduled sessions.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Fetch a session by its kind-qualified reference.
    async fn find(&self, session: SessionRef) -> AppResult<Option<Session>>;

    /// Completed or ongoing sessions inside `window`, ordered by start time.
    async fn find_calculation_candidates(
        &self,
        window: &CalculationWindow,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Session>>;

    /// Completed sessions with a teacher, scheduled at or after
    /// `scheduled_after`, that have no earning and no pending attendance.
    /// Ordered by start time.
    async fn find_earnings_candidates(
        &self,
        scheduled_after: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Session>>;
}

/// Per-kind attendance reports.
#[async_trait]
pub trait ReportStore: Send + Sync + std::fmt::Debug {
    /// Create or update the report row for (session, student) and mark it
    /// calculated.
    async fn upsert(&self, data: &UpsertSessionReport) -> AppResult<SessionReport>;

    /// Find the report row for a student.
    async fn find(&self, session: SessionRef, student_id: UserId)
    -> AppResult<Option<SessionReport>>;
}

/// Read access to users.
#[async_trait]
pub trait UserStore: Send + Sync + std::fmt::Debug {
    /// Fetch a user by ID.
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>>;
}

/// Teacher earnings ledger.
#[async_trait]
pub trait EarningStore: Send + Sync + std::fmt::Debug {
    /// The earning recorded for a session, if any.
    async fn find_for_session(&self, session: SessionRef) -> AppResult<Option<TeacherEarning>>;

    /// Record an earning. Returns `None` when the session already has one.
    async fn insert(&self, data: &CreateTeacherEarning) -> AppResult<Option<TeacherEarning>>;
}

/// Persistent job queue.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug {
    /// Create a pending job.
    async fn create(&self, data: &CreateJob, now: DateTime<Utc>) -> AppResult<Job>;

    /// Find a job by ID.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Job>>;

    /// Claim the next due job of `queue`, mark it running, and count the
    /// attempt.
    async fn claim_next(
        &self,
        queue: &str,
        worker_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Job>>;

    /// Mark a job completed.
    async fn complete(
        &self,
        id: Uuid,
        result: Option<&serde_json::Value>,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Mark a job failed for good.
    async fn fail(&self, id: Uuid, error_message: &str, now: DateTime<Utc>) -> AppResult<()>;

    /// Put a job back to pending, not claimable before `run_at`.
    async fn reschedule(
        &self,
        id: Uuid,
        error_message: &str,
        run_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Count jobs in a status.
    async fn count_by_status(&self, status: JobStatus) -> AppResult<i64>;

    /// Recover running jobs claimed before `started_before`. Jobs with
    /// attempts left become due at `now`; the rest are failed.
    async fn requeue_expired(
        &self,
        started_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<ExpiredJobs>;

    /// Delete completed and failed jobs last updated before `before`.
    async fn purge_finished(&self, before: DateTime<Utc>) -> AppResult<u64>;
}
