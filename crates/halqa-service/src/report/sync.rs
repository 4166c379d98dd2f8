//! Report synchronizer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use halqa_core::result::AppResult;
use halqa_database::store::ReportStore;
use halqa_entity::attendance::{AttendanceVerdict, MeetingAttendance, ParticipantRole};
use halqa_entity::report::{SessionReport, UpsertSessionReport};
use halqa_entity::session::Session;

/// Mirrors a freshly finalized verdict into the session kind's report table.
#[derive(Debug, Clone)]
pub struct ReportSynchronizer {
    reports: Arc<dyn ReportStore>,
}

impl ReportSynchronizer {
    /// Create a new report synchronizer.
    pub fn new(reports: Arc<dyn ReportStore>) -> Self {
        Self { reports }
    }

    /// Create or update the student's report row.
    ///
    /// Only students have report rows; teacher records return `Ok(None)`.
    pub async fn sync(
        &self,
        session: &Session,
        record: &MeetingAttendance,
        verdict: &AttendanceVerdict,
        now: DateTime<Utc>,
    ) -> AppResult<Option<SessionReport>> {
        if record.user_role != ParticipantRole::Student {
            return Ok(None);
        }

        let data = UpsertSessionReport {
            session: session.session_ref(),
            student_id: record.user_id,
            teacher_id: session.teacher_id,
            academy_id: session.academy_id,
            meeting_enter_time: record.first_join_time,
            meeting_leave_time: record.last_leave_time,
            actual_attendance_minutes: verdict.total_duration_minutes,
            attendance_status: verdict.attendance_status,
            attendance_percentage: verdict.attendance_percentage,
            is_late: verdict.is_late,
            late_minutes: verdict.late_minutes,
            evaluated_at: now,
        };

        let report = self.reports.upsert(&data).await?;

        debug!(
            session_id = %session.id,
            session_kind = %session.kind,
            user_id = %record.user_id,
            status = %verdict.attendance_status,
            "Synced attendance to session report"
        );

        Ok(Some(report))
    }
}
