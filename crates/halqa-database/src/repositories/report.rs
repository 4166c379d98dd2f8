//! Session report repository implementation.
//!
//! Quran and academic reports share a row shape but live in separate tables;
//! the session kind picks the table.

use async_trait::async_trait;
use sqlx::PgPool;

use halqa_core::error::{AppError, ErrorKind};
use halqa_core::result::AppResult;
use halqa_core::types::UserId;
use halqa_entity::report::{SessionReport, UpsertSessionReport};
use halqa_entity::session::SessionRef;

use crate::store::ReportStore;

/// Repository for per-kind session reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    /// Create a new report repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for ReportRepository {
    async fn upsert(&self, data: &UpsertSessionReport) -> AppResult<SessionReport> {
        let sql = format!(
            "INSERT INTO {table} \
             (session_id, student_id, teacher_id, academy_id, meeting_enter_time, \
              meeting_leave_time, actual_attendance_minutes, attendance_status, \
              attendance_percentage, is_late, late_minutes, is_calculated, evaluated_at, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, TRUE, $12, $12, $12) \
             ON CONFLICT (session_id, student_id) DO UPDATE SET \
                teacher_id = EXCLUDED.teacher_id, \
                academy_id = EXCLUDED.academy_id, \
                meeting_enter_time = EXCLUDED.meeting_enter_time, \
                meeting_leave_time = EXCLUDED.meeting_leave_time, \
                actual_attendance_minutes = EXCLUDED.actual_attendance_minutes, \
                attendance_status = EXCLUDED.attendance_status, \
                attendance_percentage = EXCLUDED.attendance_percentage, \
                is_late = EXCLUDED.is_late, \
                late_minutes = EXCLUDED.late_minutes, \
                is_calculated = TRUE, \
                evaluated_at = EXCLUDED.evaluated_at, \
                updated_at = EXCLUDED.updated_at \
             RETURNING *",
            table = data.session.kind.report_table()
        );

        sqlx::query_as::<_, SessionReport>(&sql)
            .bind(data.session.id)
            .bind(data.student_id)
            .bind(data.teacher_id)
            .bind(data.academy_id)
            .bind(data.meeting_enter_time)
            .bind(data.meeting_leave_time)
            .bind(data.actual_attendance_minutes)
            .bind(data.attendance_status)
            .bind(data.attendance_percentage)
            .bind(data.is_late)
            .bind(data.late_minutes)
            .bind(data.evaluated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to upsert session report", e)
            })
    }

    async fn find(
        &self,
        session: SessionRef,
        student_id: UserId,
    ) -> AppResult<Option<SessionReport>> {
        let sql = format!(
            "SELECT * FROM {} WHERE session_id = $1 AND student_id = $2",
            session.kind.report_table()
        );

        sqlx::query_as::<_, SessionReport>(&sql)
            .bind(session.id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find session report", e)
            })
    }
}
