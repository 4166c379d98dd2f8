//! Meeting attendance repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use halqa_core::error::{AppError, ErrorKind};
use halqa_core::result::AppResult;
use halqa_core::types::UserId;
use halqa_entity::attendance::{AttendanceVerdict, MeetingAttendance};
use halqa_entity::session::SessionRef;

use crate::store::MeetingAttendanceStore;

/// Repository for per-participant attendance records.
#[derive(Debug, Clone)]
pub struct MeetingAttendanceRepository {
    pool: PgPool,
}

impl MeetingAttendanceRepository {
    /// Create a new meeting attendance repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MeetingAttendanceStore for MeetingAttendanceRepository {
    async fn find(
        &self,
        session: SessionRef,
        user_id: UserId,
    ) -> AppResult<Option<MeetingAttendance>> {
        sqlx::query_as::<_, MeetingAttendance>(
            "SELECT * FROM meeting_attendances \
             WHERE session_kind = $1 AND session_id = $2 AND user_id = $3",
        )
        .bind(session.kind)
        .bind(session.id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find meeting attendance", e)
        })
    }

    async fn find_pending_for_session(
        &self,
        session: SessionRef,
    ) -> AppResult<Vec<MeetingAttendance>> {
        sqlx::query_as::<_, MeetingAttendance>(
            "SELECT * FROM meeting_attendances \
             WHERE session_kind = $1 AND session_id = $2 AND is_calculated = FALSE \
             ORDER BY created_at ASC",
        )
        .bind(session.kind)
        .bind(session.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list pending attendance", e)
        })
    }

    async fn count_pending_for_session(&self, session: SessionRef) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM meeting_attendances \
             WHERE session_kind = $1 AND session_id = $2 AND is_calculated = FALSE",
        )
        .bind(session.kind)
        .bind(session.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count pending attendance", e)
        })
    }

    async fn save_pending(&self, record: &MeetingAttendance) -> AppResult<bool> {
        let result = sqlx::query(
            "INSERT INTO meeting_attendances \
             (id, session_kind, session_id, user_id, user_role, first_join_time, \
              last_leave_time, join_leave_cycles, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (session_kind, session_id, user_id) DO UPDATE SET \
                first_join_time = EXCLUDED.first_join_time, \
                last_leave_time = EXCLUDED.last_leave_time, \
                join_leave_cycles = EXCLUDED.join_leave_cycles, \
                updated_at = EXCLUDED.updated_at \
             WHERE meeting_attendances.is_calculated = FALSE",
        )
        .bind(record.id)
        .bind(record.session_kind)
        .bind(record.session_id)
        .bind(record.user_id)
        .bind(record.user_role)
        .bind(record.first_join_time)
        .bind(record.last_leave_time)
        .bind(&record.join_leave_cycles)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to save meeting attendance", e)
        })?;
        Ok(result.rows_affected() == 1)
    }

    async fn finalize(
        &self,
        id: Uuid,
        verdict: &AttendanceVerdict,
        calculated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE meeting_attendances SET \
                total_duration_minutes = $2, attendance_percentage = $3, \
                attendance_status = $4, is_calculated = TRUE, \
                attendance_calculated_at = $5, updated_at = $5 \
             WHERE id = $1 AND is_calculated = FALSE",
        )
        .bind(id)
        .bind(verdict.total_duration_minutes)
        .bind(verdict.attendance_percentage)
        .bind(verdict.attendance_status)
        .bind(calculated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to finalize meeting attendance", e)
        })?;
        Ok(result.rows_affected() == 1)
    }
}
