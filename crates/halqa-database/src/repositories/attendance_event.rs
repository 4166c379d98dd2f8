//! Attendance event repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use halqa_core::error::{AppError, ErrorKind};
use halqa_core::result::AppResult;
use halqa_core::types::UserId;
use halqa_entity::attendance::{AttendanceEvent, CreateAttendanceEvent};
use halqa_entity::session::SessionRef;

use crate::store::AttendanceEventStore;

/// Repository for raw join/leave telemetry.
#[derive(Debug, Clone)]
pub struct AttendanceEventRepository {
    pool: PgPool,
}

impl AttendanceEventRepository {
    /// Create a new attendance event repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttendanceEventStore for AttendanceEventRepository {
    async fn append(&self, data: &CreateAttendanceEvent) -> AppResult<Option<AttendanceEvent>> {
        sqlx::query_as::<_, AttendanceEvent>(
            "INSERT INTO attendance_events \
             (event_id, event_type, event_timestamp, session_kind, session_id, user_id, \
              participant_sid, participant_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (event_id) DO NOTHING RETURNING *",
        )
        .bind(&data.event_id)
        .bind(data.event_type)
        .bind(data.event_timestamp)
        .bind(data.session.kind)
        .bind(data.session.id)
        .bind(data.user_id)
        .bind(&data.participant_sid)
        .bind(&data.participant_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to append attendance event", e)
        })
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<AttendanceEvent>> {
        sqlx::query_as::<_, AttendanceEvent>("SELECT * FROM attendance_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find attendance event", e)
            })
    }

    async fn find_open_joins_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceEvent>> {
        sqlx::query_as::<_, AttendanceEvent>(
            "SELECT * FROM attendance_events \
             WHERE event_type = 'join' AND left_at IS NULL AND event_timestamp < $1 \
             ORDER BY event_timestamp ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find orphaned join events", e)
        })
    }

    async fn close_orphaned(
        &self,
        id: Uuid,
        left_at: DateTime<Utc>,
        duration_minutes: i32,
        reason: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE attendance_events \
             SET left_at = $2, duration_minutes = $3, termination_reason = $4 \
             WHERE id = $1 AND event_type = 'join' AND left_at IS NULL",
        )
        .bind(id)
        .bind(left_at)
        .bind(duration_minutes)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to close orphaned join event", e)
        })?;
        Ok(result.rows_affected() == 1)
    }

    async fn close_open_joins_for_participant(
        &self,
        session: SessionRef,
        user_id: UserId,
        participant_sid: &str,
        left_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE attendance_events \
             SET left_at = $5, \
                 duration_minutes = GREATEST(0, ROUND(EXTRACT(EPOCH FROM ($5 - event_timestamp)) / 60))::INTEGER \
             WHERE session_kind = $1 AND session_id = $2 AND user_id = $3 \
               AND participant_sid = $4 AND event_type = 'join' AND left_at IS NULL \
               AND event_timestamp <= $5",
        )
        .bind(session.kind)
        .bind(session.id)
        .bind(user_id)
        .bind(participant_sid)
        .bind(left_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to close participant join events", e)
        })?;
        Ok(result.rows_affected())
    }
}
