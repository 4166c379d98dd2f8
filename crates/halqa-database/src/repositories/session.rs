//! Session repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use halqa_core::error::{AppError, ErrorKind};
use halqa_core::result::AppResult;
use halqa_entity::session::{Session, SessionRef};

use crate::store::{CalculationWindow, SessionStore};

/// Read-only repository over the `sessions` table.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn find(&self, session: SessionRef) -> AppResult<Option<Session>> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE kind = $1 AND id = $2")
            .bind(session.kind)
            .bind(session.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find session", e))
    }

    async fn find_calculation_candidates(
        &self,
        window: &CalculationWindow,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions \
             WHERE status IN ('completed', 'ongoing') \
               AND scheduled_at >= $2 \
               AND scheduled_at + make_interval(mins => CASE WHEN duration_minutes > 0 THEN duration_minutes ELSE $3 END) <= $1 \
             ORDER BY scheduled_at ASC, id ASC \
             LIMIT $4 OFFSET $5",
        )
        .bind(window.ended_before)
        .bind(window.scheduled_after)
        .bind(window.default_duration_minutes)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list calculation candidates", e)
        })
    }

    async fn find_earnings_candidates(
        &self,
        scheduled_after: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT s.* FROM sessions s \
             WHERE s.status = 'completed' \
               AND s.teacher_id IS NOT NULL \
               AND s.scheduled_at >= $1 \
               AND NOT EXISTS (SELECT 1 FROM teacher_earnings e \
                               WHERE e.session_kind = s.kind AND e.session_id = s.id) \
               AND NOT EXISTS (SELECT 1 FROM meeting_attendances a \
                               WHERE a.session_kind = s.kind AND a.session_id = s.id \
                                 AND a.is_calculated = false) \
             ORDER BY s.scheduled_at ASC, s.id ASC \
             LIMIT $2 OFFSET $3",
        )
        .bind(scheduled_after)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list earnings candidates", e)
        })
    }
}
