//! Teacher earning repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use halqa_core::error::{AppError, ErrorKind};
use halqa_core::result::AppResult;
use halqa_entity::earning::{CreateTeacherEarning, TeacherEarning};
use halqa_entity::session::SessionRef;

use crate::store::EarningStore;

/// Repository for the teacher earnings ledger.
#[derive(Debug, Clone)]
pub struct EarningRepository {
    pool: PgPool,
}

impl EarningRepository {
    /// Create a new earning repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EarningStore for EarningRepository {
    async fn find_for_session(&self, session: SessionRef) -> AppResult<Option<TeacherEarning>> {
        sqlx::query_as::<_, TeacherEarning>(
            "SELECT * FROM teacher_earnings WHERE session_kind = $1 AND session_id = $2",
        )
        .bind(session.kind)
        .bind(session.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find earning", e))
    }

    async fn insert(&self, data: &CreateTeacherEarning) -> AppResult<Option<TeacherEarning>> {
        sqlx::query_as::<_, TeacherEarning>(
            "INSERT INTO teacher_earnings \
             (teacher_id, academy_id, session_kind, session_id, amount_cents, currency, calculated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (session_kind, session_id) DO NOTHING RETURNING *",
        )
        .bind(data.teacher_id)
        .bind(data.academy_id)
        .bind(data.session.kind)
        .bind(data.session.id)
        .bind(data.amount_cents)
        .bind(&data.currency)
        .bind(data.calculated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert earning", e))
    }
}
