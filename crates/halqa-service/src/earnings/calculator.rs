//! Earnings computation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use halqa_core::config::EarningsConfig;
use halqa_core::result::AppResult;
use halqa_database::store::{EarningStore, MeetingAttendanceStore};
use halqa_entity::earning::{CreateTeacherEarning, TeacherEarning};
use halqa_entity::session::{Session, SessionKind, SessionStatus};

/// Computes the earning a teacher is owed for a session.
///
/// Implementations own the "already paid" check: calling this twice for the
/// same session must never produce two earnings.
#[async_trait]
pub trait EarningsCalculator: Send + Sync + std::fmt::Debug {
    /// Record the session's earning if it is eligible. Returns `None` when
    /// the session is not eligible or already has one.
    async fn compute_earnings_for_session(
        &self,
        session: &Session,
        now: DateTime<Utc>,
    ) -> AppResult<Option<TeacherEarning>>;
}

/// Pays a fixed amount per session kind.
#[derive(Debug, Clone)]
pub struct FlatRateEarningsCalculator {
    attendances: Arc<dyn MeetingAttendanceStore>,
    earnings: Arc<dyn EarningStore>,
    config: EarningsConfig,
}

impl FlatRateEarningsCalculator {
    /// Create a new flat-rate calculator.
    pub fn new(
        attendances: Arc<dyn MeetingAttendanceStore>,
        earnings: Arc<dyn EarningStore>,
        config: EarningsConfig,
    ) -> Self {
        Self {
            attendances,
            earnings,
            config,
        }
    }

    fn rate_cents(&self, kind: SessionKind) -> i64 {
        match kind {
            SessionKind::Quran => self.config.quran_session_rate_cents,
            SessionKind::Academic => self.config.academic_session_rate_cents,
        }
    }
}

#[async_trait]
impl EarningsCalculator for FlatRateEarningsCalculator {
    async fn compute_earnings_for_session(
        &self,
        session: &Session,
        now: DateTime<Utc>,
    ) -> AppResult<Option<TeacherEarning>> {
        if session.status != SessionStatus::Completed {
            debug!(session_id = %session.id, status = ?session.status, "Session not completed");
            return Ok(None);
        }

        let Some(teacher_id) = session.teacher_id else {
            debug!(session_id = %session.id, "Session has no teacher");
            return Ok(None);
        };

        let pending = self
            .attendances
            .count_pending_for_session(session.session_ref())
            .await?;
        if pending > 0 {
            debug!(session_id = %session.id, pending, "Attendance not finalized yet");
            return Ok(None);
        }

        if self
            .earnings
            .find_for_session(session.session_ref())
            .await?
            .is_some()
        {
            return Ok(None);
        }

        self.earnings
            .insert(&CreateTeacherEarning {
                teacher_id,
                academy_id: session.academy_id,
                session: session.session_ref(),
                amount_cents: self.rate_cents(session.kind),
                currency: self.config.currency.clone(),
                calculated_at: now,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use halqa_database::MemoryStore;
    use halqa_entity::session::SessionStatus;

    use super::*;
    use crate::testing::{attendance_with_cycles, cycle, session_at};

    fn calculator(store: &Arc<MemoryStore>) -> FlatRateEarningsCalculator {
        FlatRateEarningsCalculator::new(store.clone(), store.clone(), EarningsConfig::default())
    }

    #[tokio::test]
    async fn test_completed_session_earns_flat_rate() {
        let store = Arc::new(MemoryStore::new());
        let mut session = session_at(0, Some(60));
        session.kind = SessionKind::Academic;

        let earning = calculator(&store)
            .compute_earnings_for_session(&session, session.scheduled_at)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(earning.amount_cents, 7500);
        assert_eq!(earning.currency, "SAR");
        assert_eq!(Some(earning.teacher_id), session.teacher_id);
    }

    #[tokio::test]
    async fn test_second_call_does_not_duplicate() {
        let store = Arc::new(MemoryStore::new());
        let session = session_at(0, Some(60));
        let calculator = calculator(&store);

        let first = calculator.compute_earnings_for_session(&session, session.scheduled_at).await.unwrap();
        let second = calculator.compute_earnings_for_session(&session, session.scheduled_at).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(store.earnings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_pending_attendance_blocks_earning() {
        let store = Arc::new(MemoryStore::new());
        let session = session_at(0, Some(60));
        store
            .insert_attendance(attendance_with_cycles(&session, vec![cycle(0, Some(60))]))
            .await;

        let earning = calculator(&store)
            .compute_earnings_for_session(&session, session.scheduled_at)
            .await
            .unwrap();

        assert!(earning.is_none());
    }

    #[tokio::test]
    async fn test_unfinished_or_unassigned_sessions_are_not_eligible() {
        let store = Arc::new(MemoryStore::new());
        let calculator = calculator(&store);

        let mut ongoing = session_at(0, Some(60));
        ongoing.status = SessionStatus::Ongoing;
        let mut no_teacher = session_at(0, Some(60));
        no_teacher.teacher_id = None;

        for session in [ongoing, no_teacher] {
            let earning = calculator
                .compute_earnings_for_session(&session, session.scheduled_at)
                .await
                .unwrap();
            assert!(earning.is_none());
        }
    }
}
