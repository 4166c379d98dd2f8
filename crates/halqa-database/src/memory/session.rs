use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use halqa_core::result::AppResult;
use halqa_core::types::UserId;
use halqa_entity::session::{Session, SessionRef, SessionStatus};
use halqa_entity::user::User;

use super::MemoryStore;
use crate::store::{CalculationWindow, SessionStore, UserStore};

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find(&self, session: SessionRef) -> AppResult<Option<Session>> {
        Ok(self.sessions.lock().await.get(&session).cloned())
    }

    async fn find_calculation_candidates(
        &self,
        window: &CalculationWindow,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Session>> {
        let sessions = self.sessions.lock().await;
        let mut matches: Vec<Session> = sessions
            .values()
            .filter(|s| matches!(s.status, SessionStatus::Completed | SessionStatus::Ongoing))
            .filter(|s| s.scheduled_at >= window.scheduled_after)
            .filter(|s| s.scheduled_end(window.default_duration_minutes) <= window.ended_before)
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(matches
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_earnings_candidates(
        &self,
        scheduled_after: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Session>> {
        let paid: HashSet<SessionRef> = self
            .earnings
            .lock()
            .await
            .iter()
            .map(|e| e.session_ref())
            .collect();
        let unfinished: HashSet<SessionRef> = self
            .attendances
            .lock()
            .await
            .iter()
            .filter(|a| !a.is_calculated)
            .map(|a| a.session_ref())
            .collect();

        let sessions = self.sessions.lock().await;
        let mut matches: Vec<Session> = sessions
            .values()
            .filter(|s| s.status == SessionStatus::Completed && s.teacher_id.is_some())
            .filter(|s| s.scheduled_at >= scheduled_after)
            .filter(|s| !paid.contains(&s.session_ref()) && !unfinished.contains(&s.session_ref()))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        Ok(matches
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.users.lock().await.get(&id).cloned())
    }
}
