use async_trait::async_trait;
use uuid::Uuid;

use halqa_core::result::AppResult;
use halqa_core::types::UserId;
use halqa_entity::earning::{CreateTeacherEarning, TeacherEarning};
use halqa_entity::report::{SessionReport, UpsertSessionReport};
use halqa_entity::session::SessionRef;

use super::MemoryStore;
use crate::store::{EarningStore, ReportStore};

#[async_trait]
impl ReportStore for MemoryStore {
    async fn upsert(&self, data: &UpsertSessionReport) -> AppResult<SessionReport> {
        let mut reports = self.reports.lock().await;
        let key = (data.session, data.student_id);
        let (id, created_at) = match reports.get(&key) {
            Some(existing) => (existing.id, existing.created_at),
            None => (Uuid::new_v4(), data.evaluated_at),
        };

        let report = SessionReport {
            id,
            session_id: data.session.id,
            student_id: data.student_id,
            teacher_id: data.teacher_id,
            academy_id: data.academy_id,
            meeting_enter_time: data.meeting_enter_time,
            meeting_leave_time: data.meeting_leave_time,
            actual_attendance_minutes: data.actual_attendance_minutes,
            attendance_status: data.attendance_status,
            attendance_percentage: data.attendance_percentage,
            is_late: data.is_late,
            late_minutes: data.late_minutes,
            is_calculated: true,
            evaluated_at: Some(data.evaluated_at),
            created_at,
            updated_at: data.evaluated_at,
        };
        reports.insert(key, report.clone());
        Ok(report)
    }

    async fn find(
        &self,
        session: SessionRef,
        student_id: UserId,
    ) -> AppResult<Option<SessionReport>> {
        Ok(self.reports.lock().await.get(&(session, student_id)).cloned())
    }
}

#[async_trait]
impl EarningStore for MemoryStore {
    async fn find_for_session(&self, session: SessionRef) -> AppResult<Option<TeacherEarning>> {
        Ok(self
            .earnings
            .lock()
            .await
            .iter()
            .find(|e| e.session_ref() == session)
            .cloned())
    }

    async fn insert(&self, data: &CreateTeacherEarning) -> AppResult<Option<TeacherEarning>> {
        let mut earnings = self.earnings.lock().await;
        if earnings.iter().any(|e| e.session_ref() == data.session) {
            return Ok(None);
        }

        let earning = TeacherEarning {
            id: Uuid::new_v4(),
            teacher_id: data.teacher_id,
            academy_id: data.academy_id,
            session_kind: data.session.kind,
            session_id: data.session.id,
            amount_cents: data.amount_cents,
            currency: data.currency.clone(),
            calculated_at: data.calculated_at,
        };
        earnings.push(earning.clone());
        Ok(Some(earning))
    }
}
