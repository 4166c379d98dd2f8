use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use halqa_core::result::AppResult;
use halqa_core::types::UserId;
use halqa_entity::attendance::{
    AttendanceEvent, AttendanceVerdict, CreateAttendanceEvent, MeetingAttendance,
};
use halqa_entity::session::SessionRef;

use super::MemoryStore;
use crate::store::{AttendanceEventStore, MeetingAttendanceStore};

#[async_trait]
impl AttendanceEventStore for MemoryStore {
    async fn append(&self, data: &CreateAttendanceEvent) -> AppResult<Option<AttendanceEvent>> {
        let mut events = self.events.lock().await;
        if events.iter().any(|e| e.event_id == data.event_id) {
            return Ok(None);
        }

        let event = AttendanceEvent {
            id: Uuid::new_v4(),
            event_id: data.event_id.clone(),
            event_type: data.event_type,
            event_timestamp: data.event_timestamp,
            session_kind: data.session.kind,
            session_id: data.session.id,
            user_id: data.user_id,
            participant_sid: data.participant_sid.clone(),
            participant_name: data.participant_name.clone(),
            left_at: None,
            duration_minutes: None,
            termination_reason: None,
            created_at: data.event_timestamp,
        };
        events.push(event.clone());
        Ok(Some(event))
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<AttendanceEvent>> {
        Ok(self.events.lock().await.iter().find(|e| e.id == id).cloned())
    }

    async fn find_open_joins_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceEvent>> {
        let mut open: Vec<AttendanceEvent> = self
            .events
            .lock()
            .await
            .iter()
            .filter(|e| e.is_open() && e.event_timestamp < cutoff)
            .cloned()
            .collect();
        open.sort_by_key(|e| e.event_timestamp);
        Ok(open)
    }

    async fn close_orphaned(
        &self,
        id: Uuid,
        left_at: DateTime<Utc>,
        duration_minutes: i32,
        reason: &str,
    ) -> AppResult<bool> {
        let mut events = self.events.lock().await;
        match events.iter_mut().find(|e| e.id == id && e.is_open()) {
            Some(event) => {
                event.left_at = Some(left_at);
                event.duration_minutes = Some(duration_minutes);
                event.termination_reason = Some(reason.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn close_open_joins_for_participant(
        &self,
        session: SessionRef,
        user_id: UserId,
        participant_sid: &str,
        left_at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut closed = 0;
        for event in self.events.lock().await.iter_mut().filter(|e| {
            e.is_open()
                && e.session_ref() == session
                && e.user_id == user_id
                && e.participant_sid == participant_sid
                && e.event_timestamp <= left_at
        }) {
            let minutes = ((left_at - event.event_timestamp).num_seconds() as f64 / 60.0).round();
            event.left_at = Some(left_at);
            event.duration_minutes = Some(minutes.max(0.0) as i32);
            closed += 1;
        }
        Ok(closed)
    }
}

#[async_trait]
impl MeetingAttendanceStore for MemoryStore {
    async fn find(
        &self,
        session: SessionRef,
        user_id: UserId,
    ) -> AppResult<Option<MeetingAttendance>> {
        Ok(self
            .attendances
            .lock()
            .await
            .iter()
            .find(|r| r.session_ref() == session && r.user_id == user_id)
            .cloned())
    }

    async fn find_pending_for_session(
        &self,
        session: SessionRef,
    ) -> AppResult<Vec<MeetingAttendance>> {
        Ok(self
            .attendances
            .lock()
            .await
            .iter()
            .filter(|r| r.session_ref() == session && !r.is_calculated)
            .cloned()
            .collect())
    }

    async fn count_pending_for_session(&self, session: SessionRef) -> AppResult<i64> {
        let count = self
            .attendances
            .lock()
            .await
            .iter()
            .filter(|r| r.session_ref() == session && !r.is_calculated)
            .count();
        Ok(count as i64)
    }

    async fn save_pending(&self, record: &MeetingAttendance) -> AppResult<bool> {
        let mut rows = self.attendances.lock().await;
        match rows
            .iter_mut()
            .find(|r| r.session_ref() == record.session_ref() && r.user_id == record.user_id)
        {
            Some(existing) if existing.is_calculated => Ok(false),
            Some(existing) => {
                existing.first_join_time = record.first_join_time;
                existing.last_leave_time = record.last_leave_time;
                existing.join_leave_cycles = record.join_leave_cycles.clone();
                existing.updated_at = record.updated_at;
                Ok(true)
            }
            None => {
                rows.push(record.clone());
                Ok(true)
            }
        }
    }

    async fn finalize(
        &self,
        id: Uuid,
        verdict: &AttendanceVerdict,
        calculated_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut rows = self.attendances.lock().await;
        match rows.iter_mut().find(|r| r.id == id && !r.is_calculated) {
            Some(record) => {
                record.total_duration_minutes = verdict.total_duration_minutes;
                record.attendance_percentage = verdict.attendance_percentage;
                record.attendance_status = Some(verdict.attendance_status);
                record.is_calculated = true;
                record.attendance_calculated_at = Some(calculated_at);
                record.updated_at = calculated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
