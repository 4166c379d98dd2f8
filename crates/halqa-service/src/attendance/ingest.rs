//! Telemetry ingestion for conferencing webhooks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use halqa_core::result::AppResult;
use halqa_database::store::{AttendanceEventStore, SessionStore, UserStore};
use halqa_entity::attendance::{AttendanceEvent, AttendanceOperation, CreateAttendanceEvent, EventType};

use crate::recording::{AttendanceRecorder, RecordingRetryScheduler};

/// Appends join/leave facts to the event log and forwards them to the
/// attendance recorder.
#[derive(Debug, Clone)]
pub struct AttendanceEventService {
    events: Arc<dyn AttendanceEventStore>,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    recorder: Arc<dyn AttendanceRecorder>,
    retries: Arc<dyn RecordingRetryScheduler>,
}

impl AttendanceEventService {
    /// Create a new event service.
    pub fn new(
        events: Arc<dyn AttendanceEventStore>,
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        recorder: Arc<dyn AttendanceRecorder>,
        retries: Arc<dyn RecordingRetryScheduler>,
    ) -> Self {
        Self {
            events,
            sessions,
            users,
            recorder,
            retries,
        }
    }

    /// Record one webhook event.
    ///
    /// Redelivered events (same provider event id) are ignored and return
    /// `None`. A leave event closes the participant connection's open join.
    /// The join or leave is then applied to the meeting attendance record;
    /// when the recorder refuses or fails, a retry is scheduled and the
    /// event still counts as recorded.
    pub async fn record(
        &self,
        data: &CreateAttendanceEvent,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AttendanceEvent>> {
        let Some(event) = self.events.append(data).await? else {
            debug!(event_id = %data.event_id, "Duplicate attendance event ignored");
            return Ok(None);
        };

        if event.event_type == EventType::Leave {
            let closed = self
                .events
                .close_open_joins_for_participant(
                    data.session,
                    data.user_id,
                    &data.participant_sid,
                    data.event_timestamp,
                )
                .await?;
            debug!(
                session_id = %data.session.id,
                user_id = %data.user_id,
                participant_sid = %data.participant_sid,
                closed,
                "Closed join events on leave"
            );
        }

        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            session_id = %event.session_id,
            user_id = %event.user_id,
            "Attendance event recorded"
        );

        self.apply(data, now).await?;
        Ok(Some(event))
    }

    async fn apply(&self, data: &CreateAttendanceEvent, now: DateTime<Utc>) -> AppResult<()> {
        let operation = match data.event_type {
            EventType::Join => AttendanceOperation::Join,
            EventType::Leave => AttendanceOperation::Leave,
        };

        let Some(session) = self.sessions.find(data.session).await? else {
            warn!(
                session_id = %data.session.id,
                session_kind = %data.session.kind,
                "Attendance event for unknown session, not recorded"
            );
            return Ok(());
        };
        let Some(user) = self.users.find_by_id(data.user_id).await? else {
            warn!(
                session_id = %data.session.id,
                user_id = %data.user_id,
                "Attendance event for unknown user, not recorded"
            );
            return Ok(());
        };

        let result = match operation {
            AttendanceOperation::Join => {
                self.recorder.handle_join(&session, &user, data.event_timestamp).await
            }
            AttendanceOperation::Leave => {
                self.recorder.handle_leave(&session, &user, data.event_timestamp).await
            }
        };

        match result {
            Ok(true) => return Ok(()),
            Ok(false) => warn!(
                session_id = %session.id,
                user_id = %user.id,
                operation = %operation,
                "Attendance recording rejected, scheduling retry"
            ),
            Err(e) => warn!(
                session_id = %session.id,
                user_id = %user.id,
                operation = %operation,
                error = %e,
                "Attendance recording failed, scheduling retry"
            ),
        }

        if let Err(e) = self
            .retries
            .schedule(data.session, data.user_id, operation, now)
            .await
        {
            error!(
                session_id = %session.id,
                user_id = %user.id,
                operation = %operation,
                error = %e,
                "Failed to schedule attendance recording retry"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use halqa_core::AppError;
    use halqa_core::types::{SessionId, UserId};
    use halqa_database::MemoryStore;
    use halqa_entity::session::{Session, SessionKind, SessionRef};
    use halqa_entity::user::User;

    use super::*;
    use crate::recording::MeetingAttendanceRecorder;
    use crate::testing::{TrackingCache, base_time, session_at, user};

    type Scheduled = (SessionRef, UserId, AttendanceOperation, DateTime<Utc>);

    /// Scheduler that remembers what it was asked to retry.
    #[derive(Debug, Default)]
    struct RecordedRetries {
        scheduled: Mutex<Vec<Scheduled>>,
    }

    impl RecordedRetries {
        fn scheduled(&self) -> Vec<Scheduled> {
            self.scheduled.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordingRetryScheduler for RecordedRetries {
        async fn schedule(
            &self,
            session: SessionRef,
            user_id: UserId,
            operation: AttendanceOperation,
            now: DateTime<Utc>,
        ) -> AppResult<()> {
            self.scheduled.lock().unwrap().push((session, user_id, operation, now));
            Ok(())
        }
    }

    /// Recorder that always fails and counts calls.
    #[derive(Debug, Default)]
    struct BrokenRecorder {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl AttendanceRecorder for BrokenRecorder {
        async fn handle_join(&self, _s: &Session, _u: &User, _at: DateTime<Utc>) -> AppResult<bool> {
            *self.calls.lock().unwrap() += 1;
            Err(AppError::database("connection reset"))
        }

        async fn handle_leave(&self, _s: &Session, _u: &User, _at: DateTime<Utc>) -> AppResult<bool> {
            *self.calls.lock().unwrap() += 1;
            Err(AppError::database("connection reset"))
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        retries: Arc<RecordedRetries>,
        service: AttendanceEventService,
    }

    fn fixture_with(store: Arc<MemoryStore>, recorder: Arc<dyn AttendanceRecorder>) -> Fixture {
        let retries = Arc::new(RecordedRetries::default());
        let service = AttendanceEventService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            recorder,
            retries.clone(),
        );
        Fixture {
            store,
            retries,
            service,
        }
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let recorder = Arc::new(MeetingAttendanceRecorder::new(
            store.clone(),
            Arc::new(TrackingCache::default()),
        ));
        fixture_with(store, recorder)
    }

    fn event(id: &str, event_type: EventType, minute: i64, session: SessionRef, user: UserId) -> CreateAttendanceEvent {
        CreateAttendanceEvent {
            event_id: id.to_string(),
            event_type,
            event_timestamp: base_time() + chrono::Duration::minutes(minute),
            session,
            user_id: user,
            participant_sid: "PA_abc".to_string(),
            participant_name: Some("Student".to_string()),
        }
    }

    async fn known_participant(store: &MemoryStore) -> (SessionRef, UserId) {
        let session = session_at(0, Some(60));
        let student = user();
        store.insert_session(session.clone()).await;
        store.insert_user(student.clone()).await;
        (session.session_ref(), student.id)
    }

    #[tokio::test]
    async fn test_leave_closes_matching_join() {
        let fx = fixture();
        let (session, user) = known_participant(&fx.store).await;

        fx.service
            .record(&event("e1", EventType::Join, 0, session, user), base_time())
            .await
            .unwrap();
        fx.service
            .record(&event("e2", EventType::Leave, 42, session, user), base_time())
            .await
            .unwrap();

        let events = fx.store.events().await;
        let join = events.iter().find(|e| e.event_id == "e1").unwrap();
        assert_eq!(join.duration_minutes, Some(42));
        assert!(!join.is_open());
        let leave = events.iter().find(|e| e.event_id == "e2").unwrap();
        assert!(leave.left_at.is_none());
    }

    #[tokio::test]
    async fn test_join_and_leave_reach_attendance_record() {
        let fx = fixture();
        let (session, user) = known_participant(&fx.store).await;

        fx.service
            .record(&event("e1", EventType::Join, 3, session, user), base_time())
            .await
            .unwrap();
        fx.service
            .record(&event("e2", EventType::Leave, 50, session, user), base_time())
            .await
            .unwrap();

        let attendances = fx.store.attendances().await;
        assert_eq!(attendances.len(), 1);
        let cycles = attendances[0].cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].duration_minutes, Some(47));
        assert!(fx.retries.scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_leave_schedules_retry() {
        let fx = fixture();
        let (session, user) = known_participant(&fx.store).await;
        let now = base_time() + chrono::Duration::minutes(20);

        let recorded = fx
            .service
            .record(&event("e1", EventType::Leave, 20, session, user), now)
            .await
            .unwrap();

        assert!(recorded.is_some());
        assert_eq!(
            fx.retries.scheduled(),
            vec![(session, user, AttendanceOperation::Leave, now)]
        );
    }

    #[tokio::test]
    async fn test_recorder_failure_schedules_retry() {
        let broken = Arc::new(BrokenRecorder::default());
        let fx = fixture_with(Arc::new(MemoryStore::new()), broken.clone());
        let (session, user) = known_participant(&fx.store).await;

        fx.service
            .record(&event("e1", EventType::Join, 0, session, user), base_time())
            .await
            .unwrap();

        assert_eq!(*broken.calls.lock().unwrap(), 1);
        assert_eq!(fx.retries.scheduled().len(), 1);
        assert_eq!(fx.retries.scheduled()[0].2, AttendanceOperation::Join);
    }

    #[tokio::test]
    async fn test_redelivered_event_is_ignored() {
        let broken = Arc::new(BrokenRecorder::default());
        let fx = fixture_with(Arc::new(MemoryStore::new()), broken.clone());
        let (session, user) = known_participant(&fx.store).await;
        let data = event("dup", EventType::Join, 0, session, user);

        assert!(fx.service.record(&data, base_time()).await.unwrap().is_some());
        assert!(fx.service.record(&data, base_time()).await.unwrap().is_none());

        assert_eq!(fx.store.events().await.len(), 1);
        assert_eq!(*broken.calls.lock().unwrap(), 1);
        assert_eq!(fx.retries.scheduled().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_logged_not_retried() {
        let fx = fixture();
        let session = SessionRef::new(SessionKind::Academic, SessionId::new());

        let recorded = fx
            .service
            .record(&event("e1", EventType::Join, 0, session, UserId::new()), base_time())
            .await
            .unwrap();

        assert!(recorded.is_some());
        assert!(fx.store.attendances().await.is_empty());
        assert!(fx.retries.scheduled().is_empty());
    }
}
