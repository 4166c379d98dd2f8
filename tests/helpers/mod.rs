//! Shared fixtures for the pipeline integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use halqa_cache::memory::MemoryCacheProvider;
use halqa_core::config::cache::MemoryCacheConfig;
use halqa_core::config::{AttendanceConfig, EarningsConfig, WorkerConfig};
use halqa_core::result::AppResult;
use halqa_core::traits::LiveRoomProvider;
use halqa_core::types::{AcademyId, SessionId, UserId};
use halqa_database::MemoryStore;
use halqa_entity::session::{Session, SessionKind, SessionStatus};
use halqa_entity::user::User;
use halqa_service::{
    AttendanceCalculationService, AttendanceEventService, AttendanceReconciler,
    AttendanceRecorder, EarningsService, FlatRateEarningsCalculator, MeetingAttendanceRecorder,
    RecordingRetryService, ReportSynchronizer,
};
use halqa_worker::jobs::{
    AttendanceCalculationJobHandler, EarningsJobHandler, EarningsSweepJobHandler,
    QueueMaintenanceJobHandler, QueuedRecordingRetries, ReconcileJobHandler,
    RecordingRetryJobHandler,
};
use halqa_worker::{JobExecutor, JobQueue, WorkerRunner};

/// Conferencing provider where every room has already closed.
#[derive(Debug)]
pub struct ClosedRooms;

#[async_trait]
impl LiveRoomProvider for ClosedRooms {
    async fn is_participant_active(&self, _room: &str, _sid: &str) -> AppResult<bool> {
        Ok(false)
    }
}

/// The whole attendance pipeline on in-memory backends.
pub struct TestPipeline {
    pub store: Arc<MemoryStore>,
    pub queue: Arc<JobQueue>,
    pub runner: WorkerRunner,
    pub events: AttendanceEventService,
    pub recorder: Arc<MeetingAttendanceRecorder>,
}

impl TestPipeline {
    /// Wire the pipeline with the real meeting attendance recorder.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Wire the pipeline with a custom recorder behind ingestion and the
    /// retry job.
    pub fn with_recorder(recorder: Arc<dyn AttendanceRecorder>) -> Self {
        Self::build(Some(recorder))
    }

    fn build(custom_recorder: Option<Arc<dyn AttendanceRecorder>>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default()));
        let attendance = AttendanceConfig::default();
        let worker = WorkerConfig::default();

        let queue = Arc::new(JobQueue::new(store.clone(), "worker-test".to_string()));
        let recorder = Arc::new(MeetingAttendanceRecorder::new(store.clone(), cache.clone()));
        let active_recorder =
            custom_recorder.unwrap_or_else(|| recorder.clone() as Arc<dyn AttendanceRecorder>);

        let mut executor = JobExecutor::new();
        executor.register(Arc::new(ReconcileJobHandler::new(AttendanceReconciler::new(
            store.clone(),
            store.clone(),
            Arc::new(ClosedRooms),
            cache.clone(),
            &attendance,
        ))));
        executor.register(Arc::new(AttendanceCalculationJobHandler::new(
            AttendanceCalculationService::new(
                store.clone(),
                store.clone(),
                ReportSynchronizer::new(store.clone()),
                &attendance,
            ),
            queue.clone(),
            worker.retry_max_attempts,
        )));
        let earnings = EarningsService::new(
            store.clone(),
            Arc::new(FlatRateEarningsCalculator::new(
                store.clone(),
                store.clone(),
                EarningsConfig::default(),
            )),
            &attendance,
        );
        executor.register(Arc::new(EarningsJobHandler::new(earnings.clone())));
        executor.register(Arc::new(EarningsSweepJobHandler::new(earnings)));
        executor.register(Arc::new(RecordingRetryJobHandler::new(
            RecordingRetryService::new(store.clone(), store.clone(), active_recorder.clone()),
        )));
        executor.register(Arc::new(QueueMaintenanceJobHandler::new(queue.clone(), &worker)));

        let events = AttendanceEventService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            active_recorder,
            Arc::new(QueuedRecordingRetries::new(queue.clone(), &worker)),
        );

        let runner = WorkerRunner::new(
            queue.clone(),
            Arc::new(executor),
            worker,
            "worker-test".to_string(),
        );

        Self {
            events,
            store,
            queue,
            runner,
            recorder,
        }
    }

    /// Run every job due at `now`, including jobs enqueued along the way.
    /// Returns how many jobs ran.
    pub async fn drain(&self, now: DateTime<Utc>) -> usize {
        let mut ran = 0;
        while self.runner.run_once_at(now).await.unwrap().is_some() {
            ran += 1;
        }
        ran
    }
}

/// Fixed reference instant.
pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// `minutes` after [`base_time`].
pub fn at(minutes: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(minutes)
}

/// A completed 60-minute session starting at [`base_time`].
pub fn session(kind: SessionKind, teacher: &User) -> Session {
    let id = SessionId::new();
    Session {
        id,
        kind,
        academy_id: Some(AcademyId::new()),
        teacher_id: Some(teacher.id),
        status: SessionStatus::Completed,
        scheduled_at: base_time(),
        duration_minutes: Some(60),
        meeting_room_name: Some(format!("{kind}-{id}")),
        created_at: base_time() - Duration::days(1),
        updated_at: base_time(),
    }
}

/// An active user.
pub fn user(name: &str) -> User {
    User {
        id: UserId::new(),
        academy_id: None,
        display_name: name.to_string(),
        is_active: true,
        created_at: base_time() - Duration::days(30),
    }
}
