//! Orphaned join reconciliation.
//!
//! A join event whose leave webhook never arrived stays open forever. The
//! reconciler picks up open joins older than the staleness threshold, asks
//! the conferencing provider whether the connection is still live, and
//! closes the ones that are gone with a fixed synthetic duration.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use halqa_cache::keys;
use halqa_core::config::AttendanceConfig;
use halqa_core::result::AppResult;
use halqa_core::traits::{CacheProvider, LiveRoomProvider};
use halqa_database::store::{AttendanceEventStore, SessionStore};
use halqa_entity::attendance::AttendanceEvent;

/// Termination reason stamped on synthetically closed joins.
pub const RECONCILED_REASON: &str = "reconciled_missed_webhook";

/// Counters reported by one reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    /// Stale open joins found.
    pub found: u64,
    /// Joins closed by this sweep.
    pub closed: u64,
    /// Joins left open (participant still connected, or an error).
    pub skipped: u64,
}

/// Closes join events whose leave webhook was missed.
#[derive(Debug, Clone)]
pub struct AttendanceReconciler {
    events: Arc<dyn AttendanceEventStore>,
    sessions: Arc<dyn SessionStore>,
    rooms: Arc<dyn LiveRoomProvider>,
    cache: Arc<dyn CacheProvider>,
    staleness: Duration,
}

impl AttendanceReconciler {
    /// Create a new reconciler.
    pub fn new(
        events: Arc<dyn AttendanceEventStore>,
        sessions: Arc<dyn SessionStore>,
        rooms: Arc<dyn LiveRoomProvider>,
        cache: Arc<dyn CacheProvider>,
        config: &AttendanceConfig,
    ) -> Self {
        Self {
            events,
            sessions,
            rooms,
            cache,
            staleness: Duration::minutes(config.orphan_staleness_minutes),
        }
    }

    /// Run one reconciliation sweep.
    pub async fn run(&self, now: DateTime<Utc>) -> AppResult<ReconciliationSummary> {
        let candidates = self.events.find_open_joins_before(now - self.staleness).await?;
        let mut summary = ReconciliationSummary {
            found: candidates.len() as u64,
            ..Default::default()
        };

        info!("Found {} orphaned join events", summary.found);

        for event in &candidates {
            match self.reconcile(event).await {
                Ok(true) => summary.closed += 1,
                Ok(false) => summary.skipped += 1,
                Err(e) => {
                    error!(
                        event_id = %event.event_id,
                        session_id = %event.session_id,
                        user_id = %event.user_id,
                        error = %e,
                        "Failed to reconcile join event"
                    );
                    summary.skipped += 1;
                }
            }
        }

        info!(
            found = summary.found,
            closed = summary.closed,
            skipped = summary.skipped,
            "Attendance reconciliation completed"
        );

        Ok(summary)
    }

    /// Close one candidate unless its participant is still connected.
    /// Returns whether the event was closed.
    async fn reconcile(&self, event: &AttendanceEvent) -> AppResult<bool> {
        if self.is_still_present(event).await? {
            debug!(
                event_id = %event.event_id,
                participant_sid = %event.participant_sid,
                "Participant still connected, leaving join open"
            );
            return Ok(false);
        }

        let closed = self
            .events
            .close_orphaned(
                event.id,
                event.event_timestamp + self.staleness,
                self.staleness.num_minutes() as i32,
                RECONCILED_REASON,
            )
            .await?;

        if !closed {
            return Ok(false);
        }

        if let Err(e) = self
            .cache
            .delete(&keys::attendance_status(event.session_id, event.user_id))
            .await
        {
            warn!(
                event_id = %event.event_id,
                session_id = %event.session_id,
                user_id = %event.user_id,
                error = %e,
                "Closed orphaned join but failed to invalidate attendance status cache"
            );
        }

        info!(
            event_id = %event.event_id,
            session_id = %event.session_id,
            user_id = %event.user_id,
            "Closed orphaned join event"
        );
        Ok(true)
    }

    async fn is_still_present(&self, event: &AttendanceEvent) -> AppResult<bool> {
        let Some(session) = self.sessions.find(event.session_ref()).await? else {
            warn!(
                session_id = %event.session_id,
                session_kind = %event.session_kind,
                event_id = %event.event_id,
                "Session not found for open join, treating participant as gone"
            );
            return Ok(false);
        };

        let Some(room) = session.meeting_room_name.as_deref() else {
            return Ok(false);
        };

        self.rooms
            .is_participant_active(room, &event.participant_sid)
            .await
    }
}

#[cfg(test)]
mod tests {
    use halqa_core::types::UserId;
    use halqa_database::MemoryStore;
    use halqa_entity::attendance::{CreateAttendanceEvent, EventType};
    use halqa_entity::session::{Session, SessionRef};

    use super::*;
    use crate::testing::{FakeRooms, TrackingCache, base_time, session_at};

    struct Fixture {
        store: Arc<MemoryStore>,
        cache: Arc<TrackingCache>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_cache(TrackingCache::default())
        }

        fn with_cache(cache: TrackingCache) -> Self {
            Self {
                store: Arc::new(MemoryStore::new()),
                cache: Arc::new(cache),
            }
        }

        fn reconciler(&self, rooms: FakeRooms) -> AttendanceReconciler {
            AttendanceReconciler::new(
                self.store.clone(),
                self.store.clone(),
                Arc::new(rooms),
                self.cache.clone(),
                &AttendanceConfig::default(),
            )
        }

        async fn join(&self, session: SessionRef, user: UserId, sid: &str) {
            self.store
                .append(&CreateAttendanceEvent {
                    event_id: format!("join-{sid}"),
                    event_type: EventType::Join,
                    event_timestamp: base_time(),
                    session,
                    user_id: user,
                    participant_sid: sid.to_string(),
                    participant_name: None,
                })
                .await
                .unwrap();
        }
    }

    fn room(session: &Session) -> String {
        session.meeting_room_name.clone().unwrap()
    }

    #[tokio::test]
    async fn test_closes_stale_join_with_fixed_duration() {
        let fx = Fixture::new();
        let session = session_at(0, Some(60));
        fx.store.insert_session(session.clone()).await;
        let user = UserId::new();
        fx.join(session.session_ref(), user, "PA_1").await;
        let key = keys::attendance_status(session.id, user);

        let summary = fx
            .reconciler(FakeRooms::default())
            .run(base_time() + Duration::hours(3))
            .await
            .unwrap();

        assert_eq!(summary, ReconciliationSummary { found: 1, closed: 1, skipped: 0 });
        let event = fx.store.events().await.remove(0);
        assert_eq!(event.left_at, Some(base_time() + Duration::hours(2)));
        assert_eq!(event.duration_minutes, Some(120));
        assert_eq!(event.termination_reason.as_deref(), Some(RECONCILED_REASON));
        assert_eq!(fx.cache.deleted(), vec![key]);
    }

    #[tokio::test]
    async fn test_cache_outage_still_counts_join_as_closed() {
        let fx = Fixture::with_cache(TrackingCache::unavailable());
        let session = session_at(0, Some(60));
        fx.store.insert_session(session.clone()).await;
        fx.join(session.session_ref(), UserId::new(), "PA_1").await;
        let reconciler = fx.reconciler(FakeRooms::default());
        let now = base_time() + Duration::hours(3);

        let summary = reconciler.run(now).await.unwrap();

        assert_eq!(summary, ReconciliationSummary { found: 1, closed: 1, skipped: 0 });
        assert!(!fx.store.events().await[0].is_open());
        assert_eq!(reconciler.run(now).await.unwrap().found, 0);
    }

    #[tokio::test]
    async fn test_second_run_finds_nothing() {
        let fx = Fixture::new();
        let session = session_at(0, Some(60));
        fx.store.insert_session(session.clone()).await;
        fx.join(session.session_ref(), UserId::new(), "PA_1").await;
        let reconciler = fx.reconciler(FakeRooms::default());
        let now = base_time() + Duration::hours(3);

        reconciler.run(now).await.unwrap();
        let second = reconciler.run(now).await.unwrap();

        assert_eq!(second.found, 0);
        assert_eq!(second.closed, 0);
    }

    #[tokio::test]
    async fn test_recent_joins_are_not_candidates() {
        let fx = Fixture::new();
        let session = session_at(0, Some(60));
        fx.store.insert_session(session.clone()).await;
        fx.join(session.session_ref(), UserId::new(), "PA_1").await;

        let summary = fx
            .reconciler(FakeRooms::default())
            .run(base_time() + Duration::minutes(90))
            .await
            .unwrap();

        assert_eq!(summary.found, 0);
    }

    #[tokio::test]
    async fn test_connected_participant_is_skipped() {
        let fx = Fixture::new();
        let session = session_at(0, Some(60));
        fx.store.insert_session(session.clone()).await;
        fx.join(session.session_ref(), UserId::new(), "PA_live").await;

        let summary = fx
            .reconciler(FakeRooms::default().with_participant(&room(&session), "PA_live"))
            .run(base_time() + Duration::hours(3))
            .await
            .unwrap();

        assert_eq!(summary, ReconciliationSummary { found: 1, closed: 0, skipped: 1 });
        assert!(fx.store.events().await[0].is_open());
    }

    #[tokio::test]
    async fn test_missing_session_counts_as_gone() {
        let fx = Fixture::new();
        let session = session_at(0, Some(60));
        fx.join(session.session_ref(), UserId::new(), "PA_1").await;

        let summary = fx
            .reconciler(FakeRooms::default())
            .run(base_time() + Duration::hours(3))
            .await
            .unwrap();

        assert_eq!(summary.closed, 1);
    }

    #[tokio::test]
    async fn test_provider_error_is_isolated() {
        let fx = Fixture::new();
        let broken = session_at(0, Some(60));
        let healthy = session_at(0, Some(60));
        fx.store.insert_session(broken.clone()).await;
        fx.store.insert_session(healthy.clone()).await;
        fx.join(broken.session_ref(), UserId::new(), "PA_broken").await;
        fx.join(healthy.session_ref(), UserId::new(), "PA_healthy").await;

        let summary = fx
            .reconciler(FakeRooms::default().with_failing_room(&room(&broken)))
            .run(base_time() + Duration::hours(3))
            .await
            .unwrap();

        assert_eq!(summary, ReconciliationSummary { found: 2, closed: 1, skipped: 1 });
    }
}
