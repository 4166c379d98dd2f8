//! Retrying a failed join/leave recording.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};

use halqa_core::AppError;
use halqa_core::result::AppResult;
use halqa_core::types::UserId;
use halqa_database::store::{SessionStore, UserStore};
use halqa_entity::attendance::AttendanceOperation;
use halqa_entity::session::SessionRef;

use super::recorder::AttendanceRecorder;

/// Defers a failed join or leave to a later attempt.
#[async_trait]
pub trait RecordingRetryScheduler: Send + Sync + std::fmt::Debug {
    /// Queue a retry of `operation` for the participant, due after the
    /// scheduler's backoff from `now`.
    async fn schedule(
        &self,
        session: SessionRef,
        user_id: UserId,
        operation: AttendanceOperation,
        now: DateTime<Utc>,
    ) -> AppResult<()>;
}

/// Why a recording retry did not succeed.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// The session no longer exists.
    #[error("session {0} not found")]
    SessionNotFound(SessionRef),

    /// The user no longer exists.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// The recorder refused the change.
    #[error("attendance {operation} was not recorded")]
    Rejected {
        /// The refused operation.
        operation: AttendanceOperation,
    },

    /// The recorder or a store failed.
    #[error(transparent)]
    Recorder(#[from] AppError),
}

impl RecordingError {
    /// Whether another attempt may succeed.
    ///
    /// Missing entities are permanent; refusals and recorder failures are
    /// retried under the job's attempt budget.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Recorder(_))
    }
}

/// Re-runs a join or leave against the owning recorder.
#[derive(Debug, Clone)]
pub struct RecordingRetryService {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    recorder: Arc<dyn AttendanceRecorder>,
}

impl RecordingRetryService {
    /// Create a new retry service.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        recorder: Arc<dyn AttendanceRecorder>,
    ) -> Self {
        Self {
            sessions,
            users,
            recorder,
        }
    }

    /// Re-fetch the session and user, then re-invoke the recorder.
    pub async fn retry(
        &self,
        session: SessionRef,
        user_id: UserId,
        operation: AttendanceOperation,
        now: DateTime<Utc>,
    ) -> Result<(), RecordingError> {
        let Some(found) = self.sessions.find(session).await? else {
            error!(
                session_id = %session.id,
                session_kind = %session.kind,
                user_id = %user_id,
                operation = %operation,
                "Session not found for attendance retry"
            );
            return Err(RecordingError::SessionNotFound(session));
        };

        let Some(user) = self.users.find_by_id(user_id).await? else {
            error!(
                session_id = %session.id,
                user_id = %user_id,
                operation = %operation,
                "User not found for attendance retry"
            );
            return Err(RecordingError::UserNotFound(user_id));
        };

        let result = match operation {
            AttendanceOperation::Join => self.recorder.handle_join(&found, &user, now).await,
            AttendanceOperation::Leave => self.recorder.handle_leave(&found, &user, now).await,
        };

        match result {
            Ok(true) => {
                info!(
                    session_id = %session.id,
                    user_id = %user_id,
                    operation = %operation,
                    "Attendance recording retry succeeded"
                );
                Ok(())
            }
            Ok(false) => {
                warn!(
                    session_id = %session.id,
                    user_id = %user_id,
                    operation = %operation,
                    "Attendance recording retry was rejected"
                );
                Err(RecordingError::Rejected { operation })
            }
            Err(e) => {
                error!(
                    session_id = %session.id,
                    user_id = %user_id,
                    operation = %operation,
                    error = %e,
                    "Attendance recording retry failed"
                );
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use halqa_database::MemoryStore;
    use halqa_entity::session::Session;
    use halqa_entity::user::User;

    use super::*;
    use crate::testing::{session_at, user};

    /// Recorder returning a fixed answer and remembering what it was asked.
    #[derive(Debug)]
    struct ScriptedRecorder {
        answer: Result<bool, AppError>,
        calls: Mutex<Vec<AttendanceOperation>>,
    }

    impl ScriptedRecorder {
        fn new(answer: Result<bool, AppError>) -> Self {
            Self {
                answer,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn reply(&self, op: AttendanceOperation) -> AppResult<bool> {
            self.calls.lock().unwrap().push(op);
            self.answer.clone()
        }
    }

    #[async_trait]
    impl AttendanceRecorder for ScriptedRecorder {
        async fn handle_join(&self, _s: &Session, _u: &User, _at: DateTime<Utc>) -> AppResult<bool> {
            self.reply(AttendanceOperation::Join)
        }

        async fn handle_leave(&self, _s: &Session, _u: &User, _at: DateTime<Utc>) -> AppResult<bool> {
            self.reply(AttendanceOperation::Leave)
        }
    }

    async fn fixture(answer: Result<bool, AppError>) -> (RecordingRetryService, Arc<ScriptedRecorder>, Session, User) {
        let store = Arc::new(MemoryStore::new());
        let session = session_at(0, Some(60));
        let student = user();
        store.insert_session(session.clone()).await;
        store.insert_user(student.clone()).await;
        let recorder = Arc::new(ScriptedRecorder::new(answer));
        let service = RecordingRetryService::new(store.clone(), store, recorder.clone());
        (service, recorder, session, student)
    }

    #[tokio::test]
    async fn test_dispatches_on_operation() {
        let (service, recorder, session, student) = fixture(Ok(true)).await;

        service
            .retry(session.session_ref(), student.id, AttendanceOperation::Leave, session.scheduled_at)
            .await
            .unwrap();

        assert_eq!(*recorder.calls.lock().unwrap(), vec![AttendanceOperation::Leave]);
    }

    #[tokio::test]
    async fn test_rejection_is_retryable() {
        let (service, _, session, student) = fixture(Ok(false)).await;

        let err = service
            .retry(session.session_ref(), student.id, AttendanceOperation::Join, session.scheduled_at)
            .await
            .unwrap_err();

        assert!(matches!(err, RecordingError::Rejected { operation: AttendanceOperation::Join }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_recorder_error_is_retryable() {
        let (service, _, session, student) = fixture(Err(AppError::database("connection reset"))).await;

        let err = service
            .retry(session.session_ref(), student.id, AttendanceOperation::Join, session.scheduled_at)
            .await
            .unwrap_err();

        assert!(matches!(err, RecordingError::Recorder(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_entities_are_permanent() {
        let (service, recorder, session, student) = fixture(Ok(true)).await;

        let missing_user = service
            .retry(session.session_ref(), UserId::new(), AttendanceOperation::Join, session.scheduled_at)
            .await
            .unwrap_err();
        let missing_session = service
            .retry(session_at(0, Some(60)).session_ref(), student.id, AttendanceOperation::Join, session.scheduled_at)
            .await
            .unwrap_err();

        assert!(matches!(missing_user, RecordingError::UserNotFound(_)));
        assert!(matches!(missing_session, RecordingError::SessionNotFound(_)));
        assert!(!missing_user.is_retryable());
        assert!(!missing_session.is_retryable());
        assert!(recorder.calls.lock().unwrap().is_empty());
    }
}
