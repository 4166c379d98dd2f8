//! Attendance calculation sweep.
//!
//! Finds sessions whose scheduled end plus the calculation delay has passed
//! (completed, or still marked ongoing) and that started within the
//! retention window, then finalizes every pending attendance record of those
//! sessions exactly once. A record's report row is written before the record
//! is finalized, so a failed projection leaves the record pending for the
//! next sweep.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use halqa_core::config::AttendanceConfig;
use halqa_core::result::AppResult;
use halqa_database::store::{CalculationWindow, MeetingAttendanceStore, SessionStore};
use halqa_entity::attendance::MeetingAttendance;
use halqa_entity::session::{Session, SessionRef, SessionStatus};

use super::calculator::{AttendancePolicy, CalculationError};
use crate::report::ReportSynchronizer;

/// Counters reported by one calculation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationSummary {
    /// Eligible sessions examined.
    pub sessions_checked: u64,
    /// Records finalized by this sweep.
    pub processed: u64,
    /// Sessions with nothing pending plus records another sweep finalized first.
    pub skipped: u64,
    /// Records (or sessions) that failed and stay pending.
    pub failed: u64,
    /// Records left pending because their report projection failed.
    /// Included in `failed`.
    pub report_failures: u64,
    /// Completed sessions that had at least one record finalized by this sweep.
    pub finalized_completed_sessions: Vec<SessionRef>,
}

enum RecordOutcome {
    Finalized,
    AlreadyFinalized,
    ReportFailed,
}

/// Computes and stores definitive attendance verdicts.
#[derive(Debug, Clone)]
pub struct AttendanceCalculationService {
    sessions: Arc<dyn SessionStore>,
    attendances: Arc<dyn MeetingAttendanceStore>,
    reports: ReportSynchronizer,
    policy: AttendancePolicy,
    calculation_delay: Duration,
    retention: Duration,
    batch_size: i64,
}

impl AttendanceCalculationService {
    /// Create a new calculation service.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        attendances: Arc<dyn MeetingAttendanceStore>,
        reports: ReportSynchronizer,
        config: &AttendanceConfig,
    ) -> Self {
        Self {
            sessions,
            attendances,
            reports,
            policy: AttendancePolicy::from(config),
            calculation_delay: Duration::minutes(config.calculation_delay_minutes),
            retention: Duration::days(config.retention_days),
            batch_size: config.batch_size.max(1),
        }
    }

    /// Run one sweep over all eligible sessions.
    pub async fn run(&self, now: DateTime<Utc>) -> AppResult<CalculationSummary> {
        let window = CalculationWindow {
            ended_before: now - self.calculation_delay,
            scheduled_after: now - self.retention,
            default_duration_minutes: self.policy.default_session_duration_minutes,
        };
        let mut summary = CalculationSummary::default();

        info!(
            ended_before = %window.ended_before,
            scheduled_after = %window.scheduled_after,
            "Starting attendance calculation"
        );

        let mut offset = 0;
        loop {
            let batch = self
                .sessions
                .find_calculation_candidates(&window, self.batch_size, offset)
                .await?;
            let batch_len = batch.len() as i64;

            for session in &batch {
                self.process_session(session, now, &mut summary).await;
            }

            if batch_len < self.batch_size {
                break;
            }
            offset += batch_len;
        }

        info!(
            sessions = summary.sessions_checked,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Attendance calculation completed"
        );

        Ok(summary)
    }

    async fn process_session(
        &self,
        session: &Session,
        now: DateTime<Utc>,
        summary: &mut CalculationSummary,
    ) {
        summary.sessions_checked += 1;

        let pending = match self
            .attendances
            .find_pending_for_session(session.session_ref())
            .await
        {
            Ok(pending) => pending,
            Err(e) => {
                error!(
                    session_id = %session.id,
                    session_kind = %session.kind,
                    error = %e,
                    "Failed to load pending attendance for session"
                );
                summary.failed += 1;
                return;
            }
        };

        if pending.is_empty() {
            summary.skipped += 1;
            return;
        }

        let mut finalized_any = false;
        for record in &pending {
            match self.process_record(session, record, now).await {
                Ok(RecordOutcome::Finalized) => {
                    summary.processed += 1;
                    finalized_any = true;
                }
                Ok(RecordOutcome::AlreadyFinalized) => {
                    debug!(
                        session_id = %session.id,
                        user_id = %record.user_id,
                        "Attendance already finalized by another run"
                    );
                    summary.skipped += 1;
                }
                Ok(RecordOutcome::ReportFailed) => {
                    summary.failed += 1;
                    summary.report_failures += 1;
                }
                Err(e) => {
                    error!(
                        session_id = %session.id,
                        session_kind = %session.kind,
                        user_id = %record.user_id,
                        error = %e,
                        "Failed to calculate attendance"
                    );
                    summary.failed += 1;
                }
            }
        }

        if finalized_any && session.status == SessionStatus::Completed {
            summary.finalized_completed_sessions.push(session.session_ref());
        }
    }

    async fn process_record(
        &self,
        session: &Session,
        record: &MeetingAttendance,
        now: DateTime<Utc>,
    ) -> Result<RecordOutcome, CalculationError> {
        let verdict = self.policy.calculate(record, session)?;

        if let Err(e) = self.reports.sync(session, record, &verdict, now).await {
            error!(
                session_id = %session.id,
                session_kind = %session.kind,
                user_id = %record.user_id,
                error = %e,
                "Failed to sync attendance to session report, record left pending"
            );
            return Ok(RecordOutcome::ReportFailed);
        }

        if !self.attendances.finalize(record.id, &verdict, now).await? {
            return Ok(RecordOutcome::AlreadyFinalized);
        }

        debug!(
            session_id = %session.id,
            user_id = %record.user_id,
            status = %verdict.attendance_status,
            percentage = verdict.attendance_percentage,
            minutes = verdict.total_duration_minutes,
            "Attendance finalized"
        );

        Ok(RecordOutcome::Finalized)
    }
}
