//! Earnings job entry point.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use halqa_core::config::AttendanceConfig;
use halqa_core::result::AppResult;
use halqa_database::store::SessionStore;
use halqa_entity::earning::TeacherEarning;
use halqa_entity::session::{Session, SessionRef};

use super::calculator::EarningsCalculator;

/// What an earnings run did for one session.
#[derive(Debug, Clone)]
pub enum EarningsOutcome {
    /// The session no longer exists.
    SessionNotFound,
    /// The calculator declined (not eligible, or already paid).
    NotEligible,
    /// A new earning was recorded.
    Recorded(TeacherEarning),
}

/// Counters reported by one earnings catch-up sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsSweepSummary {
    /// Unpaid completed sessions examined.
    pub checked: u64,
    /// Earnings recorded by this sweep.
    pub recorded: u64,
    /// Sessions the calculator declined.
    pub not_eligible: u64,
    /// Sessions whose calculation failed.
    pub failed: u64,
}

/// Re-fetches a session and hands it to the earnings calculator.
#[derive(Debug, Clone)]
pub struct EarningsService {
    sessions: Arc<dyn SessionStore>,
    calculator: Arc<dyn EarningsCalculator>,
    retention: Duration,
    batch_size: i64,
}

impl EarningsService {
    /// Create a new earnings service. The sweep looks back over the
    /// attendance retention window.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        calculator: Arc<dyn EarningsCalculator>,
        config: &AttendanceConfig,
    ) -> Self {
        Self {
            sessions,
            calculator,
            retention: Duration::days(config.retention_days),
            batch_size: config.batch_size.max(1),
        }
    }

    /// Pay every completed session in the retention window that has final
    /// attendance but no earning yet.
    ///
    /// Catches sessions that were still ongoing when their attendance was
    /// finalized, so no earnings job was chained for them.
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<EarningsSweepSummary> {
        let scheduled_after = now - self.retention;
        let mut summary = EarningsSweepSummary::default();

        let mut offset = 0;
        loop {
            let batch = self
                .sessions
                .find_earnings_candidates(scheduled_after, self.batch_size, offset)
                .await?;
            let batch_len = batch.len() as i64;
            let recorded_before = summary.recorded;

            for session in &batch {
                summary.checked += 1;
                match self.compute(session, now).await {
                    Ok(EarningsOutcome::Recorded(_)) => summary.recorded += 1,
                    Ok(_) => summary.not_eligible += 1,
                    Err(_) => summary.failed += 1,
                }
            }

            if batch_len < self.batch_size {
                break;
            }
            // Paid sessions drop out of the candidate set.
            offset += batch_len - (summary.recorded - recorded_before) as i64;
        }

        info!(
            checked = summary.checked,
            recorded = summary.recorded,
            not_eligible = summary.not_eligible,
            failed = summary.failed,
            "Earnings sweep completed"
        );

        Ok(summary)
    }

    /// Calculate the earning for one session.
    ///
    /// A missing session is not an error. Calculator errors are logged with
    /// the session context and returned to the caller.
    pub async fn calculate_for_session(
        &self,
        session: SessionRef,
        now: DateTime<Utc>,
    ) -> AppResult<EarningsOutcome> {
        let Some(found) = self.sessions.find(session).await? else {
            warn!(
                session_id = %session.id,
                session_kind = %session.kind,
                "Session not found for earnings calculation"
            );
            return Ok(EarningsOutcome::SessionNotFound);
        };

        self.compute(&found, now).await
    }

    async fn compute(&self, session: &Session, now: DateTime<Utc>) -> AppResult<EarningsOutcome> {
        match self.calculator.compute_earnings_for_session(session, now).await {
            Ok(Some(earning)) => {
                info!(
                    session_id = %session.id,
                    session_kind = %session.kind,
                    earning_id = %earning.id,
                    amount_cents = earning.amount_cents,
                    currency = %earning.currency,
                    "Teacher earning recorded"
                );
                Ok(EarningsOutcome::Recorded(earning))
            }
            Ok(None) => {
                info!(
                    session_id = %session.id,
                    session_kind = %session.kind,
                    "No earning recorded (not eligible or already calculated)"
                );
                Ok(EarningsOutcome::NotEligible)
            }
            Err(e) => {
                error!(
                    session_id = %session.id,
                    session_kind = %session.kind,
                    error = %e,
                    "Earnings calculation failed"
                );
                Err(e)
            }
        }
    }
}
