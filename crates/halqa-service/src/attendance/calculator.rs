//! Attendance verdict calculation.
//!
//! Presence is reconstructed from a record's join/leave cycles, clipped to
//! the session's scheduled window `[start, start + duration]`, merged so
//! overlapping cycles are counted once, and classified:
//!
//! 1. no join at all: `Absent`
//! 2. on time and presence >= full threshold: `Attended`
//! 3. late and presence >= minimum threshold: `Late`
//! 4. anything else with a join: `Leaved`
//!
//! "Late" means the first join is strictly after `start + late tolerance`.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use halqa_core::AppError;
use halqa_core::config::AttendanceConfig;
use halqa_entity::attendance::{AttendanceStatus, AttendanceVerdict, JoinLeaveCycle, MeetingAttendance};
use halqa_entity::session::Session;

/// Errors raised while computing a single record's verdict.
#[derive(Debug, Error)]
pub enum CalculationError {
    /// A recorded cycle ends before it starts.
    #[error("cycle {index} of attendance record {record_id} ends before it starts")]
    InvalidCycle {
        /// Offending record.
        record_id: Uuid,
        /// Position of the cycle in the record.
        index: usize,
    },

    /// Reading or writing a store failed.
    #[error(transparent)]
    Store(#[from] AppError),
}

/// Thresholds applied when classifying attendance.
#[derive(Debug, Clone)]
pub struct AttendancePolicy {
    /// Grace after scheduled start before a join counts as late.
    pub late_tolerance: Duration,
    /// Percentage at or above which an on-time participant attended.
    pub full_attendance_percent: f64,
    /// Percentage at or above which a late participant counts as late rather than leaved.
    pub minimum_attendance_percent: f64,
    /// Duration assumed for sessions without one.
    pub default_session_duration_minutes: i32,
}

impl From<&AttendanceConfig> for AttendancePolicy {
    fn from(config: &AttendanceConfig) -> Self {
        Self {
            late_tolerance: Duration::minutes(config.late_tolerance_minutes),
            full_attendance_percent: config.full_attendance_percent,
            minimum_attendance_percent: config.minimum_attendance_percent,
            default_session_duration_minutes: config.default_session_duration_minutes,
        }
    }
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self::from(&AttendanceConfig::default())
    }
}

/// A session's scheduled window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    /// Scheduled start.
    pub start: DateTime<Utc>,
    /// Scheduled end.
    pub end: DateTime<Utc>,
    /// Scheduled duration in minutes.
    pub scheduled_minutes: i32,
}

impl SessionWindow {
    /// The window of `session`, using the policy default when it has no duration.
    pub fn of(session: &Session, policy: &AttendancePolicy) -> Self {
        let scheduled_minutes = session.effective_duration_minutes(policy.default_session_duration_minutes);
        Self {
            start: session.scheduled_at,
            end: session.scheduled_at + Duration::minutes(i64::from(scheduled_minutes)),
            scheduled_minutes,
        }
    }
}

impl AttendancePolicy {
    /// Compute the verdict for one attendance record.
    pub fn calculate(
        &self,
        record: &MeetingAttendance,
        session: &Session,
    ) -> Result<AttendanceVerdict, CalculationError> {
        let window = SessionWindow::of(session, self);

        let Some(first_join) = first_join_time(record) else {
            return Ok(AttendanceVerdict {
                total_duration_minutes: 0,
                attendance_percentage: 0.0,
                attendance_status: AttendanceStatus::Absent,
                is_late: false,
                late_minutes: 0,
            });
        };

        let intervals = presence_intervals(record, &window)?;
        let total_duration_minutes = clipped_minutes(&intervals, window.scheduled_minutes);
        let attendance_percentage = percentage(total_duration_minutes, window.scheduled_minutes);

        let is_late = first_join > window.start + self.late_tolerance;
        let late_minutes = if is_late {
            i32::try_from((first_join - window.start).num_minutes()).unwrap_or(i32::MAX)
        } else {
            0
        };

        Ok(AttendanceVerdict {
            total_duration_minutes,
            attendance_percentage,
            attendance_status: self.classify(is_late, attendance_percentage),
            is_late,
            late_minutes,
        })
    }

    /// Classify a participant who joined at least once.
    pub fn classify(&self, is_late: bool, attendance_percentage: f64) -> AttendanceStatus {
        if !is_late && attendance_percentage >= self.full_attendance_percent {
            AttendanceStatus::Attended
        } else if is_late && attendance_percentage >= self.minimum_attendance_percent {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Leaved
        }
    }
}

/// Earliest join of a record: the stored first join time, else the first cycle.
fn first_join_time(record: &MeetingAttendance) -> Option<DateTime<Utc>> {
    let from_cycles = record.cycles().iter().map(|c| c.joined_at).min();
    match (record.first_join_time, from_cycles) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

/// The record's presence clipped to `window`, sorted and with overlaps merged.
///
/// A record without cycles but with a first join time contributes a single
/// synthetic cycle from the first join to the last leave. Cycles that never
/// closed run to the end of the window.
pub fn presence_intervals(
    record: &MeetingAttendance,
    window: &SessionWindow,
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, CalculationError> {
    let synthetic;
    let cycles: &[JoinLeaveCycle] = if record.cycles().is_empty() {
        match record.first_join_time {
            Some(joined_at) => {
                synthetic = [JoinLeaveCycle {
                    joined_at,
                    left_at: record.last_leave_time,
                    duration_minutes: None,
                }];
                &synthetic
            }
            None => &[],
        }
    } else {
        record.cycles()
    };

    let mut clipped = Vec::with_capacity(cycles.len());
    for (index, cycle) in cycles.iter().enumerate() {
        if cycle.left_at.is_some_and(|left| left < cycle.joined_at) {
            return Err(CalculationError::InvalidCycle {
                record_id: record.id,
                index,
            });
        }

        let start = cycle.joined_at.max(window.start);
        let end = cycle.left_at.unwrap_or(window.end).min(window.end);
        if end > start {
            clipped.push((start, end));
        }
    }

    clipped.sort_by_key(|(start, _)| *start);

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(clipped.len());
    for (start, end) in clipped {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    Ok(merged)
}

/// Total minutes covered by `intervals`, rounded and capped at the scheduled duration.
fn clipped_minutes(intervals: &[(DateTime<Utc>, DateTime<Utc>)], scheduled_minutes: i32) -> i32 {
    let seconds: i64 = intervals
        .iter()
        .map(|(start, end)| (*end - *start).num_seconds())
        .sum();
    let minutes = (seconds as f64 / 60.0).round() as i32;
    minutes.min(scheduled_minutes)
}

/// Presence as a percentage of the scheduled duration, capped at 100 with two decimals.
fn percentage(total_minutes: i32, scheduled_minutes: i32) -> f64 {
    if scheduled_minutes <= 0 {
        return 0.0;
    }
    let raw = f64::from(total_minutes) / f64::from(scheduled_minutes) * 100.0;
    (raw.min(100.0) * 100.0).round() / 100.0
}
