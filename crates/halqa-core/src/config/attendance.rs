//! Attendance policy configuration.

use serde::{Deserialize, Serialize};

/// Thresholds and windows that drive reconciliation and verdicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceConfig {
    /// Age after which an open join event is considered orphaned. Also used
    /// as the synthetic duration of a reconciled event.
    #[serde(default = "default_orphan_staleness")]
    pub orphan_staleness_minutes: i64,
    /// Delay after the scheduled end before a session is scored.
    #[serde(default = "default_calculation_delay")]
    pub calculation_delay_minutes: i64,
    /// Sessions scheduled earlier than this many days ago are never scored.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Minutes after scheduled start a participant may join and still be on time.
    #[serde(default = "default_late_tolerance")]
    pub late_tolerance_minutes: i64,
    /// Presence percentage at or above which an on-time participant attended.
    #[serde(default = "default_full_attendance")]
    pub full_attendance_percent: f64,
    /// Presence percentage below which a participant is counted as having left.
    #[serde(default = "default_minimum_attendance")]
    pub minimum_attendance_percent: f64,
    /// Duration assumed for sessions that do not record one.
    #[serde(default = "default_session_duration")]
    pub default_session_duration_minutes: i32,
    /// Sessions fetched per calculation batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            orphan_staleness_minutes: default_orphan_staleness(),
            calculation_delay_minutes: default_calculation_delay(),
            retention_days: default_retention_days(),
            late_tolerance_minutes: default_late_tolerance(),
            full_attendance_percent: default_full_attendance(),
            minimum_attendance_percent: default_minimum_attendance(),
            default_session_duration_minutes: default_session_duration(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_orphan_staleness() -> i64 {
    120
}

fn default_calculation_delay() -> i64 {
    5
}

fn default_retention_days() -> i64 {
    7
}

fn default_late_tolerance() -> i64 {
    15
}

fn default_full_attendance() -> f64 {
    90.0
}

fn default_minimum_attendance() -> f64 {
    50.0
}

fn default_session_duration() -> i32 {
    60
}

fn default_batch_size() -> i64 {
    100
}
