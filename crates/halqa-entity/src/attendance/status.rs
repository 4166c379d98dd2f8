//! Attendance enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of raw telemetry event delivered by the conferencing webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attendance_event_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Participant connected.
    Join,
    /// Participant disconnected.
    Leave,
}

impl EventType {
    /// Return the event type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Final attendance verdict for a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attendance_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    /// Joined on time and stayed for most of the session.
    Attended,
    /// Joined late but stayed for at least half of the session.
    Late,
    /// Joined but left early or stayed too little.
    Leaved,
    /// Never joined.
    Absent,
}

impl AttendanceStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attended => "attended",
            Self::Late => "late",
            Self::Leaved => "leaved",
            Self::Absent => "absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role a participant holds in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "participant_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// Attending student.
    Student,
    /// Teacher running the session.
    Teacher,
}

/// A join or leave recording request, as dispatched by the retry job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceOperation {
    /// Record a join.
    Join,
    /// Record a leave.
    Leave,
}

impl AttendanceOperation {
    /// Return the operation as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
        }
    }
}

impl fmt::Display for AttendanceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AttendanceOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "join" => Ok(Self::Join),
            "leave" => Ok(Self::Leave),
            other => Err(format!("unknown attendance operation '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_parsing_is_exact() {
        assert_eq!("join".parse(), Ok(AttendanceOperation::Join));
        assert_eq!("leave".parse(), Ok(AttendanceOperation::Leave));
        assert!("JOIN".parse::<AttendanceOperation>().is_err());
        assert!("kick".parse::<AttendanceOperation>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&AttendanceStatus::Leaved).unwrap();
        assert_eq!(json, "\"leaved\"");
    }
}
