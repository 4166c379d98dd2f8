//! Session kind and status enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use halqa_core::types::SessionId;

/// The closed set of session kinds. Each kind owns its own report table and
/// earning rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// A Quran memorization or recitation circle.
    Quran,
    /// An academic subject lesson.
    Academic,
}

impl SessionKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quran => "quran",
            Self::Academic => "academic",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a string does not name a session kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSessionKindError(pub String);

impl fmt::Display for ParseSessionKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown session kind '{}'", self.0)
    }
}

impl std::error::Error for ParseSessionKindError {}

impl FromStr for SessionKind {
    type Err = ParseSessionKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quran" => Ok(Self::Quran),
            "academic" => Ok(Self::Academic),
            _ => Err(ParseSessionKindError(s.to_string())),
        }
    }
}

/// Lifecycle status of a scheduled session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Not started yet.
    Scheduled,
    /// Currently running (or never explicitly closed).
    Ongoing,
    /// Finished normally.
    Completed,
    /// Called off.
    Cancelled,
}

impl SessionStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A session identifier qualified by its kind. Session ids are only unique
/// within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionRef {
    /// Which session table the id belongs to.
    pub kind: SessionKind,
    /// Session identifier.
    pub id: SessionId,
}

impl SessionRef {
    /// Create a new session reference.
    pub fn new(kind: SessionKind, id: SessionId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for SessionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}
