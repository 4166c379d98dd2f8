//! Cache key builders for Halqa cache entries.

use halqa_core::types::{SessionId, UserId};

/// Prefix applied to all Halqa cache keys.
const PREFIX: &str = "halqa";

/// Cache key for a participant's live attendance status in a session.
///
/// Written by the join/leave path and invalidated whenever the underlying
/// events change (recording, reconciliation).
pub fn attendance_status(session_id: SessionId, user_id: UserId) -> String {
    format!("{PREFIX}:attendance_status:{session_id}:{user_id}")
}
