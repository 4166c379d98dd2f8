//! Live-conferencing provider trait.

use async_trait::async_trait;

use crate::result::AppResult;

/// Read-only view of the conferencing provider's room state.
#[async_trait]
pub trait LiveRoomProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Whether `participant_sid` is currently connected to `room_name`.
    ///
    /// Returns `Ok(false)` when the room itself no longer exists.
    async fn is_participant_active(&self, room_name: &str, participant_sid: &str)
    -> AppResult<bool>;
}
