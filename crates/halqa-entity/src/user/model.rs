//! User entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use halqa_core::types::{AcademyId, UserId};

/// A platform user (student or teacher). Read-only to the attendance pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Owning academy.
    pub academy_id: Option<AcademyId>,
    /// Display name.
    pub display_name: String,
    /// Whether the account is active.
    pub is_active: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}
