//! Teacher earning entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use halqa_core::types::{AcademyId, SessionId, UserId};

use crate::session::{SessionKind, SessionRef};

/// Money owed to a teacher for one completed session. At most one per session.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeacherEarning {
    /// Row identifier.
    pub id: Uuid,
    /// Paid teacher.
    pub teacher_id: UserId,
    /// Owning academy.
    pub academy_id: Option<AcademyId>,
    /// Kind of the earning session.
    pub session_kind: SessionKind,
    /// Earning session.
    pub session_id: SessionId,
    /// Amount in minor currency units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// When the amount was computed.
    pub calculated_at: DateTime<Utc>,
}

impl TeacherEarning {
    /// The kind-qualified session this earning pays for.
    pub fn session_ref(&self) -> SessionRef {
        SessionRef::new(self.session_kind, self.session_id)
    }
}

/// Data required to record an earning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeacherEarning {
    /// Paid teacher.
    pub teacher_id: UserId,
    /// Owning academy.
    pub academy_id: Option<AcademyId>,
    /// Earning session.
    pub session: SessionRef,
    /// Amount in minor currency units.
    pub amount_cents: i64,
    /// ISO 4217 currency code.
    pub currency: String,
    /// When the amount was computed.
    pub calculated_at: DateTime<Utc>,
}
