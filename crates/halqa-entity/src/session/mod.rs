//! Scheduled session entities (Quran and academic classes).

pub mod kind;
pub mod model;

pub use kind::{ParseSessionKindError, SessionKind, SessionRef, SessionStatus};
pub use model::Session;
