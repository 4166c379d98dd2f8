//! Per-session-kind attendance report projection.

pub mod model;

pub use model::{SessionReport, UpsertSessionReport};
