//! # halqa-entity
//!
//! Domain entity models for the Halqa attendance pipeline. Every struct in
//! this crate represents a database table row or a domain value object. All
//! entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod attendance;
pub mod earning;
pub mod job;
pub mod report;
pub mod session;
pub mod user;
