//! # halqa-core
//!
//! Core crate for the Halqa attendance pipeline. Contains configuration
//! schemas, typed identifiers, the collaborator traits implemented by other
//! crates, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Halqa crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
