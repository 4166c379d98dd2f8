//! # halqa-database
//!
//! PostgreSQL connection management, the store traits the attendance
//! pipeline is written against, their PostgreSQL repositories, and an
//! in-process backend used by tests and local runs.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
