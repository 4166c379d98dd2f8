//! Core traits defined in `halqa-core` and implemented by other crates.

pub mod cache;
pub mod conferencing;

pub use cache::CacheProvider;
pub use conferencing::LiveRoomProvider;
