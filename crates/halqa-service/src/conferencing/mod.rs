//! Conferencing provider clients.

pub mod livekit;

pub use livekit::LiveKitRoomClient;
