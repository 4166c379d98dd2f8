//! Redis backend, shared by every worker process of a deployment.

pub mod client;
pub mod operations;

pub use client::RedisClient;
pub use operations::RedisCacheProvider;
