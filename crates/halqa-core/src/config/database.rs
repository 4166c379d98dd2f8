//! PostgreSQL settings.

use serde::{Deserialize, Serialize};

/// Connection pool for the attendance tables and the job queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Pool ceiling. Each running job holds at most one connection, so this
    /// should exceed `worker.concurrency`.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a free connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    /// Server-side limit per statement, in seconds. `0` disables it.
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_seconds: u64,
    /// Reported in `pg_stat_activity`.
    #[serde(default = "default_application_name")]
    pub application_name: String,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    300
}

fn default_statement_timeout() -> u64 {
    30
}

fn default_application_name() -> String {
    "halqa-worker".to_string()
}
