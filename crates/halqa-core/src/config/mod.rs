//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod attendance;
pub mod cache;
pub mod database;
pub mod earnings;
pub mod livekit;
pub mod logging;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::attendance::AttendanceConfig;
pub use self::cache::CacheConfig;
pub use self::database::DatabaseConfig;
pub use self::earnings::EarningsConfig;
pub use self::livekit::LiveKitConfig;
pub use self::logging::LoggingConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Cache provider settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Attendance policy thresholds.
    #[serde(default)]
    pub attendance: AttendanceConfig,
    /// Live-conferencing provider settings.
    #[serde(default)]
    pub livekit: LiveKitConfig,
    /// Teacher earnings rates.
    #[serde(default)]
    pub earnings: EarningsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `HALQA__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("HALQA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let raw = serde_json::json!({
            "database": { "url": "postgres://localhost/halqa" }
        });
        let config: AppConfig = serde_json::from_value(raw).unwrap();

        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.cache.provider, "memory");
        assert_eq!(config.worker.retry_max_attempts, 3);
        assert_eq!(config.worker.retry_backoff_seconds, 60);
        assert_eq!(config.worker.job_lease_seconds, 900);
        assert_eq!(config.attendance.orphan_staleness_minutes, 120);
        assert_eq!(config.attendance.calculation_delay_minutes, 5);
        assert_eq!(config.attendance.retention_days, 7);
        assert_eq!(config.attendance.late_tolerance_minutes, 15);
        assert_eq!(config.logging.format, "json");
    }
}
