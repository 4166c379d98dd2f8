//! Teacher earnings configuration.

use serde::{Deserialize, Serialize};

/// Flat per-session rates, in minor currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsConfig {
    /// Rate paid for a completed Quran session.
    #[serde(default = "default_quran_rate")]
    pub quran_session_rate_cents: i64,
    /// Rate paid for a completed academic session.
    #[serde(default = "default_academic_rate")]
    pub academic_session_rate_cents: i64,
    /// ISO 4217 currency code stamped on earnings.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for EarningsConfig {
    fn default() -> Self {
        Self {
            quran_session_rate_cents: default_quran_rate(),
            academic_session_rate_cents: default_academic_rate(),
            currency: default_currency(),
        }
    }
}

fn default_quran_rate() -> i64 {
    5000
}

fn default_academic_rate() -> i64 {
    7500
}

fn default_currency() -> String {
    "SAR".to_string()
}
