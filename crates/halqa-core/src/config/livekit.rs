//! LiveKit room service configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the LiveKit room service API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveKitConfig {
    /// Base URL of the LiveKit server (e.g. `https://livekit.example.com`).
    #[serde(default = "default_url")]
    pub url: String,
    /// API key used as the token issuer.
    #[serde(default)]
    pub api_key: String,
    /// API secret used to sign access tokens.
    #[serde(default)]
    pub api_secret: String,
    /// Lifetime of generated admin tokens in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: i64,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_seconds: default_token_ttl(),
            request_timeout_seconds: default_timeout(),
        }
    }
}

fn default_url() -> String {
    "http://localhost:7880".to_string()
}

fn default_token_ttl() -> i64 {
    600
}

fn default_timeout() -> u64 {
    10
}
