//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and cached in memory; handlers only
//! ever see the immutable `Config` in `AppState`.

use std::env;
use std::time::Duration;

/// Default per-attempt timeout for backend calls.
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 5000;
/// Default number of retries after the first backend attempt.
pub const DEFAULT_BACKEND_MAX_RETRIES: u32 = 2;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "eventgate_session";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Base URL of the ticketing backend API (no trailing slash)
    pub backend_api_url: String,
    /// Base URL of the identity provider's server API (no trailing slash)
    pub identity_api_url: String,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Server secret for identity provider API calls
    pub identity_server_secret: String,
    /// Signing key for session cookies (raw bytes)
    pub session_signing_key: Vec<u8>,

    // --- Backend call tuning ---
    /// Per-attempt timeout for backend calls
    pub backend_timeout: Duration,
    /// Retries after the first backend attempt
    pub backend_max_retries: u32,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            backend_api_url: "http://localhost:8080".to_string(),
            identity_api_url: "http://localhost:8102".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            port: 3001,
            identity_server_secret: "test_server_secret".to_string(),
            session_signing_key: b"test_session_key_32_bytes_min!!!".to_vec(),
            backend_timeout: Duration::from_millis(DEFAULT_BACKEND_TIMEOUT_MS),
            backend_max_retries: DEFAULT_BACKEND_MAX_RETRIES,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            backend_api_url: env::var("BACKEND_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("BACKEND_API_URL"))?,
            identity_api_url: env::var("IDENTITY_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_API_URL"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .unwrap_or(3001),

            identity_server_secret: env::var("IDENTITY_SERVER_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_SERVER_SECRET"))?,
            session_signing_key: env::var("SESSION_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("SESSION_SIGNING_KEY"))?
                .into_bytes(),

            backend_timeout: Duration::from_millis(
                env::var("BACKEND_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_BACKEND_TIMEOUT_MS),
            ),
            backend_max_retries: env::var("BACKEND_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_BACKEND_MAX_RETRIES),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
