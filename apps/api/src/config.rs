//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. Secrets carry development defaults so a local checkout runs
//! without setup; production deployments must set them explicitly.

use serde::{Deserialize, Serialize};
use std::env;

/// Vendra API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendraConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// Shared secret for verifying payment-provider signatures
    pub provider_secret: String,

    /// Secret key for signing onboarding tokens
    pub token_secret: String,

    /// Onboarding token lifetime in seconds
    pub token_lifetime_secs: i64,
}

impl VendraConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = VendraConfig {
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("HTTP_PORT".to_string()))?,

            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "./vendra.db".to_string()),

            provider_secret: env::var("PROVIDER_SECRET")
                .unwrap_or_else(|_| "vendra-provider-dev-secret".to_string()),

            token_secret: env::var("TOKEN_SECRET")
                .unwrap_or_else(|_| "vendra-token-dev-secret-change-in-production".to_string()),

            token_lifetime_secs: env::var("TOKEN_LIFETIME_SECS")
                .unwrap_or_else(|_| "900".to_string()) // 15 minutes
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TOKEN_LIFETIME_SECS".to_string()))?,
        };

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
