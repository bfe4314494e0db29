//! Server configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use pharma_core::{Money, Rate};
use serde::{Deserialize, Serialize};
use std::env;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// Path to the SQLite database file
    pub database_path: String,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Default sales tax rate in basis points (700 = 7%)
    pub tax_rate_bps: u32,

    /// Flat dispensing fee in cents, added to prescription checkouts
    pub dispensing_fee_cents: i64,

    /// Whether prescription-category lines are exempt from sales tax
    pub prescription_tax_exempt: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = ServerConfig {
            http_port: env::var("PHARMA_HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PHARMA_HTTP_PORT".to_string()))?,

            database_path: env::var("PHARMA_DATABASE_PATH")
                .unwrap_or_else(|_| "./pharma.db".to_string()),

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                // In production, this MUST be set via environment variable
                "pharma-dev-secret-change-in-production".to_string()
            }),

            jwt_lifetime_secs: env::var("JWT_LIFETIME_SECS")
                .unwrap_or_else(|_| "3600".to_string()) // 1 hour
                .parse()
                .map_err(|_| ConfigError::InvalidValue("JWT_LIFETIME_SECS".to_string()))?,

            tax_rate_bps: env::var("TAX_RATE_BPS")
                .unwrap_or_else(|_| "700".to_string()) // 7%
                .parse()
                .map_err(|_| ConfigError::InvalidValue("TAX_RATE_BPS".to_string()))?,

            dispensing_fee_cents: env::var("DISPENSING_FEE_CENTS")
                .unwrap_or_else(|_| "300".to_string()) // $3.00
                .parse()
                .map_err(|_| ConfigError::InvalidValue("DISPENSING_FEE_CENTS".to_string()))?,

            prescription_tax_exempt: env::var("PRESCRIPTION_TAX_EXEMPT")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
        };

        Ok(config)
    }

    /// The configured tax rate, clamped into [0%, 100%].
    pub fn tax_rate(&self) -> Rate {
        Rate::from_bps(self.tax_rate_bps)
    }

    /// The configured dispensing fee.
    pub fn dispensing_fee(&self) -> Money {
        Money::from_cents(self.dispensing_fee_cents)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        // Only read defaults; env overrides are exercised in deployment.
        let config = ServerConfig {
            http_port: 8080,
            database_path: "./pharma.db".to_string(),
            jwt_secret: "s".to_string(),
            jwt_lifetime_secs: 3600,
            tax_rate_bps: 700,
            dispensing_fee_cents: 300,
            prescription_tax_exempt: true,
        };
        assert_eq!(config.tax_rate().bps(), 700);
        assert_eq!(config.dispensing_fee().cents(), 300);
    }
}
