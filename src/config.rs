//! Configuration management

use anyhow::{Context, Result};

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// PostgreSQL connection string
    pub database_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url =
            std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        Ok(Self {
            nats_url,
            database_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_nats_url_uses_env_when_set() {
        std::env::set_var("NATS_URL", "nats://broker:4222");
        std::env::set_var("DATABASE_URL", "postgres://test");

        let config = Config::from_env().unwrap();
        assert_eq!(config.nats_url, "nats://broker:4222");

        // Cleanup
        std::env::remove_var("NATS_URL");
    }

    #[test]
    #[ignore] // requires --test-threads=1 due to env var race
    fn test_config_requires_database_url() {
        std::env::remove_var("DATABASE_URL");
        assert!(Config::from_env().is_err());
    }
}
