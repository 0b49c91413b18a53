//! Configuration module
//!
//! Env-driven configuration for the record store and the invitation TTL.
//! The access policy (action to minimum-level mapping) lives in
//! [`crate::policy::AccessPolicy`] and is carried alongside this struct by
//! the services that need it.

use std::env;

use crate::error::AppError;

const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_INVITATION_TTL_DAYS: i64 = 7;

/// Core configuration shared by services and the store layer.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// How long an invitation stays acceptable after issue.
    pub invitation_ttl_days: i64,
    pub environment: String,
}

impl Config {
    /// Load configuration from the environment, reading a `.env` file if
    /// one is present. Only `DATABASE_URL` is required.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::InvalidInput("DATABASE_URL must be set".to_string()))?;

        Ok(Self {
            database_url,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            db_timeout_seconds: parse_env("DB_TIMEOUT_SECONDS", DEFAULT_CONNECTION_TIMEOUT_SECS)?,
            invitation_ttl_days: parse_env(
                "VERIFLOW_INVITATION_TTL_DAYS",
                DEFAULT_INVITATION_TTL_DAYS,
            )?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            db_timeout_seconds: DEFAULT_CONNECTION_TIMEOUT_SECS,
            invitation_ttl_days: DEFAULT_INVITATION_TTL_DAYS,
            environment: "development".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ttl_is_seven_days() {
        let config = Config::default();
        assert_eq!(config.invitation_ttl_days, 7);
    }
}
