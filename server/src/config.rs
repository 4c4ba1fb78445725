//! Configuration management for the server.

use chrono::TimeDelta;
use std::env;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Upper bound on pooled database connections
    pub max_connections: u32,
    /// How long an open merge session blocks its event
    pub session_ttl: TimeDelta,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let database_url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidNumber("DATABASE_MAX_CONNECTIONS"))?;

        let session_ttl = parse_session_ttl(
            &env::var("MERGE_SESSION_TTL_SECS").unwrap_or_else(|_| "3600".to_string()),
        )?;

        Ok(Self {
            host,
            port,
            database_url,
            max_connections,
            session_ttl,
        })
    }
}

/// Positive whole seconds that fit a `TimeDelta`.
fn parse_session_ttl(value: &str) -> Result<TimeDelta, ConfigError> {
    value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|secs| *secs > 0)
        .and_then(TimeDelta::try_seconds)
        .ok_or(ConfigError::InvalidNumber("MERGE_SESSION_TTL_SECS"))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DATABASE_URL environment variable is required")]
    MissingDatabaseUrl,

    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("Invalid numeric value for {0}")]
    InvalidNumber(&'static str),
}
