//! Server configuration from environment variables.
//!
//! Secrets stay in the environment; everything else has a default that works
//! for local development.

use std::net::SocketAddr;
use thiserror::Error;

/// Why configuration loading failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is absent.
    #[error("environment variable not set: {0}")]
    Missing(&'static str),
    /// A variable is set but does not parse.
    #[error("invalid value for {name}: {value}")]
    Invalid {
        /// The offending variable.
        name: &'static str,
        /// What it was set to.
        value: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Connection pool size.
    pub max_connections: u32,
}

impl Config {
    /// Reads configuration from the environment.
    ///
    /// `DATABASE_URL` is required. `BIND_ADDR` defaults to `0.0.0.0:8000`,
    /// `DATABASE_MAX_CONNECTIONS` to `10`.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when `DATABASE_URL` is unset or a variable fails to
    /// parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let bind_addr = parsed("BIND_ADDR", "0.0.0.0:8000")?;
        let max_connections = parsed("DATABASE_MAX_CONNECTIONS", "10")?;
        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
        })
    }
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let value = std::env::var(name).unwrap_or_else(|_| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
