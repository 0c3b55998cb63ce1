use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Immutable process configuration, resolved once at startup and passed down
/// to every lifecycle step. Nothing else in the crate reads the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::resolve(|key| env::var(key).ok())
    }

    /// Resolve configuration through an injectable lookup so tests can supply
    /// variables without touching process environment.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database = DatabaseConfig {
            host: lookup("DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(&lookup, "DB_PORT", 3306),
            user: lookup("DB_USER").unwrap_or_else(|| "root".to_string()),
            password: lookup("DB_PASSWORD").unwrap_or_else(|| "password".to_string()),
            database: lookup("DB_NAME").unwrap_or_else(|| "helpdesk_db".to_string()),
            max_connections: parse_or(&lookup, "DB_POOL_MAX", 5),
            min_connections: parse_or(&lookup, "DB_POOL_MIN", 0),
            acquire_timeout_secs: parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECS", 30),
            idle_timeout_secs: parse_or(&lookup, "DB_IDLE_TIMEOUT_SECS", 10),
        };

        let server = ServerConfig {
            port: parse_or(&lookup, "PORT", 5000),
        };

        Self { database, server }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
