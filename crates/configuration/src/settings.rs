use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

/// Connection parameters for the PostgreSQL pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// A Postgres connection string. `DATABASE_URL` takes precedence.
    pub url: String,
    pub max_connections: u32,
    /// How long to wait for a free pooled connection before giving up.
    pub acquire_timeout_secs: u64,
}

/// Where the HTTP API listens.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// bcrypt work factor applied at signup. Valid range is 4..=31.
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info" or "database=debug").
    pub level: String,
    /// If set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
}

// --- Default Implementations ---

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "postgresql:///warbler".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3000 }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self { bcrypt_cost: 12 }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), directory: None }
    }
}

impl DatabaseSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.host.parse().map_err(|_| {
            ConfigError::ValidationError(format!("server.host '{}' is not an IP address", self.host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Settings {
    /// Rejects values that would only fail later, deep inside a request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::ValidationError("database.url must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be greater than zero".into(),
            ));
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::ValidationError(format!(
                "auth.bcrypt_cost must be between 4 and 31, got {}",
                self.auth.bcrypt_cost
            )));
        }
        self.server.socket_addr()?;
        Ok(())
    }
}
