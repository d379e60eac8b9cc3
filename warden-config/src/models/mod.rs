//! Resolved configuration models.

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_ACCESS_TOKEN_KEY, DEFAULT_PASSWORD_PEPPER, DEFAULT_REFRESH_TOKEN_KEY,
};

pub mod sources;

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: Option<RedisConfig>,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub dev_mode: bool,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn needs_postgres(&self) -> bool {
        self.storage.sessions == SessionBackend::Postgres
            || self.storage.users == UserBackend::Postgres
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Where refresh sessions are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Memory,
    Postgres,
    Redis,
}

/// Where user accounts are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown storage backend `{0}`")]
pub struct UnknownBackend(pub String);

impl FromStr for SessionBackend {
    type Err = UnknownBackend;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "redis" => Ok(Self::Redis),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

impl FromStr for UserBackend {
    type Err = UnknownBackend;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for SessionBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
            Self::Redis => "redis",
        })
    }
}

impl fmt::Display for UserBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
        })
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub sessions: SessionBackend,
    pub users: UserBackend,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub access_token_key: String,
    pub access_token_expiration: Duration,
    pub refresh_token_key: String,
    pub refresh_token_expiration: Duration,
    pub max_sessions_per_user: u64,
    pub password_pepper: String,
    /// Interval of the expired-session purge. `None` disables the sweeper.
    pub session_sweep_interval: Option<Duration>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_key", &"<redacted>")
            .field("access_token_expiration", &self.access_token_expiration)
            .field("refresh_token_key", &"<redacted>")
            .field("refresh_token_expiration", &self.refresh_token_expiration)
            .field("max_sessions_per_user", &self.max_sessions_per_user)
            .field("password_pepper", &"<redacted>")
            .field("session_sweep_interval", &self.session_sweep_interval)
            .finish()
    }
}

impl AuthConfig {
    pub fn is_default_access_key(&self) -> bool {
        self.access_token_key == DEFAULT_ACCESS_TOKEN_KEY
    }

    pub fn is_default_refresh_key(&self) -> bool {
        self.refresh_token_key == DEFAULT_REFRESH_TOKEN_KEY
    }

    pub fn is_default_pepper(&self) -> bool {
        self.password_pepper == DEFAULT_PASSWORD_PEPPER
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn is_wildcard_included(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
