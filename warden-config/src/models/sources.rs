use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{SessionBackend, UserBackend};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    pub redis: Option<FileRedisConfig>,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub auth: FileAuthConfig,
    #[serde(default)]
    pub cors: FileCorsConfig,
    pub dev_mode: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileRedisConfig {
    pub url: String,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<SessionBackend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<UserBackend>,
}

/// Durations are humantime strings such as `30m` or `50h`.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_expiration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_expiration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sessions_per_user: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_pepper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_sweep_interval: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    pub redis_url: Option<String>,
    pub redis_host: Option<String>,
    pub redis_port: Option<u16>,
    pub redis_password: Option<String>,
    pub session_store: Option<String>,
    pub user_store: Option<String>,
    pub access_token_key: Option<String>,
    pub access_token_expiration: Option<String>,
    pub refresh_token_key: Option<String>,
    pub refresh_token_expiration: Option<String>,
    pub max_sessions_per_user: Option<u64>,
    pub password_pepper: Option<String>,
    pub session_sweep_interval: Option<String>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub dev_mode: Option<bool>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the environment layer from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let first = |names: &[&str]| names.iter().find_map(|name| var(*name));

        Self {
            config_path: var("WARDEN_CONFIG_PATH").map(PathBuf::from),
            server_host: var("SERVER_HOST"),
            server_port: first(&["SERVER_PORT", "APP_PORT"]).and_then(|s| s.parse().ok()),
            database_url: first(&["DATABASE_URL", "CONNECTION_STRING"]),
            database_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok()),
            redis_url: var("REDIS_URL"),
            redis_host: var("REDIS_HOST"),
            redis_port: var("REDIS_PORT").and_then(|s| s.parse().ok()),
            redis_password: var("REDIS_PASS"),
            session_store: var("SESSION_STORE"),
            user_store: var("USER_STORE"),
            access_token_key: var("ACCESS_TOKEN_KEY"),
            access_token_expiration: var("ACCESS_TOKEN_EXPIRATION"),
            refresh_token_key: var("REFRESH_TOKEN_KEY"),
            refresh_token_expiration: var("REFRESH_TOKEN_EXPIRATION"),
            max_sessions_per_user: var("MAX_SESSIONS_PER_USER").and_then(|s| s.parse().ok()),
            password_pepper: var("AUTH_PASSWORD_PEPPER"),
            session_sweep_interval: var("SESSION_SWEEP_INTERVAL"),
            cors_allowed_origins: var("CORS_ALLOWED_ORIGINS").map(|raw| parse_csv(&raw)),
            dev_mode: var("DEV_MODE").and_then(|raw| parse_bool(&raw)),
        }
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
