use std::path::PathBuf;

use thiserror::Error;

use crate::models::UnknownBackend;
use crate::validation::ConfigGuardRailError;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration `{value}` for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid {field}")]
    InvalidBackend {
        field: &'static str,
        #[source]
        source: UnknownBackend,
    },
    #[error("invalid Redis URL")]
    InvalidRedisUrl {
        #[source]
        source: url::ParseError,
    },
    #[error("failed to encode Redis password into URL")]
    InvalidRedisPassword,
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}
