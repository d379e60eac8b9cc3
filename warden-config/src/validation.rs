use thiserror::Error;

use crate::constants::MIN_SECRET_LENGTH;
use crate::models::{AuthConfig, Config, SessionBackend, UserBackend};

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("authentication secret {field} {reason}")]
    WeakSecret { field: &'static str, reason: String },
    #[error("ACCESS_TOKEN_KEY and REFRESH_TOKEN_KEY must differ")]
    SharedSigningKey,
    #[error("{field} {reason}")]
    InvalidSetting { field: &'static str, reason: String },
    #[error("{backend} storage selected but {requirement} is not configured")]
    MissingBackend {
        backend: &'static str,
        requirement: &'static str,
    },
    #[error("CORS wildcard origins are not allowed when DEV_MODE is false")]
    DangerousCorsWildcard,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(&mut self, message: S, hint: H) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(config: &Config) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();

    validate_auth(&config.auth)?;

    if !config.dev_mode {
        enforce_secrets(&config.auth)?;
        if config.cors.is_wildcard_included() {
            return Err(ConfigGuardRailError::DangerousCorsWildcard);
        }
    } else if config.auth.is_default_access_key()
        || config.auth.is_default_refresh_key()
        || config.auth.is_default_pepper()
    {
        warnings.push_with_hint(
            "Placeholder authentication secrets in use",
            "Set ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY and AUTH_PASSWORD_PEPPER before leaving DEV_MODE",
        );
    }

    if config.needs_postgres() && config.database.url.is_none() {
        return Err(ConfigGuardRailError::MissingBackend {
            backend: "postgres",
            requirement: "DATABASE_URL",
        });
    }

    if config.storage.sessions == SessionBackend::Redis && config.redis.is_none() {
        return Err(ConfigGuardRailError::MissingBackend {
            backend: "redis",
            requirement: "REDIS_URL",
        });
    }

    if config.storage.sessions == SessionBackend::Memory
        || config.storage.users == UserBackend::Memory
    {
        warnings.push_with_hint(
            "In-memory storage selected; users and sessions are lost on restart",
            "Set SESSION_STORE and USER_STORE to postgres for persistent storage",
        );
    }

    if config.storage.sessions == SessionBackend::Postgres
        && config.auth.session_sweep_interval.is_none()
    {
        warnings.push_with_hint(
            "SESSION_SWEEP_INTERVAL not set; expired sessions accumulate until their owner signs in again",
            "Set SESSION_SWEEP_INTERVAL (for example `1h`) to purge expired rows periodically",
        );
    }

    Ok(warnings)
}

fn validate_auth(auth: &AuthConfig) -> Result<(), ConfigGuardRailError> {
    if auth.access_token_key == auth.refresh_token_key {
        return Err(ConfigGuardRailError::SharedSigningKey);
    }

    if auth.max_sessions_per_user == 0 {
        return Err(ConfigGuardRailError::InvalidSetting {
            field: "MAX_SESSIONS_PER_USER",
            reason: "must be at least 1".into(),
        });
    }

    for (field, duration) in [
        ("ACCESS_TOKEN_EXPIRATION", Some(auth.access_token_expiration)),
        ("REFRESH_TOKEN_EXPIRATION", Some(auth.refresh_token_expiration)),
        ("SESSION_SWEEP_INTERVAL", auth.session_sweep_interval),
    ] {
        if duration.is_some_and(|value| value.is_zero()) {
            return Err(ConfigGuardRailError::InvalidSetting {
                field,
                reason: "must be greater than zero".into(),
            });
        }
    }

    Ok(())
}

fn enforce_secrets(auth: &AuthConfig) -> Result<(), ConfigGuardRailError> {
    let secrets = [
        (
            "ACCESS_TOKEN_KEY",
            auth.access_token_key.as_str(),
            auth.is_default_access_key(),
        ),
        (
            "REFRESH_TOKEN_KEY",
            auth.refresh_token_key.as_str(),
            auth.is_default_refresh_key(),
        ),
        (
            "AUTH_PASSWORD_PEPPER",
            auth.password_pepper.as_str(),
            auth.is_default_pepper(),
        ),
    ];

    for (field, value, is_default) in secrets {
        if is_default {
            return Err(ConfigGuardRailError::WeakSecret {
                field,
                reason: "uses the default placeholder value".into(),
            });
        }
        if value.len() < MIN_SECRET_LENGTH {
            return Err(ConfigGuardRailError::WeakSecret {
                field,
                reason: format!("must be at least {MIN_SECRET_LENGTH} characters"),
            });
        }
    }

    Ok(())
}
