use std::{fs, path::PathBuf, time::Duration};

use once_cell::sync::Lazy;
use url::Url;

use crate::constants::{
    DEFAULT_ACCESS_TOKEN_EXPIRATION, DEFAULT_ACCESS_TOKEN_KEY, DEFAULT_DATABASE_MAX_CONNECTIONS,
    DEFAULT_HOST, DEFAULT_MAX_SESSIONS_PER_USER, DEFAULT_PASSWORD_PEPPER, DEFAULT_PORT,
    DEFAULT_REDIS_PORT, DEFAULT_REFRESH_TOKEN_EXPIRATION, DEFAULT_REFRESH_TOKEN_KEY,
};
use crate::models::{
    AuthConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig, RedisConfig, ServerConfig,
    SessionBackend, StorageConfig, UserBackend,
    sources::{EnvConfig, FileConfig, FileRedisConfig},
};
use crate::validation::{self, ConfigWarnings};

pub mod error;

use error::ConfigLoadError;

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("warden.toml"),
        PathBuf::from("config/warden.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Loads `.env`, then resolves the process environment over the file.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path)
                .map(|_| true)
                .or_else(tolerate_missing_env_file)?,
            None => dotenvy::dotenv()
                .map(|_| true)
                .or_else(tolerate_missing_env_file)?,
        };

        self.load_with_env(EnvConfig::gather(), env_file_loaded)
    }

    /// Resolves configuration against an already gathered environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) = compose_config(file_config, env, config_path, env_file_loaded)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env.config_path {
            source.env = Some(from_env.clone());
        } else {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
                .cloned();
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
            path: path.clone(),
            source,
        })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

fn tolerate_missing_env_file(err: dotenvy::Error) -> Result<bool, dotenvy::Error> {
    match err {
        dotenvy::Error::Io(_) => Ok(false),
        other => Err(other),
    }
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
    env_file_loaded: bool,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if file_config.is_none() {
        warnings.push_with_hint(
            "No warden.toml detected; falling back to environment variables",
            "Pass --config or set WARDEN_CONFIG_PATH to use a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        database: file_database,
        redis: file_redis,
        storage: file_storage,
        auth: file_auth,
        cors: file_cors,
        dev_mode: file_dev_mode,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: env.server_port.or(file_server.port).unwrap_or(DEFAULT_PORT),
    };

    let database = DatabaseConfig {
        url: env
            .database_url
            .clone()
            .or(file_database.url)
            .filter(|url| !url.trim().is_empty()),
        max_connections: env
            .database_max_connections
            .or(file_database.max_connections)
            .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
    };

    let redis = resolve_redis(&env, file_redis)?;

    let storage = StorageConfig {
        sessions: match env.session_store.as_deref() {
            Some(raw) => raw
                .parse()
                .map_err(|source| ConfigLoadError::InvalidBackend {
                    field: "SESSION_STORE",
                    source,
                })?,
            None => file_storage.sessions.unwrap_or(SessionBackend::Postgres),
        },
        users: match env.user_store.as_deref() {
            Some(raw) => raw
                .parse()
                .map_err(|source| ConfigLoadError::InvalidBackend {
                    field: "USER_STORE",
                    source,
                })?,
            None => file_storage.users.unwrap_or(UserBackend::Postgres),
        },
    };

    let auth = AuthConfig {
        access_token_key: env
            .access_token_key
            .clone()
            .or(file_auth.access_token_key)
            .unwrap_or_else(|| DEFAULT_ACCESS_TOKEN_KEY.to_string()),
        access_token_expiration: parse_duration(
            "ACCESS_TOKEN_EXPIRATION",
            env.access_token_expiration
                .clone()
                .or(file_auth.access_token_expiration)
                .as_deref()
                .unwrap_or(DEFAULT_ACCESS_TOKEN_EXPIRATION),
        )?,
        refresh_token_key: env
            .refresh_token_key
            .clone()
            .or(file_auth.refresh_token_key)
            .unwrap_or_else(|| DEFAULT_REFRESH_TOKEN_KEY.to_string()),
        refresh_token_expiration: parse_duration(
            "REFRESH_TOKEN_EXPIRATION",
            env.refresh_token_expiration
                .clone()
                .or(file_auth.refresh_token_expiration)
                .as_deref()
                .unwrap_or(DEFAULT_REFRESH_TOKEN_EXPIRATION),
        )?,
        max_sessions_per_user: env
            .max_sessions_per_user
            .or(file_auth.max_sessions_per_user)
            .unwrap_or(DEFAULT_MAX_SESSIONS_PER_USER),
        password_pepper: env
            .password_pepper
            .clone()
            .or(file_auth.password_pepper)
            .unwrap_or_else(|| DEFAULT_PASSWORD_PEPPER.to_string()),
        session_sweep_interval: env
            .session_sweep_interval
            .clone()
            .or(file_auth.session_sweep_interval)
            .map(|raw| parse_duration("SESSION_SWEEP_INTERVAL", &raw))
            .transpose()?,
    };

    let cors = CorsConfig {
        allowed_origins: env
            .cors_allowed_origins
            .clone()
            .or(file_cors.allowed_origins)
            .unwrap_or_default(),
    };

    let config = Config {
        server,
        database,
        redis,
        storage,
        auth,
        cors,
        dev_mode: env.dev_mode.or(file_dev_mode).unwrap_or(false),
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded,
        },
    };

    warnings.extend(validation::apply_guard_rails(&config)?);

    Ok((config, warnings))
}

fn parse_duration(field: &'static str, raw: &str) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|source| ConfigLoadError::InvalidDuration {
        field,
        value: raw.to_string(),
        source,
    })
}

/// `REDIS_URL` wins; otherwise a URL is assembled from `REDIS_HOST`,
/// `REDIS_PORT` and `REDIS_PASS`, then the file section is consulted.
fn resolve_redis(
    env: &EnvConfig,
    file_redis: Option<FileRedisConfig>,
) -> Result<Option<RedisConfig>, ConfigLoadError> {
    if let Some(url) = env.redis_url.clone() {
        return Ok(Some(RedisConfig { url }));
    }

    if let Some(host) = env.redis_host.as_deref() {
        let port = env.redis_port.unwrap_or(DEFAULT_REDIS_PORT);
        let mut url = Url::parse(&format!("redis://{host}:{port}"))
            .map_err(|source| ConfigLoadError::InvalidRedisUrl { source })?;
        if let Some(password) = env.redis_password.as_deref() {
            url.set_password(Some(password))
                .map_err(|_| ConfigLoadError::InvalidRedisPassword)?;
        }
        return Ok(Some(RedisConfig {
            url: url.to_string(),
        }));
    }

    Ok(file_redis.map(|redis| RedisConfig { url: redis.url }))
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(self, ConfigPathProvenance::Explicit | ConfigPathProvenance::Env)
    }
}
