//! Built-in defaults.

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 22800;

/// Placeholder secrets. Accepted only in dev mode.
pub const DEFAULT_ACCESS_TOKEN_KEY: &str = "warden-dev-access-token-key";
pub const DEFAULT_REFRESH_TOKEN_KEY: &str = "warden-dev-refresh-token-key";
pub const DEFAULT_PASSWORD_PEPPER: &str = "warden-dev-password-pepper";

pub const DEFAULT_ACCESS_TOKEN_EXPIRATION: &str = "30m";
pub const DEFAULT_REFRESH_TOKEN_EXPIRATION: &str = "3000m";
pub const DEFAULT_MAX_SESSIONS_PER_USER: u64 = 5;

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_REDIS_PORT: u16 = 6379;

pub const MIN_SECRET_LENGTH: usize = 32;
