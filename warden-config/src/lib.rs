//! Configuration loading for Warden.
//!
//! Settings are layered: environment variables (optionally seeded from a
//! `.env` file) override a TOML file, which overrides built-in defaults.
//! Guard rails reject placeholder secrets outside dev mode.

pub mod constants;
pub mod loader;
pub mod models;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoader, ConfigLoaderOptions, error::ConfigLoadError};
pub use models::{
    AuthConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig, RedisConfig, ServerConfig,
    SessionBackend, StorageConfig, UserBackend,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
