use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;
use warden_config::{Config, SessionBackend, UserBackend};
use warden_core::auth::{
    AuthCrypto, AuthOrchestrator, SessionManager, SessionSettings, TokenSigner,
    domain::repositories::{SessionStore, UserStore},
    infrastructure::repositories::{
        InMemorySessionStore, InMemoryUserStore, PostgresSessionStore, PostgresUserStore,
        RedisSessionStore,
    },
};

use super::app_state::AppState;

/// Connect to every configured backend and wire the authentication stack.
pub async fn build_app_state(config: Arc<Config>) -> Result<AppState> {
    let pool = if config.needs_postgres() {
        let pool = connect_postgres(&config).await?;
        run_migrations(&pool).await?;
        Some(pool)
    } else {
        None
    };

    let sessions: Arc<dyn SessionStore> = match config.storage.sessions {
        SessionBackend::Memory => Arc::new(InMemorySessionStore::new()),
        SessionBackend::Postgres => {
            Arc::new(PostgresSessionStore::new(require_pool(pool.as_ref())?))
        }
        SessionBackend::Redis => {
            let redis = config
                .redis
                .as_ref()
                .context("REDIS_URL must be set for the redis session store")?;
            Arc::new(
                RedisSessionStore::connect(&redis.url)
                    .await
                    .context("failed to connect to Redis")?,
            )
        }
    };

    let users: Arc<dyn UserStore> = match config.storage.users {
        UserBackend::Memory => Arc::new(InMemoryUserStore::new()),
        UserBackend::Postgres => Arc::new(PostgresUserStore::new(require_pool(pool.as_ref())?)),
    };

    info!(
        sessions = %config.storage.sessions,
        users = %config.storage.users,
        max_sessions_per_user = config.auth.max_sessions_per_user,
        "storage backends ready"
    );

    let crypto = Arc::new(
        AuthCrypto::new(&config.auth.password_pepper, &config.auth.refresh_token_key)
            .context("failed to initialise authentication crypto")?,
    );
    let auth = assemble_auth(&config, sessions, users, crypto)?;

    Ok(AppState::new(auth, config))
}

/// Build the orchestrator from already constructed stores.
pub fn assemble_auth(
    config: &Config,
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    crypto: Arc<AuthCrypto>,
) -> Result<AuthOrchestrator> {
    let access_lifetime = chrono::Duration::from_std(config.auth.access_token_expiration)
        .context("ACCESS_TOKEN_EXPIRATION is out of range")?;
    let refresh_lifetime = chrono::Duration::from_std(config.auth.refresh_token_expiration)
        .context("REFRESH_TOKEN_EXPIRATION is out of range")?;

    let signer = Arc::new(
        TokenSigner::from_secrets(
            &config.auth.access_token_key,
            access_lifetime,
            &config.auth.refresh_token_key,
            refresh_lifetime,
        )
        .context("failed to initialise token signer")?,
    );

    let settings = SessionSettings {
        refresh_token_lifetime: refresh_lifetime,
        max_sessions_per_user: config.auth.max_sessions_per_user,
    };
    let manager = SessionManager::new(sessions, crypto.clone(), settings);

    Ok(AuthOrchestrator::new(users, manager, signer, crypto))
}

pub async fn connect_postgres(config: &Config) -> Result<PgPool> {
    let url = config
        .database
        .url
        .as_deref()
        .context("DATABASE_URL must be set for PostgreSQL storage")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;
    info!("Successfully connected to PostgreSQL");
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    warden_core::MIGRATOR
        .run(pool)
        .await
        .context("database migration failed")?;
    info!("Database migrations applied");
    Ok(())
}

fn require_pool(pool: Option<&PgPool>) -> Result<PgPool> {
    pool.cloned()
        .context("PostgreSQL pool was not initialised for a PostgreSQL backend")
}
