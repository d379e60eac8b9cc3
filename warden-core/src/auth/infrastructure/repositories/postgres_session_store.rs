use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::domain::aggregates::RefreshSessionRecord;
use crate::auth::domain::repositories::{SessionStore, StoreError};
use crate::auth::domain::value_objects::ClientFingerprint;

#[derive(sqlx::FromRow)]
struct SessionRow {
    token_hash: String,
    user_id: Uuid,
    user_agent: String,
    fingerprint: String,
    ip: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for RefreshSessionRecord {
    type Error = StoreError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let fingerprint = ClientFingerprint::new(row.user_agent, row.fingerprint, row.ip)
            .map_err(|err| StoreError::Corrupt(err.to_string()))?;
        Ok(Self {
            token_hash: row.token_hash,
            user_id: row.user_id,
            expires_at: row.expires_at,
            fingerprint,
            created_at: row.created_at,
        })
    }
}

/// `refresh_sessions` table. The pop is a single `DELETE ... RETURNING`.
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl fmt::Debug for PostgresSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresSessionStore").finish()
    }
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_SESSION: &str = r#"
    INSERT INTO refresh_sessions (
        token_hash,
        user_id,
        user_agent,
        fingerprint,
        ip,
        expires_at,
        created_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7)
"#;

fn bind_insert<'q>(
    record: &'q RefreshSessionRecord,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(INSERT_SESSION)
        .bind(&record.token_hash)
        .bind(record.user_id)
        .bind(record.fingerprint.user_agent())
        .bind(record.fingerprint.fingerprint_id())
        .bind(record.fingerprint.ip())
        .bind(record.expires_at)
        .bind(record.created_at)
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    async fn create(&self, record: &RefreshSessionRecord) -> Result<(), StoreError> {
        bind_insert(record).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_and_delete(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshSessionRecord>, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            DELETE FROM refresh_sessions
            WHERE token_hash = $1
            RETURNING token_hash, user_id, user_agent, fingerprint, ip, expires_at, created_at
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        row.map(RefreshSessionRecord::try_from).transpose()
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM refresh_sessions WHERE user_id = $1 AND expires_at > $2",
        )
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }

    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_one(&self, token_hash: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_capped(
        &self,
        record: &RefreshSessionRecord,
        max_sessions: u64,
    ) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Serialises capped inserts per user until the transaction ends.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(record.user_id.to_string())
            .execute(&mut *tx)
            .await?;

        let live: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM refresh_sessions WHERE user_id = $1 AND expires_at > $2",
        )
        .bind(record.user_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let evicted = if live.max(0) as u64 >= max_sessions {
            sqlx::query("DELETE FROM refresh_sessions WHERE user_id = $1")
                .bind(record.user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        } else {
            0
        };

        bind_insert(record).execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(evicted)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at <= $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
