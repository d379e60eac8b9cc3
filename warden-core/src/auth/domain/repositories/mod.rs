use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::domain::aggregates::{RefreshSessionRecord, UserRecord};

/// Failures reported by session and user stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("record already exists")]
    Conflict,
    /// The backend could not be reached or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
    /// A stored value could not be decoded.
    #[error("stored record is malformed: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable(err: impl Into<anyhow::Error>) -> Self {
        StoreError::Unavailable(err.into())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(err.to_string())
            }
            _ => StoreError::unavailable(err),
        }
    }
}

#[cfg(feature = "database")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::unavailable(err)
    }
}

/// Durable storage for live refresh sessions.
///
/// Every method is atomic with respect to concurrent callers. In particular
/// `get_and_delete` hands a given record to at most one caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, record: &RefreshSessionRecord) -> Result<(), StoreError>;

    /// Remove and return the session stored under `token_hash`.
    async fn get_and_delete(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshSessionRecord>, StoreError>;

    /// Number of unexpired sessions held by `user_id`.
    async fn count_by_user(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// Delete every session for `user_id`, returning how many were removed.
    async fn delete_all_by_user(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// Delete one session. Unknown hashes are not an error.
    async fn delete_one(&self, token_hash: &str) -> Result<(), StoreError>;

    /// Insert `record`, first wiping all of the user's sessions when they
    /// already hold `max_sessions` live ones. Returns the number evicted.
    ///
    /// The default composes the primitive operations and is only atomic per
    /// step; stores override it to make the whole sequence one unit.
    async fn create_capped(
        &self,
        record: &RefreshSessionRecord,
        max_sessions: u64,
    ) -> Result<u64, StoreError> {
        let live = self.count_by_user(record.user_id).await?;
        let evicted = if live >= max_sessions {
            self.delete_all_by_user(record.user_id).await?
        } else {
            0
        };
        self.create(record).await?;
        Ok(evicted)
    }

    /// Drop sessions whose expiry has passed. Returns the number removed.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

/// User credential storage.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. A taken username yields [`StoreError::Conflict`].
    async fn create(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
    ) -> Result<Uuid, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError>;
}
