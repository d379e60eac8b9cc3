use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::AuthCrypto;
use crate::auth::domain::aggregates::{RefreshSession, RefreshSessionRecord};
use crate::auth::domain::repositories::{SessionStore, StoreError};
use crate::auth::domain::value_objects::{ClientFingerprint, RefreshToken};

/// Session lifetime and per-user cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub refresh_token_lifetime: Duration,
    pub max_sessions_per_user: u64,
}

impl SessionSettings {
    pub const DEFAULT_MAX_SESSIONS_PER_USER: u64 = 5;

    pub fn default_refresh_token_lifetime() -> Duration {
        Duration::minutes(3000)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_token_lifetime: Self::default_refresh_token_lifetime(),
            max_sessions_per_user: Self::DEFAULT_MAX_SESSIONS_PER_USER,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("refresh session not found")]
    NotFound,
    #[error("refresh session expired")]
    Expired,
    #[error("client fingerprint mismatch")]
    FingerprintMismatch,
    #[error("operation cancelled")]
    Cancelled,
    #[error("refresh token generation failed")]
    TokenGeneration,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("session task failed: {0}")]
    Task(String),
}

/// Issues, rotates and revokes refresh sessions on top of a [`SessionStore`].
///
/// Sessions are single use: rotation pops the presented session and issues a
/// replacement. A rotation attempt with an expired session or an unrecognised
/// client purges every session the user holds.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    crypto: Arc<AuthCrypto>,
    settings: SessionSettings,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("store_refs", &Arc::strong_count(&self.store))
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), SessionError> {
    if cancel.is_cancelled() {
        return Err(SessionError::Cancelled);
    }
    Ok(())
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        crypto: Arc<AuthCrypto>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            store,
            crypto,
            settings,
        }
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Issue a new session for `user_id`. When the user already holds the
    /// maximum number of live sessions, all of them are revoked first.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        fingerprint: ClientFingerprint,
        cancel: &CancellationToken,
    ) -> Result<RefreshSession, SessionError> {
        ensure_live(cancel)?;
        self.issue(user_id, fingerprint).await
    }

    /// Exchange a presented refresh token for a new session.
    ///
    /// The presented session is consumed whatever the outcome. Everything
    /// after the pop runs on a detached task so a caller that goes away
    /// cannot strand the user between "old session deleted" and "new session
    /// stored".
    pub async fn rotate(
        &self,
        presented: &str,
        fingerprint: ClientFingerprint,
        cancel: &CancellationToken,
    ) -> Result<RefreshSession, SessionError> {
        ensure_live(cancel)?;

        let Ok(token) = RefreshToken::parse(presented) else {
            debug!("rejected malformed refresh token");
            return Err(SessionError::NotFound);
        };
        let token_hash = self.crypto.hash_token(token.as_str());

        let manager = self.clone();
        tokio::spawn(async move { manager.rotate_hashed(token_hash, fingerprint).await })
            .await
            .map_err(|err| SessionError::Task(err.to_string()))?
    }

    /// Delete the session behind `presented`. Unknown or malformed tokens
    /// are ignored.
    pub async fn revoke(
        &self,
        presented: &str,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        ensure_live(cancel)?;

        let Ok(token) = RefreshToken::parse(presented) else {
            return Ok(());
        };
        self.store
            .delete_one(&self.crypto.hash_token(token.as_str()))
            .await?;
        Ok(())
    }

    /// Delete every session held by `user_id`.
    pub async fn revoke_all(
        &self,
        user_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<u64, SessionError> {
        ensure_live(cancel)?;

        let removed = self.store.delete_all_by_user(user_id).await?;
        info!(user_id = %user_id, removed, "revoked all refresh sessions");
        Ok(removed)
    }

    async fn issue(
        &self,
        user_id: Uuid,
        fingerprint: ClientFingerprint,
    ) -> Result<RefreshSession, SessionError> {
        let token = RefreshToken::generate().map_err(|_| SessionError::TokenGeneration)?;
        let now = Utc::now();
        let expires_at = now + self.settings.refresh_token_lifetime;

        let record = RefreshSessionRecord {
            token_hash: self.crypto.hash_token(token.as_str()),
            user_id,
            expires_at,
            fingerprint: fingerprint.clone(),
            created_at: now,
        };

        let evicted = self
            .store
            .create_capped(&record, self.settings.max_sessions_per_user)
            .await?;
        if evicted > 0 {
            warn!(
                user_id = %user_id,
                evicted,
                limit = self.settings.max_sessions_per_user,
                "session limit reached; revoked existing sessions"
            );
        }
        debug!(user_id = %user_id, token = %token, "issued refresh session");

        Ok(RefreshSession {
            token,
            user_id,
            expires_at,
            fingerprint,
        })
    }

    async fn rotate_hashed(
        self,
        token_hash: String,
        fingerprint: ClientFingerprint,
    ) -> Result<RefreshSession, SessionError> {
        let record = self
            .store
            .get_and_delete(&token_hash)
            .await?
            .ok_or(SessionError::NotFound)?;

        if record.is_expired() {
            let purged = self.store.delete_all_by_user(record.user_id).await?;
            warn!(
                user_id = %record.user_id,
                purged,
                "expired refresh token presented; revoked all sessions"
            );
            return Err(SessionError::Expired);
        }

        if !record.fingerprint.shares_any_attribute(&fingerprint) {
            let purged = self.store.delete_all_by_user(record.user_id).await?;
            warn!(
                user_id = %record.user_id,
                purged,
                "refresh token presented from an unrecognised client; revoked all sessions"
            );
            return Err(SessionError::FingerprintMismatch);
        }

        match self.issue(record.user_id, fingerprint).await {
            Ok(session) => Ok(session),
            Err(err) => {
                // Put the consumed session back so the client can retry.
                if let Err(restore_err) = self.store.create(&record).await {
                    error!(
                        user_id = %record.user_id,
                        error = %restore_err,
                        "failed to restore refresh session after rotation error"
                    );
                }
                Err(err)
            }
        }
    }
}
