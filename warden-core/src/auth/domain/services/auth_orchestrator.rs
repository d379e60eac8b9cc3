use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::session_manager::{SessionError, SessionManager};
use super::token_signer::{Claims, TokenClass, TokenError, TokenSigner};
use crate::auth::domain::repositories::{StoreError, UserStore};
use crate::auth::domain::value_objects::{ClientFingerprint, RefreshToken};
use crate::auth::{AuthCrypto, AuthCryptoError};

/// Failures of the authentication use cases.
///
/// Display strings are safe to show to clients; underlying causes are kept
/// as sources for logging.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("wrong username or password")]
    WrongCredentials,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("refresh token expired")]
    TokenExpired,
    #[error("refresh token not recognised for this client")]
    FingerprintMismatch,
    #[error("refresh token not found")]
    TokenNotFound,
    #[error("token is invalid or expired")]
    InvalidToken,
    #[error("token signing failed")]
    SigningFailure(#[source] TokenError),
    #[error("storage unavailable")]
    StoreUnavailable(#[source] StoreError),
    #[error("operation cancelled")]
    Cancelled,
    #[error("internal authentication error: {0}")]
    Internal(String),
}

impl AuthError {
    /// True for failures caused by the presented credentials or tokens.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AuthError::WrongCredentials
                | AuthError::TokenExpired
                | AuthError::FingerprintMismatch
                | AuthError::TokenNotFound
                | AuthError::InvalidToken
        )
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::StoreUnavailable(err)
    }
}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => AuthError::TokenNotFound,
            SessionError::Expired => AuthError::TokenExpired,
            SessionError::FingerprintMismatch => AuthError::FingerprintMismatch,
            SessionError::Cancelled => AuthError::Cancelled,
            SessionError::Store(store) => AuthError::StoreUnavailable(store),
            SessionError::TokenGeneration | SessionError::Task(_) => {
                AuthError::Internal(err.to_string())
            }
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidSignature | TokenError::Expired => AuthError::InvalidToken,
            other => AuthError::SigningFailure(other),
        }
    }
}

impl From<AuthCryptoError> for AuthError {
    fn from(err: AuthCryptoError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// Access and refresh tokens returned by sign-in and refresh.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub user_id: Uuid,
    pub access_token: String,
    pub access_expires_at: Option<DateTime<Utc>>,
    pub refresh_token: RefreshToken,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Sign-up, sign-in, refresh and logout on top of the session manager,
/// token signer and user store.
#[derive(Clone)]
pub struct AuthOrchestrator {
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
    signer: Arc<TokenSigner>,
    crypto: Arc<AuthCrypto>,
}

impl fmt::Debug for AuthOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthOrchestrator")
            .field("user_store_refs", &Arc::strong_count(&self.users))
            .field("sessions", &self.sessions)
            .field("signer", &self.signer)
            .finish_non_exhaustive()
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), AuthError> {
    if cancel.is_cancelled() {
        return Err(AuthError::Cancelled);
    }
    Ok(())
}

impl AuthOrchestrator {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: SessionManager,
        signer: Arc<TokenSigner>,
        crypto: Arc<AuthCrypto>,
    ) -> Self {
        Self {
            users,
            sessions,
            signer,
            crypto,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Register a user. No session is created.
    pub async fn sign_up(
        &self,
        username: &str,
        password: &str,
        email: &str,
        cancel: &CancellationToken,
    ) -> Result<Uuid, AuthError> {
        ensure_live(cancel)?;

        if self.users.find_by_username(username).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = self.hash_password(password).await?;
        ensure_live(cancel)?;

        let user_id = match self.users.create(username, &password_hash, email).await {
            Ok(id) => id,
            Err(StoreError::Conflict) => return Err(AuthError::UserAlreadyExists),
            Err(err) => return Err(err.into()),
        };

        info!(user_id = %user_id, "user registered");
        Ok(user_id)
    }

    /// Authenticate with a password and open a new refresh session bound to
    /// `fingerprint`.
    pub async fn sign_in(
        &self,
        username: &str,
        password: &str,
        fingerprint: ClientFingerprint,
        cancel: &CancellationToken,
    ) -> Result<TokenPair, AuthError> {
        ensure_live(cancel)?;

        let user = self.users.find_by_username(username).await?;
        let stored_hash = user.as_ref().map(|user| user.password_hash.clone());
        let verified = self.verify_password(password, stored_hash).await?;

        let user = match (user, verified) {
            (Some(user), true) => user,
            _ => {
                info!("sign-in rejected");
                return Err(AuthError::WrongCredentials);
            }
        };

        // A signing failure must not leave a session behind.
        let access = self.signer.issue(TokenClass::Access, user.id)?;
        let session = self
            .sessions
            .create_session(user.id, fingerprint, cancel)
            .await?;

        info!(user_id = %user.id, "user signed in");
        Ok(TokenPair {
            user_id: user.id,
            access_token: access.token,
            access_expires_at: access.claims.expires_at(),
            refresh_token: session.token,
            refresh_expires_at: session.expires_at,
        })
    }

    /// Rotate a refresh session and issue a matching access token.
    pub async fn refresh(
        &self,
        presented_refresh_token: &str,
        fingerprint: ClientFingerprint,
        cancel: &CancellationToken,
    ) -> Result<TokenPair, AuthError> {
        let session = self
            .sessions
            .rotate(presented_refresh_token, fingerprint, cancel)
            .await
            .map_err(|err| {
                if matches!(
                    err,
                    SessionError::Expired | SessionError::FingerprintMismatch
                ) {
                    warn!(reason = %err, "refresh rejected");
                }
                AuthError::from(err)
            })?;

        let access = match self.signer.issue(TokenClass::Access, session.user_id) {
            Ok(access) => access,
            Err(err) => {
                error!(user_id = %session.user_id, error = %err, "access token signing failed");
                if let Err(revoke_err) = self
                    .sessions
                    .revoke(session.token.as_str(), &CancellationToken::new())
                    .await
                {
                    error!(error = %revoke_err, "failed to revoke unusable refresh session");
                }
                return Err(err.into());
            }
        };

        Ok(TokenPair {
            user_id: session.user_id,
            access_token: access.token,
            access_expires_at: access.claims.expires_at(),
            refresh_token: session.token,
            refresh_expires_at: session.expires_at,
        })
    }

    /// Revoke one refresh session. Unknown tokens succeed.
    pub async fn logout(
        &self,
        refresh_token: &str,
        cancel: &CancellationToken,
    ) -> Result<(), AuthError> {
        self.sessions.revoke(refresh_token, cancel).await?;
        Ok(())
    }

    /// Revoke every refresh session held by `user_id`.
    pub async fn logout_everywhere(
        &self,
        user_id: Uuid,
        cancel: &CancellationToken,
    ) -> Result<u64, AuthError> {
        Ok(self.sessions.revoke_all(user_id, cancel).await?)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(self.signer.verify(TokenClass::Access, token)?)
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let crypto = self.crypto.clone();
        let password = zeroize::Zeroizing::new(password.to_owned());
        tokio::task::spawn_blocking(move || crypto.hash_password(&password))
            .await
            .map_err(|err| AuthError::Internal(err.to_string()))?
            .map_err(AuthError::from)
    }

    /// Verify against `stored_hash`, or against a decoy when the user does
    /// not exist so both paths cost one Argon2 run.
    async fn verify_password(
        &self,
        password: &str,
        stored_hash: Option<String>,
    ) -> Result<bool, AuthError> {
        let crypto = self.crypto.clone();
        let password = zeroize::Zeroizing::new(password.to_owned());
        tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => crypto.verify_password(&password, &hash),
            None => crypto.verify_decoy(&password),
        })
        .await
        .map_err(|err| AuthError::Internal(err.to_string()))?
        .map_err(AuthError::from)
    }
}
