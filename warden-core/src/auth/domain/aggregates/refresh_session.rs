use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::domain::value_objects::{ClientFingerprint, RefreshToken};

/// A freshly issued refresh session, as returned to the caller.
///
/// This is the only place the plaintext token exists. Stores receive the
/// matching [`RefreshSessionRecord`].
#[derive(Debug, Clone)]
pub struct RefreshSession {
    pub token: RefreshToken,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub fingerprint: ClientFingerprint,
}

/// Persisted form of a refresh session, keyed by the token's HMAC digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSessionRecord {
    pub token_hash: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub fingerprint: ClientFingerprint,
    pub created_at: DateTime<Utc>,
}

impl RefreshSessionRecord {
    /// Expiry is inclusive: a session is dead at its `expires_at` instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
