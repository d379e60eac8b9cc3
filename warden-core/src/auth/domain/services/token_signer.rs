use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which key and lifetime a token is signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Access,
    Refresh,
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenClass::Access => f.write_str("access"),
            TokenClass::Refresh => f.write_str("refresh"),
        }
    }
}

/// Signed claim set. Timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: user_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }
}

/// A signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Verification failures render identically so callers cannot tell a forged
/// token from a stale one.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is invalid or expired")]
    InvalidSignature,
    #[error("token is invalid or expired")]
    Expired,
    #[error("signing key for {0} tokens must not be empty")]
    EmptyKey(TokenClass),
    #[error("access and refresh tokens must use different keys")]
    SharedKey,
    #[error("token signing failed: {0}")]
    SigningFailure(String),
}

struct ClassKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl ClassKeys {
    fn from_secret(
        class: TokenClass,
        secret: &[u8],
        lifetime: Duration,
    ) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptyKey(class));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime,
        })
    }
}

/// Stateless HS256 signer with one key per [`TokenClass`].
pub struct TokenSigner {
    access: ClassKeys,
    refresh: ClassKeys,
    validation: Validation,
}

impl TokenSigner {
    pub fn from_secrets(
        access_key: impl AsRef<[u8]>,
        access_lifetime: Duration,
        refresh_key: impl AsRef<[u8]>,
        refresh_lifetime: Duration,
    ) -> Result<Self, TokenError> {
        let access_key = access_key.as_ref();
        let refresh_key = refresh_key.as_ref();
        let access = ClassKeys::from_secret(TokenClass::Access, access_key, access_lifetime)?;
        let refresh = ClassKeys::from_secret(TokenClass::Refresh, refresh_key, refresh_lifetime)?;
        if access_key == refresh_key {
            return Err(TokenError::SharedKey);
        }

        // Expiry is checked by hand with zero leeway so it can be reported
        // separately from signature failures.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            access,
            refresh,
            validation,
        })
    }

    fn keys(&self, class: TokenClass) -> &ClassKeys {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }

    pub fn lifetime(&self, class: TokenClass) -> Duration {
        self.keys(class).lifetime
    }

    /// Issue a token for `user_id` valid from now for the class lifetime.
    pub fn issue(&self, class: TokenClass, user_id: Uuid) -> Result<IssuedToken, TokenError> {
        self.issue_at(class, user_id, Utc::now())
    }

    pub fn issue_at(
        &self,
        class: TokenClass,
        user_id: Uuid,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = Claims::new(user_id, issued_at, issued_at + self.lifetime(class));
        let token = self.sign(class, &claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Sign an explicit claim set. Identical claims yield identical tokens.
    pub fn sign(&self, class: TokenClass, claims: &Claims) -> Result<String, TokenError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(class).encoding,
        )
        .map_err(|err| TokenError::SigningFailure(err.to_string()))
    }

    pub fn verify(&self, class: TokenClass, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(class, token, Utc::now())
    }

    pub fn verify_at(
        &self,
        class: TokenClass,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.keys(class).decoding, &self.validation)
            .map_err(|_| TokenError::InvalidSignature)?;
        if data.claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("access_lifetime", &self.access.lifetime)
            .field("refresh_lifetime", &self.refresh.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::from_secrets(
            "access-secret",
            Duration::minutes(30),
            "refresh-secret",
            Duration::minutes(3000),
        )
        .unwrap()
    }

    #[test]
    fn issues_and_verifies_access_tokens() {
        let signer = signer();
        let user_id = Uuid::now_v7();
        let issued = signer.issue(TokenClass::Access, user_id).unwrap();

        let claims = signer.verify(TokenClass::Access, &issued.token).unwrap();
        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn each_class_uses_its_own_lifetime() {
        let signer = signer();
        let issued = signer.issue(TokenClass::Refresh, Uuid::now_v7()).unwrap();
        assert_eq!(issued.claims.exp - issued.claims.iat, 3000 * 60);
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = signer();
        let now = Utc::now();
        let claims = Claims::new(Uuid::now_v7(), now, now + Duration::minutes(5));
        assert_eq!(
            signer.sign(TokenClass::Access, &claims).unwrap(),
            signer.sign(TokenClass::Access, &claims).unwrap()
        );
    }

    #[test]
    fn expired_tokens_are_rejected_as_expired() {
        let signer = signer();
        let now = Utc::now();
        let claims = Claims::new(
            Uuid::now_v7(),
            now - Duration::seconds(1000),
            now - Duration::seconds(100),
        );
        let token = signer.sign(TokenClass::Access, &claims).unwrap();
        assert_eq!(
            signer.verify(TokenClass::Access, &token),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn expiry_instant_itself_is_expired() {
        let signer = signer();
        let now = Utc::now();
        let issued = signer.issue_at(TokenClass::Access, Uuid::now_v7(), now).unwrap();
        let at_expiry = now + Duration::minutes(30);
        assert_eq!(
            signer.verify_at(TokenClass::Access, &issued.token, at_expiry),
            Err(TokenError::Expired)
        );
        assert!(
            signer
                .verify_at(TokenClass::Access, &issued.token, at_expiry - Duration::seconds(1))
                .is_ok()
        );
    }

    #[test]
    fn tampered_tokens_fail_signature_check() {
        let signer = signer();
        let issued = signer.issue(TokenClass::Access, Uuid::now_v7()).unwrap();
        let split = issued.token.rfind('.').unwrap() + 1;
        let (head, signature) = issued.token.split_at(split);
        let first = signature.chars().next().unwrap();
        let replacement = if first == 'A' { 'B' } else { 'A' };
        let tampered = format!("{head}{replacement}{}", &signature[1..]);

        assert_eq!(
            signer.verify(TokenClass::Access, &tampered),
            Err(TokenError::InvalidSignature)
        );
        assert_eq!(
            signer.verify(TokenClass::Access, "not.a.jwt"),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn keys_are_not_interchangeable_between_classes() {
        let signer = signer();
        let issued = signer.issue(TokenClass::Access, Uuid::now_v7()).unwrap();
        assert_eq!(
            signer.verify(TokenClass::Refresh, &issued.token),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn failures_share_one_message() {
        assert_eq!(
            TokenError::Expired.to_string(),
            TokenError::InvalidSignature.to_string()
        );
    }

    #[test]
    fn rejects_missing_or_shared_keys() {
        let ttl = Duration::minutes(1);
        assert_eq!(
            TokenSigner::from_secrets("", ttl, "refresh", ttl).unwrap_err(),
            TokenError::EmptyKey(TokenClass::Access)
        );
        assert_eq!(
            TokenSigner::from_secrets("access", ttl, "", ttl).unwrap_err(),
            TokenError::EmptyKey(TokenClass::Refresh)
        );
        assert_eq!(
            TokenSigner::from_secrets("same", ttl, "same", ttl).unwrap_err(),
            TokenError::SharedKey
        );
    }
}
