use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use constant_time_eq::constant_time_eq;
use rand::{TryRngCore, rngs::OsRng};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefreshTokenError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("token generation failed")]
    GenerationFailed,
}

/// Opaque refresh token handed to a client.
///
/// 256 bits from the OS RNG, URL-safe base64 without padding. Only the HMAC
/// digest of the value is ever persisted; the plaintext is wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RefreshToken {
    value: String,
}

impl RefreshToken {
    const BYTE_LENGTH: usize = 32;

    pub fn generate() -> Result<Self, RefreshTokenError> {
        let mut bytes = [0u8; Self::BYTE_LENGTH];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| RefreshTokenError::GenerationFailed)?;
        let value = URL_SAFE_NO_PAD.encode(bytes);
        bytes.zeroize();
        Ok(Self { value })
    }

    /// Accept a client-presented value. Anything that could not have been
    /// produced by [`RefreshToken::generate`] is rejected without touching
    /// storage.
    pub fn parse(value: impl Into<String>) -> Result<Self, RefreshTokenError> {
        let value = value.into();
        let decoded = URL_SAFE_NO_PAD
            .decode(value.as_bytes())
            .map_err(|_| RefreshTokenError::InvalidFormat)?;
        if decoded.len() != Self::BYTE_LENGTH {
            return Err(RefreshTokenError::InvalidFormat);
        }
        Ok(Self { value })
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn secure_compare(&self, other: &str) -> bool {
        self.value.len() == other.len() && constant_time_eq(self.value.as_bytes(), other.as_bytes())
    }

    fn preview(&self) -> &str {
        self.value.get(..8).unwrap_or(&self.value)
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RefreshToken")
            .field(&format_args!("{}...", self.preview()))
            .finish()
    }
}

impl fmt::Display for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only show the first 8 chars
        write!(f, "{}...", self.preview())
    }
}
