// Authentication value objects
// Immutable, validated on construction, Send + Sync for async use.

mod client_fingerprint;
mod refresh_token;

pub use client_fingerprint::{ClientFingerprint, ClientFingerprintError};
pub use refresh_token::{RefreshToken, RefreshTokenError};
