//! Refresh-session authentication
//!
//! Password credentials are exchanged for a pair of tokens: a short-lived
//! signed access token and an opaque, single-use refresh token bound to the
//! client that requested it.

pub mod crypto;
pub mod domain;
pub mod infrastructure;

pub use crypto::{AuthCrypto, AuthCryptoError};
pub use domain::services::{
    AuthError, AuthOrchestrator, SessionError, SessionManager, SessionSettings, TokenClass,
    TokenError, TokenPair, TokenSigner,
};
pub use domain::value_objects::ClientFingerprint;
