//! # Warden Core
//!
//! Core library for the Warden authentication service: refresh-session
//! lifecycle management, stateless access tokens, and credential storage.
//!
//! ## Overview
//!
//! - **Token signing**: HS256 claims with a distinct key per token class
//! - **Refresh sessions**: opaque single-use tokens bound to a client
//!   fingerprint, rotated atomically and capped per user
//! - **Orchestration**: sign-up, sign-in, refresh and logout use cases
//! - **Storage**: trait-based session and user stores with in-memory,
//!   PostgreSQL and Redis implementations
//!
//! ## Feature Flags
//!
//! - `database`: Enables the PostgreSQL (SQLx) and Redis store implementations
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokio_util::sync::CancellationToken;
//! use warden_core::auth::{
//!     AuthCrypto,
//!     domain::{
//!         services::{AuthOrchestrator, SessionManager, SessionSettings, TokenSigner},
//!         value_objects::ClientFingerprint,
//!     },
//!     infrastructure::repositories::{InMemorySessionStore, InMemoryUserStore},
//! };
//!
//! async fn sign_in_once() -> Result<(), Box<dyn std::error::Error>> {
//!     let crypto = Arc::new(AuthCrypto::new("pepper", "refresh-key")?);
//!     let signer = Arc::new(TokenSigner::from_secrets(
//!         "access-key",
//!         chrono::Duration::minutes(30),
//!         "refresh-key",
//!         chrono::Duration::minutes(3000),
//!     )?);
//!     let sessions = SessionManager::new(
//!         Arc::new(InMemorySessionStore::new()),
//!         crypto.clone(),
//!         SessionSettings::default(),
//!     );
//!     let auth = AuthOrchestrator::new(
//!         Arc::new(InMemoryUserStore::new()),
//!         sessions,
//!         signer,
//!         crypto,
//!     );
//!
//!     let cancel = CancellationToken::new();
//!     auth.sign_up("alice", "hunter22", "alice@example.com", &cancel).await?;
//!     let fingerprint = ClientFingerprint::new("curl/8.0", "device-1", "10.0.0.1")?;
//!     let pair = auth.sign_in("alice", "hunter22", fingerprint, &cancel).await?;
//!     println!("access token issued: {}", !pair.access_token.is_empty());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Refresh sessions, token signing and the authentication use cases
pub mod auth;

/// Embedded SQL migrations for the PostgreSQL stores
#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
