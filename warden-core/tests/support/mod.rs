//! Shared fixtures for warden-core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use warden_core::auth::{
    AuthCrypto, AuthOrchestrator, ClientFingerprint, SessionManager, SessionSettings, TokenSigner,
    domain::repositories::{SessionStore, UserStore},
};

pub const TEST_USERNAME: &str = "testuser";
pub const TEST_PASSWORD: &str = "CorrectHorseBattery1!";
pub const TEST_EMAIL: &str = "testuser@example.com";
pub const REFRESH_KEY: &str = "test-refresh-key";

/// End-to-end authentication harness over arbitrary stores.
pub struct AuthHarness {
    pub auth: AuthOrchestrator,
    pub crypto: Arc<AuthCrypto>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AuthHarness {
    pub fn new(sessions: Arc<dyn SessionStore>, users: Arc<dyn UserStore>) -> Self {
        let crypto = Arc::new(
            AuthCrypto::insecure_for_tests("test-pepper", REFRESH_KEY).expect("test crypto"),
        );
        let signer = Arc::new(
            TokenSigner::from_secrets(
                "test-access-key",
                Duration::minutes(30),
                REFRESH_KEY,
                Duration::minutes(3000),
            )
            .expect("test signer"),
        );
        let manager = SessionManager::new(
            sessions.clone(),
            crypto.clone(),
            SessionSettings::default(),
        );
        Self {
            auth: AuthOrchestrator::new(users, manager, signer, crypto.clone()),
            crypto,
            sessions,
        }
    }
}

pub fn fingerprint(user_agent: &str, id: &str, ip: &str) -> ClientFingerprint {
    ClientFingerprint::new(user_agent, id, ip).expect("valid fingerprint")
}
