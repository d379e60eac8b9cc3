use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use serde_json::Value;
use warden_config::{
    AuthConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig, ServerConfig, SessionBackend,
    StorageConfig, UserBackend,
};
use warden_core::auth::{
    AuthCrypto,
    infrastructure::repositories::{InMemorySessionStore, InMemoryUserStore},
};
use warden_server::{AppState, create_app, infra::startup::assemble_auth};

pub const USER_AGENT: &str = "warden-tests/1.0";
pub const DEVICE: &str = "device-1";
pub const ADDRESS: &str = "10.0.0.1";

// Code is used by test modules, but not in this scope
#[allow(unused)]
#[derive(Debug)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub sessions: Arc<InMemorySessionStore>,
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
        },
        redis: None,
        storage: StorageConfig {
            sessions: SessionBackend::Memory,
            users: UserBackend::Memory,
        },
        auth: AuthConfig {
            access_token_key: "test-access-key-test-access-key-0001".into(),
            access_token_expiration: Duration::from_secs(30 * 60),
            refresh_token_key: "test-refresh-key-test-refresh-key-01".into(),
            refresh_token_expiration: Duration::from_secs(3000 * 60),
            max_sessions_per_user: 5,
            password_pepper: "test-pepper-test-pepper-test-pepper".into(),
            session_sweep_interval: None,
        },
        cors: CorsConfig {
            allowed_origins: vec![],
        },
        dev_mode: true,
        metadata: ConfigMetadata::default(),
    }
}

pub fn build_test_app() -> TestApp {
    let config = Arc::new(test_config());
    let sessions = Arc::new(InMemorySessionStore::new());
    let users = Arc::new(InMemoryUserStore::new());
    let crypto = Arc::new(
        AuthCrypto::insecure_for_tests(
            &config.auth.password_pepper,
            &config.auth.refresh_token_key,
        )
        .expect("test crypto"),
    );

    let auth = assemble_auth(&config, sessions.clone(), users, crypto).expect("auth stack");
    let state = AppState::new(auth, config);

    TestApp {
        router: create_app(state.clone()),
        state,
        sessions,
    }
}

#[allow(unused)]
pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// JSON request carrying the fingerprint headers.
#[allow(unused)]
pub fn client_request(
    uri: &str,
    body: Value,
    (user_agent, device, ip): (&str, &str, &str),
) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("user-agent", user_agent)
        .header("fingerprint", device)
        .header("ip", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(unused)]
pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

#[allow(unused)]
pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}
