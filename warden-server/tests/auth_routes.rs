mod support;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use support::{
    ADDRESS, DEVICE, USER_AGENT, bearer_request, build_test_app, client_request, json_request,
    read_json,
};
use tower::ServiceExt;

const CLIENT: (&str, &str, &str) = (USER_AGENT, DEVICE, ADDRESS);

async fn sign_up(app: &axum::Router, username: &str) -> StatusCode {
    app.clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/sign-up",
            json!({
                "username": username,
                "password": "hunter22",
                "email": format!("{username}@example.com"),
            }),
        ))
        .await
        .unwrap()
        .status()
}

async fn sign_in(app: &axum::Router, username: &str, client: (&str, &str, &str)) -> Value {
    let response = app
        .clone()
        .oneshot(client_request(
            "/api/auth/sign-in",
            json!({ "username": username, "password": "hunter22" }),
            client,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await
}

async fn refresh(
    app: &axum::Router,
    refresh_token: &str,
    client: (&str, &str, &str),
) -> axum::http::Response<Body> {
    app.clone()
        .oneshot(client_request(
            "/api/auth/refresh-tokens",
            json!({ "refreshToken": refresh_token }),
            client,
        ))
        .await
        .unwrap()
}

fn token(body: &Value, field: &str) -> String {
    body[field].as_str().expect("token field").to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = build_test_app();
    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn sign_up_returns_created_id_and_rejects_duplicates() {
    let app = build_test_app();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/sign-up",
            json!({ "username": "alice", "password": "hunter22", "email": "alice@example.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert!(body["id"].as_str().is_some());

    assert_eq!(sign_up(&app.router, "alice").await, StatusCode::CONFLICT);
    assert!(app.sessions.is_empty(), "sign-up must not open a session");
}

#[tokio::test]
async fn invalid_sign_up_bodies_are_bad_requests() {
    let app = build_test_app();

    for body in [
        json!({ "username": "al", "password": "hunter22", "email": "al@example.com" }),
        json!({ "username": "alice", "password": "1234", "email": "alice@example.com" }),
        json!({ "username": "alice", "password": "hunter22", "email": "not-an-email" }),
        json!({ "username": "alice", "password": "hunter22" }),
    ] {
        let response = app
            .router
            .clone()
            .oneshot(json_request("POST", "/api/auth/sign-up", body.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn sign_in_issues_a_token_pair_bound_to_the_client() {
    let app = build_test_app();
    sign_up(&app.router, "alice").await;

    let body = sign_in(&app.router, "alice", CLIENT).await;
    assert!(!token(&body, "accessToken").is_empty());
    assert!(!token(&body, "refreshToken").is_empty());

    assert_eq!(app.sessions.len(), 1);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let app = build_test_app();
    sign_up(&app.router, "alice").await;

    let mut messages = Vec::new();
    for username in ["alice", "mallory"] {
        let response = app
            .router
            .clone()
            .oneshot(client_request(
                "/api/auth/sign-in",
                json!({ "username": username, "password": "wrong-password" }),
                CLIENT,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        messages.push(read_json(response).await["error"]["message"].clone());
    }

    assert_eq!(messages[0], messages[1]);
}

#[tokio::test]
async fn missing_fingerprint_header_is_rejected_before_sign_in() {
    let app = build_test_app();
    sign_up(&app.router, "alice").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/sign-in")
        .header("content-type", "application/json")
        .header("user-agent", USER_AGENT)
        .header("ip", ADDRESS)
        .body(Body::from(
            json!({ "username": "alice", "password": "hunter22" }).to_string(),
        ))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn refresh_rotates_and_consumes_the_presented_token() {
    let app = build_test_app();
    sign_up(&app.router, "alice").await;
    let first = sign_in(&app.router, "alice", CLIENT).await;
    let first_refresh = token(&first, "refreshToken");

    let response = refresh(&app.router, &first_refresh, CLIENT).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = read_json(response).await;
    assert_ne!(token(&second, "refreshToken"), first_refresh);

    let replay = refresh(&app.router, &first_refresh, CLIENT).await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.sessions.len(), 1);
}

#[tokio::test]
async fn foreign_client_refresh_revokes_every_session() {
    let app = build_test_app();
    sign_up(&app.router, "alice").await;
    let laptop = sign_in(&app.router, "alice", CLIENT).await;
    let phone = sign_in(&app.router, "alice", ("phone/2.0", "device-2", "10.0.0.2")).await;
    assert_eq!(app.sessions.len(), 2);

    let stolen = refresh(
        &app.router,
        &token(&laptop, "refreshToken"),
        ("attacker/0.1", "device-x", "192.0.2.1"),
    )
    .await;
    assert_eq!(stolen.status(), StatusCode::UNAUTHORIZED);
    let message = read_json(stolen).await["error"]["message"].clone();

    let phone_refresh = refresh(
        &app.router,
        &token(&phone, "refreshToken"),
        ("phone/2.0", "device-2", "10.0.0.2"),
    )
    .await;
    assert_eq!(phone_refresh.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(phone_refresh).await["error"]["message"], message);
    assert!(app.sessions.is_empty());
}

#[tokio::test]
async fn logout_is_idempotent_and_ends_the_session() {
    let app = build_test_app();
    sign_up(&app.router, "alice").await;
    let body = sign_in(&app.router, "alice", CLIENT).await;
    let refresh_token = token(&body, "refreshToken");

    for _ in 0..2 {
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/logout",
                json!({ "refreshToken": refresh_token }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = refresh(&app.router, &refresh_token, CLIENT).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_of_unknown_token_succeeds() {
    let app = build_test_app();
    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/auth/logout",
            json!({ "refreshToken": "never-issued" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn protected_routes_require_an_access_token() {
    let app = build_test_app();
    sign_up(&app.router, "alice").await;
    let body = sign_in(&app.router, "alice", CLIENT).await;

    let anonymous = app
        .router
        .clone()
        .oneshot(Request::get("/api/auth/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    // A refresh token is not an access token.
    let wrong_kind = app
        .router
        .clone()
        .oneshot(bearer_request(
            "GET",
            "/api/auth/me",
            &token(&body, "refreshToken"),
        ))
        .await
        .unwrap();
    assert_eq!(wrong_kind.status(), StatusCode::UNAUTHORIZED);

    let me = app
        .router
        .clone()
        .oneshot(bearer_request(
            "GET",
            "/api/auth/me",
            &token(&body, "accessToken"),
        ))
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    assert!(read_json(me).await["userId"].as_str().is_some());
}

#[tokio::test]
async fn logout_all_revokes_every_refresh_session() {
    let app = build_test_app();
    sign_up(&app.router, "alice").await;
    let laptop = sign_in(&app.router, "alice", CLIENT).await;
    sign_in(&app.router, "alice", ("phone/2.0", "device-2", "10.0.0.2")).await;
    assert_eq!(app.sessions.len(), 2);

    let response = app
        .router
        .clone()
        .oneshot(bearer_request(
            "POST",
            "/api/auth/logout-all",
            &token(&laptop, "accessToken"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.sessions.is_empty());

    let response = refresh(&app.router, &token(&laptop, "refreshToken"), CLIENT).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sixth_sign_in_resets_the_session_pool() {
    let app = build_test_app();
    sign_up(&app.router, "alice").await;

    for _ in 0..5 {
        sign_in(&app.router, "alice", CLIENT).await;
    }
    assert_eq!(app.sessions.len(), 5);

    sign_in(&app.router, "alice", CLIENT).await;
    assert_eq!(app.sessions.len(), 1);
}
