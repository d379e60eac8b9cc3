use axum::{Extension, Json, extract::State, http::StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{
    fingerprint::RequestFingerprint,
    middleware::AuthenticatedUser,
    requests::{
        CurrentUserResponse, RefreshRequest, SignInRequest, SignUpRequest, SignUpResponse,
        TokenPairResponse, ValidatedJson,
    },
};
use crate::infra::{app_state::AppState, errors::AppResult};

/// Token cancelled when the handler future is dropped, which happens when
/// the client disconnects mid-request.
fn request_scope() -> (CancellationToken, tokio_util::sync::DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (token, guard)
}

pub async fn sign_up(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SignUpRequest>,
) -> AppResult<(StatusCode, Json<SignUpResponse>)> {
    let (cancel, _guard) = request_scope();
    let id = state
        .auth()
        .sign_up(&request.username, &request.password, &request.email, &cancel)
        .await?;

    Ok((StatusCode::CREATED, Json(SignUpResponse { id })))
}

pub async fn sign_in(
    State(state): State<AppState>,
    RequestFingerprint(fingerprint): RequestFingerprint,
    ValidatedJson(request): ValidatedJson<SignInRequest>,
) -> AppResult<Json<TokenPairResponse>> {
    let (cancel, _guard) = request_scope();
    let pair = state
        .auth()
        .sign_in(&request.username, &request.password, fingerprint, &cancel)
        .await?;

    Ok(Json(TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token.as_str().to_owned(),
    }))
}

pub async fn refresh_tokens(
    State(state): State<AppState>,
    RequestFingerprint(fingerprint): RequestFingerprint,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<TokenPairResponse>> {
    let (cancel, _guard) = request_scope();
    let pair = state
        .auth()
        .refresh(&request.refresh_token, fingerprint, &cancel)
        .await?;

    Ok(Json(TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token.as_str().to_owned(),
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> AppResult<StatusCode> {
    let (cancel, _guard) = request_scope();
    state.auth().logout(&request.refresh_token, &cancel).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn logout_all(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> AppResult<StatusCode> {
    let (cancel, _guard) = request_scope();
    let revoked = state
        .auth()
        .logout_everywhere(user.user_id, &cancel)
        .await?;
    info!(user_id = %user.user_id, revoked, "signed out of every session");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn current_user(
    Extension(user): Extension<AuthenticatedUser>,
) -> Json<CurrentUserResponse> {
    Json(CurrentUserResponse {
        user_id: user.user_id,
    })
}
