use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::{
    AppState,
    users::auth::{auth_middleware, handlers},
};

/// Create the API router.
pub fn create_api_router(state: AppState) -> Router<AppState> {
    Router::new().nest("/api/auth", create_auth_router(state))
}

fn create_auth_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/sign-up", post(handlers::sign_up))
        .route("/sign-in", post(handlers::sign_in))
        .route("/refresh-tokens", post(handlers::refresh_tokens))
        .route("/logout", post(handlers::logout))
        .merge(create_protected_routes(state))
}

/// Routes that require a bearer access token.
fn create_protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/logout-all", post(handlers::logout_all))
        .route("/me", get(handlers::current_user))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
