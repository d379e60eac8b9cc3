use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;
use uuid::Uuid;

use crate::infra::{app_state::AppState, errors::AppError};

/// Identity established by [`auth_middleware`], available to handlers as an
/// `Extension`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&request)?;
    let claims = state.auth().verify_access_token(token).map_err(|err| {
        debug!(error = %err, "access token rejected");
        AppError::from(err)
    })?;

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: claims.user_id(),
    });
    Ok(next.run(request).await)
}

fn extract_bearer_token(request: &Request) -> Result<&str, AppError> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("Missing bearer token"))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn request_with(authorization: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn bearer_token_is_extracted() {
        let request = request_with(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&request).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_rejected() {
        assert!(extract_bearer_token(&request_with(None)).is_err());
        assert!(extract_bearer_token(&request_with(Some("Basic dXNlcg=="))).is_err());
        assert!(extract_bearer_token(&request_with(Some("Bearer "))).is_err());
    }
}
