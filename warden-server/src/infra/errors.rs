use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, error};
use warden_core::auth::AuthError;

pub type AppResult<T> = Result<T, AppError>;

/// Message shared by every rejected refresh so clients cannot tell an
/// unknown token from an expired or foreign one.
pub const REFRESH_REJECTED: &str = "refresh token is invalid or expired";

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        (self.status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::WrongCredentials | AuthError::InvalidToken => {
                Self::unauthorized(err.to_string())
            }
            AuthError::TokenExpired | AuthError::FingerprintMismatch | AuthError::TokenNotFound => {
                Self::unauthorized(REFRESH_REJECTED)
            }
            AuthError::UserAlreadyExists => Self::conflict(err.to_string()),
            AuthError::StoreUnavailable(ref source) => {
                error!(error = ?source, "session or user store unavailable");
                Self::unavailable("Storage temporarily unavailable")
            }
            AuthError::Cancelled => {
                debug!("request cancelled before completion");
                Self::unavailable("Request cancelled")
            }
            AuthError::SigningFailure(ref source) => {
                error!(error = %source, "token signing failed");
                Self::internal("Authentication failed")
            }
            AuthError::Internal(ref reason) => {
                error!(reason = %reason, "internal authentication error");
                Self::internal("Authentication failed")
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = ?err, "unhandled server error");
        Self::internal("Internal server error")
    }
}

#[cfg(test)]
mod tests {
    use warden_core::auth::TokenError;

    use super::*;

    #[test]
    fn refresh_failures_share_one_message() {
        for err in [
            AuthError::TokenExpired,
            AuthError::FingerprintMismatch,
            AuthError::TokenNotFound,
        ] {
            let app = AppError::from(err);
            assert_eq!(app.status, StatusCode::UNAUTHORIZED);
            assert_eq!(app.message, REFRESH_REJECTED);
        }
    }

    #[test]
    fn conflicts_and_outages_map_to_their_statuses() {
        assert_eq!(
            AppError::from(AuthError::UserAlreadyExists).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(AuthError::StoreUnavailable(
                warden_core::auth::domain::repositories::StoreError::Corrupt("x".into())
            ))
            .status,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn signing_failures_do_not_leak_their_cause() {
        let app = AppError::from(AuthError::SigningFailure(TokenError::SigningFailure(
            "bad key material".into(),
        )));
        assert_eq!(app.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!app.message.contains("key material"));
    }
}
