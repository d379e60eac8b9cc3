use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

use crate::infra::errors::AppError;

const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 5..=60;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex should compile")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("username must be between 3 and 32 characters")]
    Username,
    #[error("password must be between 5 and 60 characters")]
    Password,
    #[error("email address is not valid")]
    Email,
    #[error("refresh token is required")]
    RefreshToken,
}

/// Request bodies checked after deserialisation.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

fn check_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME_LEN.contains(&username.chars().count()) {
        Ok(())
    } else {
        Err(ValidationError::Username)
    }
}

fn check_password(password: &str) -> Result<(), ValidationError> {
    if PASSWORD_LEN.contains(&password.chars().count()) {
        Ok(())
    } else {
        Err(ValidationError::Password)
    }
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub password: String,
    pub email: String,
}

impl Validate for SignUpRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_username(&self.username)?;
        check_password(&self.password)?;
        if !EMAIL_PATTERN.is_match(&self.email) {
            return Err(ValidationError::Email);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

impl Validate for SignInRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_username(&self.username)?;
        check_password(&self.password)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl Validate for RefreshRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.refresh_token.trim().is_empty() {
            return Err(ValidationError::RefreshToken);
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUserResponse {
    pub user_id: Uuid,
}

/// JSON body that is deserialised and validated, rejecting with `400`.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| AppError::bad_request(rejection.body_text()))?;
        value
            .validate()
            .map_err(|err| AppError::bad_request(format!("Validation error: {err}")))?;
        Ok(Self(value))
    }
}
