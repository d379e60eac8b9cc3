use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use warden_core::auth::ClientFingerprint;

use crate::infra::errors::AppError;

pub const FINGERPRINT_HEADER: &str = "fingerprint";
pub const IP_HEADER: &str = "ip";

/// Client fingerprint read from the `User-Agent`, `Fingerprint` and `IP`
/// headers. A missing or blank header rejects the request with `400`.
#[derive(Debug, Clone)]
pub struct RequestFingerprint(pub ClientFingerprint);

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

impl<S> FromRequestParts<S> for RequestFingerprint
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        ClientFingerprint::new(
            header_value(headers, header::USER_AGENT.as_str()),
            header_value(headers, FINGERPRINT_HEADER),
            header_value(headers, IP_HEADER),
        )
        .map(Self)
        .map_err(|err| AppError::bad_request(err.to_string()))
    }
}
