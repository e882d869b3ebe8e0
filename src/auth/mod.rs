//! Authentication boundary.
//!
//! A pre-shared key gates the API, compared in constant time to mitigate
//! timing attacks. The signed-in user's identity is supplied by the upstream
//! auth proxy as request headers.

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Headers carrying the signed-in identity.
pub const USER_UID_HEADER: &str = "x-user-uid";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let provided = header_value(request.headers(), API_KEY_HEADER).or_else(|| {
        header_value(request.headers(), header::AUTHORIZATION.as_str())
            .and_then(|s| s.strip_prefix("Bearer ").map(str::to_string))
    });

    match provided {
        Some(key) if constant_time_compare(&key, &expected) => next.run(request).await,
        Some(_) => AppError::Unauthorized("Invalid API key".to_string()).into_response(),
        None => AppError::Unauthorized("Missing or invalid API key".to_string()).into_response(),
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Signed-in identity forwarded by the auth proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uid = header_value(&parts.headers, USER_UID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("No signed-in user".to_string()))?;

        Ok(CallerIdentity {
            uid,
            email: header_value(&parts.headers, USER_EMAIL_HEADER),
            display_name: header_value(&parts.headers, USER_NAME_HEADER),
        })
    }
}
