//! REST API module.
//!
//! Contains all API routes and handlers following the web client contract.

mod accounts;
mod extract;
mod members;

pub use accounts::*;
pub use members::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    /// Roster version the response reflects, for optimistic concurrency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, version: Option<i64>) -> Self {
        Self {
            success: true,
            data,
            version,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data, None))
}

/// Create a successful API response tied to a roster version.
pub fn versioned<T: Serialize>(data: T, version: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, Some(version)))
}
