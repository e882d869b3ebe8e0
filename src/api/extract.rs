//! Request extraction helpers.
//!
//! Handlers take `Result<Extractor<T>, Rejection>` and unwrap it through these
//! helpers, so a malformed request still answers with the JSON error envelope.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query,
    },
    Json,
};

use crate::errors::AppError;

/// Unwrap a JSON body. Well-formed JSON of the wrong shape is a validation
/// error; anything else (bad syntax, wrong content type) is a bad request.
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result.map(|Json(value)| value).map_err(|err| match err {
        JsonRejection::JsonDataError(e) => AppError::Validation(e.body_text()),
        other => AppError::BadRequest(other.body_text()),
    })
}

pub fn extract_path<T>(result: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    result
        .map(|Path(value)| value)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(value)| value)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}
