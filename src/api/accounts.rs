//! Account profile and session endpoints.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    Json,
};

use super::extract::{extract_json, extract_path};
use super::{success, ApiResult};
use crate::auth::CallerIdentity;
use crate::errors::AppError;
use crate::models::{Account, UpsertAccountRequest, UserData};
use crate::AppState;

/// GET /api/accounts/{uid} - Get a profile.
pub async fn get_account(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Account> {
    let uid = extract_path(path)?;
    match state.accounts.get_account(&uid).await? {
        Some(account) => success(account),
        None => Err(AppError::NotFound(format!("Account {} not found", uid))),
    }
}

/// PUT /api/accounts/{uid} - Create or replace a profile.
pub async fn put_account(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<UpsertAccountRequest>, JsonRejection>,
) -> ApiResult<Account> {
    let uid = extract_path(path)?;
    let request = extract_json(body)?;
    if request.church.trim().is_empty() {
        return Err(AppError::Validation("Church is required".to_string()));
    }
    if request.department.trim().is_empty() {
        return Err(AppError::Validation("Department is required".to_string()));
    }

    let account = state.accounts.upsert_account(&uid, &request).await?;
    success(account)
}

/// GET /api/session - Signed-in identity merged with the stored profile.
pub async fn get_session(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<UserData> {
    let profile = state.accounts.get_account(&identity.uid).await?;
    if profile.is_none() {
        tracing::debug!(uid = %identity.uid, "Signed-in user has no profile yet");
    }

    success(UserData {
        uid: identity.uid,
        email: identity.email,
        display_name: identity.display_name,
        profile,
        auth_ready: true,
    })
}
