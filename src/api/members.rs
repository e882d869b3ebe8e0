//! Roster member API endpoints.
//!
//! Every route is scoped by `/rosters/{church}/{department}/{position}`.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Serialize;

use super::extract::{extract_json, extract_path, extract_query};
use super::{success, versioned, ApiResult};
use crate::errors::AppError;
use crate::models::{
    CreateMembersRequest, Member, ModifyMemberRequest, Position, RemoveMembersRequest,
    RosterDocument, Scope, ViewerQuery,
};
use crate::store::Viewer;
use crate::AppState;

type ScopePath = Result<Path<(String, String, Position)>, PathRejection>;

fn scope_of(path: ScopePath) -> Result<Scope, AppError> {
    let (church, department, position) = extract_path(path)?;
    Ok(Scope::new(church, department, position))
}

/// Outcome of a removal request.
#[derive(Debug, Serialize)]
pub struct RemovedMembers {
    pub removed: usize,
}

/// GET /api/rosters/{church}/{department}/{position} - Get the stored roster document.
pub async fn get_roster(
    State(state): State<AppState>,
    path: ScopePath,
) -> ApiResult<RosterDocument> {
    let roster = state.members.get_roster(&scope_of(path)?).await?;
    let version = roster.version;
    versioned(roster, version)
}

/// GET .../members - List all members, creating an empty roster on first access.
pub async fn list_members(
    State(state): State<AppState>,
    path: ScopePath,
) -> ApiResult<Vec<Member>> {
    let roster = state.members.fetch_all(&scope_of(path)?).await?;
    versioned(roster.members, roster.version)
}

/// GET .../members/visible - List the members a caller with the given role may see.
pub async fn list_visible_members(
    State(state): State<AppState>,
    path: ScopePath,
    query: Result<Query<ViewerQuery>, QueryRejection>,
) -> ApiResult<Vec<Member>> {
    let scope = scope_of(path)?;
    let viewer = Viewer::from(extract_query(query)?);
    let members = state
        .members
        .fetch_members(&scope, &viewer)
        .await?;
    success(members)
}

/// POST .../members - Append members to the roster.
pub async fn create_members(
    State(state): State<AppState>,
    path: ScopePath,
    body: Result<Json<CreateMembersRequest>, JsonRejection>,
) -> ApiResult<Vec<Member>> {
    let scope = scope_of(path)?;
    let request = extract_json(body)?;
    let applied = state
        .members
        .create(&scope, request.members, request.expected_version)
        .await?;
    versioned(applied.value, applied.version)
}

/// PATCH .../members/{id} - Merge fields into one member.
///
/// An unknown roster or member is not an error; `data` is `null` then.
pub async fn modify_member(
    State(state): State<AppState>,
    path: Result<Path<(String, String, Position, String)>, PathRejection>,
    body: Result<Json<ModifyMemberRequest>, JsonRejection>,
) -> ApiResult<Option<Member>> {
    let (church, department, position, id) = extract_path(path)?;
    let scope = Scope::new(church, department, position);
    let request = extract_json(body)?;

    match state
        .members
        .modify(&scope, &id, &request.patch, request.expected_version)
        .await?
    {
        Some(applied) => versioned(Some(applied.value), applied.version),
        None => success(None),
    }
}

/// DELETE .../members - Remove members by id.
pub async fn remove_members(
    State(state): State<AppState>,
    path: ScopePath,
    body: Result<Json<RemoveMembersRequest>, JsonRejection>,
) -> ApiResult<RemovedMembers> {
    let scope = scope_of(path)?;
    let request = extract_json(body)?;
    if request.ids.is_empty() {
        return Err(AppError::Validation(
            "At least one member id is required".to_string(),
        ));
    }

    let applied = state
        .members
        .remove(&scope, &request.ids, request.expected_version)
        .await?;
    versioned(
        RemovedMembers {
            removed: applied.value,
        },
        applied.version,
    )
}
