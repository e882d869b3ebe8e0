//! SQLite-backed roster store.
//!
//! Each roster is one row; its members live in a JSON array column and are
//! always read and written as a whole.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Member, Position, RosterDocument, Scope};
use crate::store::RosterStore;

const ROSTER_COLUMNS: &str =
    "id, church, department, position, members, created_at, updated_at, version";

/// Roster store persisting one row per scope.
#[derive(Clone)]
pub struct SqliteRosterStore {
    pool: SqlitePool,
}

impl SqliteRosterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterStore for SqliteRosterStore {
    async fn find(&self, scope: &Scope) -> Result<Option<RosterDocument>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM rosters WHERE church = ? AND department = ? AND position = ?",
            ROSTER_COLUMNS
        ))
        .bind(&scope.church)
        .bind(&scope.department)
        .bind(scope.position.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(roster_from_row).transpose()
    }

    async fn insert(
        &self,
        scope: &Scope,
        members: &[Member],
    ) -> Result<Option<RosterDocument>, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let members_json = encode_members(members)?;

        // The unique scope index turns a lost creation race into a no-op.
        let result = sqlx::query(
            "INSERT OR IGNORE INTO rosters (id, church, department, position, members, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, NULL, 1)"
        )
        .bind(&id)
        .bind(&scope.church)
        .bind(&scope.department)
        .bind(scope.position.as_str())
        .bind(&members_json)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(RosterDocument {
            id,
            church: scope.church.clone(),
            department: scope.department.clone(),
            position: scope.position,
            members: members.to_vec(),
            created_at: now,
            updated_at: None,
            version: 1,
        }))
    }

    async fn replace(&self, roster: &RosterDocument) -> Result<Option<RosterDocument>, AppError> {
        let now = Utc::now();
        let new_version = roster.version + 1;
        let members_json = encode_members(&roster.members)?;

        // Conditional UPDATE with version check to prevent lost updates
        let result = sqlx::query(
            "UPDATE rosters SET members = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&members_json)
        .bind(now.to_rfc3339())
        .bind(new_version)
        .bind(&roster.id)
        .bind(roster.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(RosterDocument {
            members: roster.members.clone(),
            updated_at: Some(now),
            version: new_version,
            ..roster.clone()
        }))
    }
}

fn encode_members(members: &[Member]) -> Result<String, AppError> {
    serde_json::to_string(members)
        .map_err(|e| AppError::Internal(format!("Failed to encode members: {}", e)))
}

fn roster_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RosterDocument, AppError> {
    let id: String = row.get("id");
    let position_str: String = row.get("position");
    let members_str: String = row.get("members");
    let created_at: String = row.get("created_at");
    let updated_at: Option<String> = row.get("updated_at");

    let position = Position::from_str(&position_str).ok_or_else(|| {
        AppError::Database(format!("Roster {} has unknown position {:?}", id, position_str))
    })?;

    // Member dates are decoded into calendar dates here.
    let members: Vec<Member> = serde_json::from_str(&members_str).map_err(|e| {
        AppError::Database(format!("Roster {} has malformed members: {}", id, e))
    })?;

    Ok(RosterDocument {
        church: row.get("church"),
        department: row.get("department"),
        position,
        members,
        created_at: parse_timestamp(&id, &created_at)?,
        updated_at: updated_at
            .as_deref()
            .map(|ts| parse_timestamp(&id, ts))
            .transpose()?,
        version: row.get("version"),
        id,
    })
}

fn parse_timestamp(id: &str, value: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AppError::Database(format!("Roster {} has bad timestamp {:?}: {}", id, value, e)))
}
