//! Account profile persistence.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{Account, Position, TeacherRole, UpsertAccountRequest};

/// Repository for signed-in users' profile documents.
#[derive(Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the profile for a uid.
    pub async fn get_account(&self, uid: &str) -> Result<Option<Account>, AppError> {
        let row = sqlx::query(
            "SELECT uid, email, display_name, church, department, position, role, grade, group_name, updated_at FROM accounts WHERE uid = ?"
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(account_from_row).transpose()
    }

    /// Create or fully replace the profile for a uid.
    pub async fn upsert_account(
        &self,
        uid: &str,
        request: &UpsertAccountRequest,
    ) -> Result<Account, AppError> {
        let now = Utc::now();
        let position = request.position.map(|p| p.as_str());
        let role = request.role.map(|r| r.as_str());

        sqlx::query(
            r#"INSERT INTO accounts (uid, email, display_name, church, department, position, role, grade, group_name, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(uid) DO UPDATE SET
                   email = excluded.email,
                   display_name = excluded.display_name,
                   church = excluded.church,
                   department = excluded.department,
                   position = excluded.position,
                   role = excluded.role,
                   grade = excluded.grade,
                   group_name = excluded.group_name,
                   updated_at = excluded.updated_at"#,
        )
        .bind(uid)
        .bind(&request.email)
        .bind(&request.display_name)
        .bind(&request.church)
        .bind(&request.department)
        .bind(position)
        .bind(role)
        .bind(&request.grade)
        .bind(&request.group)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::info!(uid, church = %request.church, department = %request.department, "Saved account profile");

        Ok(Account {
            uid: uid.to_string(),
            email: request.email.clone(),
            display_name: request.display_name.clone(),
            church: request.church.clone(),
            department: request.department.clone(),
            position: request.position,
            role: request.role,
            grade: request.grade.clone(),
            group: request.group.clone(),
            updated_at: now,
        })
    }
}

fn account_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Account, AppError> {
    let position_str: Option<String> = row.get("position");
    let role_str: Option<String> = row.get("role");
    let updated_at: String = row.get("updated_at");

    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| AppError::Database(format!("Account has bad timestamp: {}", e)))?;

    Ok(Account {
        uid: row.get("uid"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        church: row.get("church"),
        department: row.get("department"),
        position: position_str.as_deref().and_then(Position::from_str),
        role: role_str.as_deref().and_then(TeacherRole::from_str),
        grade: row.get("grade"),
        group: row.get("group_name"),
        updated_at,
    })
}
