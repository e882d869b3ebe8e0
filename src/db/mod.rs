//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for rosters and account profiles.

mod accounts;
mod rosters;

pub use accounts::*;
pub use rosters::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // One roster per scope; the unique index is what keeps concurrent
    // template creation from producing duplicates.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rosters (
            id TEXT PRIMARY KEY,
            church TEXT NOT NULL,
            department TEXT NOT NULL,
            position TEXT NOT NULL,
            members TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT,
            version INTEGER NOT NULL DEFAULT 1,
            UNIQUE (church, department, position)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            uid TEXT PRIMARY KEY,
            email TEXT,
            display_name TEXT,
            church TEXT NOT NULL,
            department TEXT NOT NULL,
            position TEXT,
            role TEXT,
            grade TEXT,
            group_name TEXT,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_accounts_scope ON accounts(church, department);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
