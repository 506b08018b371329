use std::time::Duration;

use crate::models::Mapping;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqliteConnection, SqlitePool,
};

/// Schema of the only table the store owns.
pub const CREATE_URLS_TABLE: &str = "CREATE TABLE IF NOT EXISTS urls (
    code   TEXT NOT NULL PRIMARY KEY,
    origin TEXT NOT NULL UNIQUE
)";

// ── Connection ─────────────────────────────────────────────────────────────

/// Open a SQLite pool for `database_url`, creating the file if it doesn't
/// exist yet.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        // Writers from other connections (or processes) wait instead of failing.
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

// ── Schema ─────────────────────────────────────────────────────────────────

/// Whether the `urls` table is already present.
pub async fn urls_table_exists(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'urls'",
    )
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

pub async fn create_urls_table(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_URLS_TABLE).execute(pool).await?;
    Ok(())
}

// ── Mappings ───────────────────────────────────────────────────────────────

/// Fetch the mapping for a short code.
pub async fn get_mapping_by_code(
    pool: &SqlitePool,
    code: &str,
) -> Result<Option<Mapping>, sqlx::Error> {
    sqlx::query_as("SELECT code, origin FROM urls WHERE code = ?1")
        .bind(code)
        .fetch_optional(pool)
        .await
}

/// Fetch the mapping that already holds `origin`, if any.
pub async fn get_mapping_by_origin(
    pool: &SqlitePool,
    origin: &str,
) -> Result<Option<Mapping>, sqlx::Error> {
    sqlx::query_as("SELECT code, origin FROM urls WHERE origin = ?1")
        .bind(origin)
        .fetch_optional(pool)
        .await
}

/// Insert a new mapping on the given connection, normally an open
/// transaction. Fails with a unique violation if either the code or the
/// origin is already taken.
pub async fn insert_mapping(
    conn: &mut SqliteConnection,
    code: &str,
    origin: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO urls (code, origin) VALUES (?1, ?2)")
        .bind(code)
        .bind(origin)
        .execute(conn)
        .await?;

    Ok(())
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|e| e.is_unique_violation())
}
