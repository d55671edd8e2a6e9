//! Database access for popmetrics-tracker
//!
//! One shared single-connection SQLite pool, used sequentially. Every write
//! is its own autocommitted statement, so a crash mid-run leaves completed
//! steps and requests durable and the interrupted one `in_progress`.

pub mod artist_day;
pub mod artist_info;
pub mod lineage;
pub mod schema;
pub mod snapshots;

use popmetrics_common::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// Open (or create) the tracker database and ensure the schema exists
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = open_pool(&db_url).await?;
    schema::initialize_schema(&pool).await?;

    tracing::info!(path = %db_path.display(), "Database ready");
    Ok(pool)
}

/// In-memory database with the full schema (tests, dry runs)
pub async fn init_in_memory_pool() -> Result<SqlitePool> {
    let pool = open_pool("sqlite::memory:").await?;
    schema::initialize_schema(&pool).await?;
    Ok(pool)
}

/// Single-connection pool with foreign keys enforced
///
/// The connection is never recycled: an in-memory database lives exactly as
/// long as its one connection.
async fn open_pool(db_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Parse an optional stored timestamp column
pub(crate) fn parse_optional_timestamp(
    value: Option<String>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    value
        .map(|s| popmetrics_common::time::parse_timestamp(&s))
        .transpose()
}
