//! Database connection setup
//!
//! Opens the favorites database file, creating it (and its parent
//! directory) on first run.

use crate::db::retry::{retry_on_lock, RetryPolicy};
use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// How long SQLite itself waits on a lock before reporting it
///
/// Kept at zero so contention surfaces immediately and is handled by the
/// store's retry policy.
pub const BUSY_TIMEOUT: Duration = Duration::ZERO;

/// Open (or create) the database file
///
/// The first connection switches the file to WAL, which needs an exclusive
/// lock, so connecting runs under `policy` like any other write.
pub async fn open_database(
    db_path: &Path,
    max_connections: u32,
    policy: &RetryPolicy,
) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL lets readers proceed while a writer holds the lock
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = retry_on_lock("open database", policy, || {
        let options = options.clone();
        async move {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect_with(options)
                .await
                .map_err(Error::from)
        }
    })
    .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    Ok(pool)
}

/// Private in-memory database on a single long-lived connection
pub async fn open_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_creates_file_and_parent_directory() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("data").join("favorites.sqlite");

        let pool = open_database(&db_path, 2, &RetryPolicy::default()).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();

        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_uses_wal_journal() {
        let dir = TempDir::new().unwrap();
        let pool = open_database(&dir.path().join("wal.sqlite"), 1, &RetryPolicy::default())
            .await.unwrap();

        let mode: String = sqlx::query_scalar("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_in_memory_keeps_state_between_queries() {
        let pool = open_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE t (x INTEGER)").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO t VALUES (1)").execute(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
