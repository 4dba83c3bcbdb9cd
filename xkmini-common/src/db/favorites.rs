//! Favorites store
//!
//! Owns the database pool for the favorites table. The schema is created or
//! migrated the first time any operation runs (at most once per store), and
//! every write goes through the lock-retry policy.

use crate::db::init::{open_database, open_in_memory};
use crate::db::migrations::{migrate_favorites, MigrationReport};
use crate::db::models::{FavoriteEntry, NewFavorite};
use crate::db::retry::{retry_on_lock, RetryPolicy};
use crate::{Error, Result};
use sqlx::SqlitePool;
use std::path::Path;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const SELECT_COLUMNS: &str = "comic_id, title, img, alt, original_date, created_at";

/// Durable, idempotent favorites persistence
#[derive(Debug)]
pub struct FavoritesStore {
    pool: SqlitePool,
    retry: RetryPolicy,
    schema: OnceCell<MigrationReport>,
}

impl FavoritesStore {
    /// Wrap an existing pool; the schema is checked on first use
    pub fn new(pool: SqlitePool, retry: RetryPolicy) -> Self {
        Self {
            pool,
            retry,
            schema: OnceCell::new(),
        }
    }

    /// Open the database file and initialize the schema
    pub async fn open(db_path: &Path, max_connections: u32, retry: RetryPolicy) -> Result<Self> {
        let pool = open_database(db_path, max_connections, &retry).await?;
        let store = Self::new(pool, retry);
        store.initialize().await?;
        Ok(store)
    }

    /// Initialized store backed by a private in-memory database
    pub async fn in_memory(retry: RetryPolicy) -> Result<Self> {
        let store = Self::new(open_in_memory().await?, retry);
        store.initialize().await?;
        Ok(store)
    }

    /// Create or migrate the schema
    ///
    /// Runs once; later calls return the first run's report. A failed run is
    /// not cached, so the next call tries again.
    pub async fn initialize(&self) -> Result<&MigrationReport> {
        self.schema
            .get_or_try_init(|| async {
                let report = migrate_favorites(&self.pool, &self.retry).await?;
                info!("Favorites store ready");
                Ok::<_, Error>(report)
            })
            .await
    }

    /// Store a favorite unless one already exists for that comic
    ///
    /// Returns `true` when a row was inserted, `false` when the comic was
    /// already a favorite. Invalid input is rejected before any write.
    pub async fn add_favorite(&self, favorite: &NewFavorite) -> Result<bool> {
        let valid = favorite.validate()?;
        self.initialize().await?;

        let created_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let result = retry_on_lock("add favorite", &self.retry, || async {
            sqlx::query(
                "INSERT OR IGNORE INTO favorites (comic_id, title, img, alt, original_date, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(valid.comic_id)
            .bind(&valid.title)
            .bind(&valid.img)
            .bind(&valid.alt)
            .bind(&valid.original_date)
            .bind(&created_at)
            .execute(&self.pool)
            .await
            .map_err(Error::from)
        })
        .await?;

        let inserted = result.rows_affected() == 1;
        if inserted {
            info!("Added comic {} to favorites", valid.comic_id);
        } else {
            debug!("Comic {} already in favorites", valid.comic_id);
        }
        Ok(inserted)
    }

    /// All favorites, in no particular order
    pub async fn list_favorites(&self) -> Result<Vec<FavoriteEntry>> {
        self.initialize().await?;

        let entries = sqlx::query_as::<_, FavoriteEntry>(&format!(
            "SELECT {} FROM favorites",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// One favorite by comic number
    pub async fn get_favorite(&self, comic_id: i64) -> Result<Option<FavoriteEntry>> {
        self.initialize().await?;

        let entry = sqlx::query_as::<_, FavoriteEntry>(&format!(
            "SELECT {} FROM favorites WHERE comic_id = ?",
            SELECT_COLUMNS
        ))
        .bind(comic_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Number of stored favorites
    pub async fn count_favorites(&self) -> Result<i64> {
        self.initialize().await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Close all connections
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
