//! Favorites schema migrations
//!
//! Migrations are an ordered list of [`MigrationStep`]s. Each step inspects a
//! [`SchemaSnapshot`] of the favorites table and returns the statements it
//! wants to run, or `None` when it does not apply. Planning is pure, so each
//! legacy shape can be tested without a database.
//!
//! All steps run in one transaction. The snapshot is re-read before every
//! step, so a process that loses a migration race to another one finds
//! nothing left to do.
//!
//! # Shapes handled
//!
//! 1. No table: create it.
//! 2. Table keyed by a legacy column (`comic_num`, `num`) and lacking
//!    image/caption/date columns: rebuild into the current layout.
//! 3. Current key but missing newer columns: add them in place.

use crate::db::retry::{retry_on_lock, RetryPolicy};
use crate::db::schema_sync::{SchemaDiff, SchemaDrift, SchemaIntrospector, SchemaSnapshot, TableSchema};
use crate::db::table_schemas::{FavoritesTableSchema, FAVORITES_TABLE, LEGACY_KEY_COLUMNS};
use crate::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{error, info, warn};

/// Scratch table used while rebuilding a legacy table
const REBUILD_TABLE: &str = "favorites_migrating";

/// Statements planned for one step; `None` when the step does not apply
pub type MigrationPlan = Option<Vec<String>>;

/// One named, independently testable migration step
#[derive(Debug, Clone, Copy)]
pub struct MigrationStep {
    pub name: &'static str,
    pub plan: fn(&SchemaSnapshot) -> Result<MigrationPlan>,
}

/// Favorites migrations in the order they are attempted
pub const FAVORITES_MIGRATIONS: &[MigrationStep] = &[
    MigrationStep {
        name: "create_table",
        plan: plan_create_table,
    },
    MigrationStep {
        name: "rebuild_from_legacy_key",
        plan: plan_rebuild_from_legacy_key,
    },
    MigrationStep {
        name: "add_missing_columns",
        plan: plan_add_missing_columns,
    },
];

/// Names of the steps that actually ran
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<&'static str>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Step 1: create the table when it does not exist
pub fn plan_create_table(snapshot: &SchemaSnapshot) -> Result<MigrationPlan> {
    if snapshot.exists() {
        return Ok(None);
    }
    Ok(Some(vec![FavoritesTableSchema::create_table_sql(FAVORITES_TABLE)]))
}

/// Step 2: rebuild a table keyed by a legacy column
///
/// Text columns the old layout lacks become `''`. A legacy `date` is kept as
/// `original_date` only when it looks like `YYYY-MM-DD`, otherwise NULL.
/// Duplicate legacy keys collapse to the first row copied.
pub fn plan_rebuild_from_legacy_key(snapshot: &SchemaSnapshot) -> Result<MigrationPlan> {
    if !snapshot.exists() || snapshot.has_column("comic_id") {
        return Ok(None);
    }

    let key = LEGACY_KEY_COLUMNS
        .iter()
        .find(|name| snapshot.has_column(name))
        .ok_or_else(|| {
            let found: Vec<&str> = snapshot.columns.iter().map(|c| c.name.as_str()).collect();
            Error::Schema(format!(
                "Table '{}' has no recognizable key column (found: {})",
                snapshot.table,
                found.join(", ")
            ))
        })?;

    let text_or_empty = |column: &str| {
        if snapshot.has_column(column) {
            column.to_string()
        } else {
            "''".to_string()
        }
    };

    let date_source = ["original_date", "date"]
        .into_iter()
        .find(|c| snapshot.has_column(c));
    let date_expr = match date_source {
        Some(column) => format!(
            "CASE WHEN {c} GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]' THEN {c} ELSE NULL END",
            c = column
        ),
        None => "NULL".to_string(),
    };

    let created_expr = if snapshot.has_column("created_at") {
        "COALESCE(created_at, CURRENT_TIMESTAMP)".to_string()
    } else {
        "CURRENT_TIMESTAMP".to_string()
    };

    Ok(Some(vec![
        format!("DROP TABLE IF EXISTS {}", REBUILD_TABLE),
        FavoritesTableSchema::create_table_sql(REBUILD_TABLE),
        format!(
            "INSERT OR IGNORE INTO {new} (comic_id, title, img, alt, original_date, created_at) \
             SELECT CAST({key} AS INTEGER), {title}, {img}, {alt}, {date}, {created} \
             FROM {old} WHERE {key} IS NOT NULL AND CAST({key} AS INTEGER) > 0",
            new = REBUILD_TABLE,
            old = snapshot.table,
            key = key,
            title = text_or_empty("title"),
            img = text_or_empty("img"),
            alt = text_or_empty("alt"),
            date = date_expr,
            created = created_expr,
        ),
        format!("DROP TABLE {}", snapshot.table),
        format!("ALTER TABLE {} RENAME TO {}", REBUILD_TABLE, snapshot.table),
    ]))
}

/// Step 3: add newer nullable columns to a current-key table
pub fn plan_add_missing_columns(snapshot: &SchemaSnapshot) -> Result<MigrationPlan> {
    if !snapshot.exists() || !snapshot.has_column("comic_id") {
        return Ok(None);
    }

    let mut statements = Vec::new();
    for drift in SchemaDiff::compare(&FavoritesTableSchema::expected_columns(), snapshot) {
        match drift {
            SchemaDrift::MissingColumn { table, column } => {
                statements.extend(column.add_column_statements(&table));
            }
            SchemaDrift::TypeMismatch {
                table,
                column,
                expected,
                actual,
            } => {
                warn!(
                    "Type mismatch in {}.{}: expected '{}', found '{}'; leaving column as is",
                    table, column, expected, actual
                );
            }
        }
    }

    Ok(if statements.is_empty() {
        None
    } else {
        Some(statements)
    })
}

/// Bring the favorites table to the current layout
///
/// Lock contention retries the whole transaction under `policy`. Any other
/// failure is reported as [`Error::Schema`] after rollback.
pub async fn migrate_favorites(pool: &SqlitePool, policy: &RetryPolicy) -> Result<MigrationReport> {
    let result = retry_on_lock("favorites schema migration", policy, || {
        apply_steps(pool, FAVORITES_MIGRATIONS)
    })
    .await;

    match result {
        Ok(report) => {
            if report.is_noop() {
                info!("Favorites schema is up to date");
            } else {
                info!("Favorites schema migrated: {}", report.applied.join(", "));
            }
            Ok(report)
        }
        Err(err) => {
            let err = match err {
                Error::Schema(_) | Error::Contention { .. } => err,
                other => Error::Schema(format!("Favorites migration failed: {}", other)),
            };
            error!(
                table = FAVORITES_TABLE,
                "Favorites migration failed, changes rolled back: {}", err
            );
            Err(err)
        }
    }
}

/// Run `steps` in a single transaction, rolling back on any failure
pub async fn apply_steps(pool: &SqlitePool, steps: &[MigrationStep]) -> Result<MigrationReport> {
    let mut tx = pool.begin().await?;

    match run_steps(&mut tx, steps).await {
        Ok(report) => {
            tx.commit().await?;
            Ok(report)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback after failed migration also failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}

async fn run_steps(tx: &mut Transaction<'_, Sqlite>, steps: &[MigrationStep]) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();

    for step in steps {
        let snapshot = SchemaIntrospector::snapshot(&mut **tx, FAVORITES_TABLE).await?;
        let Some(statements) = (step.plan)(&snapshot)? else {
            continue;
        };

        info!(
            "Running migration step '{}' ({} statements)",
            step.name,
            statements.len()
        );
        for sql in &statements {
            sqlx::query(sql).execute(&mut **tx).await?;
        }
        report.applied.push(step.name);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::open_in_memory;

    async fn columns(pool: &SqlitePool) -> Vec<String> {
        SchemaIntrospector::snapshot(pool, FAVORITES_TABLE)
            .await
            .unwrap()
            .columns
            .into_iter()
            .map(|c| c.name)
            .collect()
    }

    // ---- pure planning ----

    #[test]
    fn test_create_plan_only_for_missing_table() {
        let plan = plan_create_table(&SchemaSnapshot::missing(FAVORITES_TABLE)).unwrap();
        assert_eq!(plan.unwrap().len(), 1);

        let existing = SchemaSnapshot::with_columns(FAVORITES_TABLE, &["comic_id"]);
        assert!(plan_create_table(&existing).unwrap().is_none());
    }

    #[test]
    fn test_rebuild_plan_for_minimal_legacy_shape() {
        let snapshot = SchemaSnapshot::with_columns(FAVORITES_TABLE, &["comic_num", "title", "date"]);
        let plan = plan_rebuild_from_legacy_key(&snapshot).unwrap().unwrap();

        assert_eq!(plan.len(), 5);
        let copy = &plan[2];
        assert!(copy.contains("SELECT CAST(comic_num AS INTEGER), title, '', ''"));
        assert!(copy.contains("CASE WHEN date GLOB"));
        assert!(copy.contains("CURRENT_TIMESTAMP FROM favorites"));
        assert_eq!(plan[3], "DROP TABLE favorites");
        assert_eq!(plan[4], "ALTER TABLE favorites_migrating RENAME TO favorites");
    }

    #[test]
    fn test_rebuild_plan_keeps_existing_text_columns() {
        let snapshot = SchemaSnapshot::with_columns(
            FAVORITES_TABLE,
            &["id", "comic_num", "title", "img", "alt", "date"],
        );
        let plan = plan_rebuild_from_legacy_key(&snapshot).unwrap().unwrap();
        assert!(plan[2].contains("title, img, alt,"));
    }

    #[test]
    fn test_rebuild_plan_accepts_num_key_without_date() {
        let snapshot = SchemaSnapshot::with_columns(FAVORITES_TABLE, &["num", "title"]);
        let plan = plan_rebuild_from_legacy_key(&snapshot).unwrap().unwrap();
        assert!(plan[2].contains("CAST(num AS INTEGER)"));
        assert!(plan[2].contains("'', '', NULL, CURRENT_TIMESTAMP"));
    }

    #[test]
    fn test_rebuild_plan_skips_current_and_missing_tables() {
        let current = SchemaSnapshot::with_columns(FAVORITES_TABLE, &["comic_id", "title"]);
        assert!(plan_rebuild_from_legacy_key(&current).unwrap().is_none());
        assert!(plan_rebuild_from_legacy_key(&SchemaSnapshot::missing(FAVORITES_TABLE))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_rebuild_plan_rejects_unknown_key() {
        let snapshot = SchemaSnapshot::with_columns(FAVORITES_TABLE, &["slug", "title"]);
        let err = plan_rebuild_from_legacy_key(&snapshot).unwrap_err();
        assert!(matches!(err, Error::Schema(msg) if msg.contains("slug")));
    }

    #[test]
    fn test_additive_plan_lists_missing_columns() {
        let snapshot = SchemaSnapshot::with_columns(FAVORITES_TABLE, &["comic_id", "title"]);
        let plan = plan_add_missing_columns(&snapshot).unwrap().unwrap();

        assert_eq!(
            plan,
            vec![
                "ALTER TABLE favorites ADD COLUMN img TEXT".to_string(),
                "ALTER TABLE favorites ADD COLUMN alt TEXT".to_string(),
                "ALTER TABLE favorites ADD COLUMN original_date TEXT".to_string(),
                "ALTER TABLE favorites ADD COLUMN created_at TEXT".to_string(),
                "UPDATE favorites SET created_at = CURRENT_TIMESTAMP WHERE created_at IS NULL"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_additive_plan_noop_for_complete_table() {
        let snapshot = SchemaSnapshot::with_columns(
            FAVORITES_TABLE,
            &["comic_id", "title", "img", "alt", "original_date", "created_at"],
        );
        assert!(plan_add_missing_columns(&snapshot).unwrap().is_none());
    }

    // ---- fixture databases ----

    #[tokio::test]
    async fn test_fresh_database_gets_table() {
        let pool = open_in_memory().await.unwrap();
        let report = migrate_favorites(&pool, &RetryPolicy::immediate(1)).await.unwrap();

        assert_eq!(report.applied, vec!["create_table"]);
        assert_eq!(
            columns(&pool).await,
            vec!["comic_id", "title", "img", "alt", "original_date", "created_at"]
        );
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let pool = open_in_memory().await.unwrap();
        migrate_favorites(&pool, &RetryPolicy::immediate(1)).await.unwrap();
        let report = migrate_favorites(&pool, &RetryPolicy::immediate(1)).await.unwrap();
        assert!(report.is_noop());
    }

    #[tokio::test]
    async fn test_legacy_autoincrement_shape_is_rebuilt() {
        let pool = open_in_memory().await.unwrap();
        sqlx::query(
            r#"
            CREATE TABLE favorites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                comic_num INTEGER UNIQUE NOT NULL,
                title TEXT,
                img TEXT,
                alt TEXT,
                date TEXT
            )
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO favorites (comic_num, title, img, alt, date) VALUES \
             (10, 'Ten', 'ten.png', 'ten alt', '2007-05-01'), \
             (11, 'Eleven', NULL, 'x', 'sometime')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let report = migrate_favorites(&pool, &RetryPolicy::immediate(1)).await.unwrap();
        assert_eq!(report.applied, vec!["rebuild_from_legacy_key"]);

        let rows: Vec<(i64, Option<String>, Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT comic_id, title, img, original_date FROM favorites ORDER BY comic_id",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(
            rows,
            vec![
                (10, Some("Ten".into()), Some("ten.png".into()), Some("2007-05-01".into())),
                (11, Some("Eleven".into()), None, None),
            ]
        );
        assert!(!columns(&pool).await.contains(&"comic_num".to_string()));
    }

    #[tokio::test]
    async fn test_current_key_shape_gets_columns_added() {
        let pool = open_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE favorites (comic_id INTEGER PRIMARY KEY, title TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO favorites VALUES (3, 'Three')")
            .execute(&pool)
            .await
            .unwrap();

        let report = migrate_favorites(&pool, &RetryPolicy::immediate(1)).await.unwrap();
        assert_eq!(report.applied, vec!["add_missing_columns"]);

        let (title, img, created_at): (String, Option<String>, Option<String>) =
            sqlx::query_as("SELECT title, img, created_at FROM favorites WHERE comic_id = 3")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(title, "Three");
        assert_eq!(img, None);
        assert!(created_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_shape_is_schema_error_and_untouched() {
        let pool = open_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE favorites (slug TEXT, title TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        let err = migrate_favorites(&pool, &RetryPolicy::immediate(3)).await.unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert_eq!(columns(&pool).await, vec!["slug", "title"]);
    }

    fn plan_broken(_snapshot: &SchemaSnapshot) -> Result<MigrationPlan> {
        Ok(Some(vec!["ALTER TABLE favorites ADD COLUMN".to_string()]))
    }

    #[tokio::test]
    async fn test_failure_rolls_back_earlier_steps() {
        let pool = open_in_memory().await.unwrap();
        let steps = [
            FAVORITES_MIGRATIONS[0],
            MigrationStep {
                name: "broken",
                plan: plan_broken,
            },
        ];

        assert!(apply_steps(&pool, &steps).await.is_err());
        assert!(!SchemaIntrospector::table_exists(&pool, FAVORITES_TABLE)
            .await
            .unwrap());
    }
}
