//! Table Schema Definitions
//!
//! Single source of truth for the favorites table layout.

use crate::db::schema_sync::{ColumnDefinition, TableSchema};

pub const FAVORITES_TABLE: &str = "favorites";

/// Key columns used by earlier releases, in detection order
pub const LEGACY_KEY_COLUMNS: &[&str] = &["comic_num", "num"];

/// Favorites table schema
///
/// One row per comic, keyed by the upstream comic number.
pub struct FavoritesTableSchema;

impl TableSchema for FavoritesTableSchema {
    fn table_name() -> &'static str {
        FAVORITES_TABLE
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("comic_id", "INTEGER").primary_key(),
            ColumnDefinition::new("title", "TEXT"),
            ColumnDefinition::new("img", "TEXT"),
            ColumnDefinition::new("alt", "TEXT"),
            // YYYY-MM-DD, NULL when upstream sent no usable date
            ColumnDefinition::new("original_date", "TEXT"),
            ColumnDefinition::new("created_at", "TEXT")
                .not_null()
                .default("CURRENT_TIMESTAMP"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_favorites_create_sql() {
        let sql = FavoritesTableSchema::create_table_sql(FAVORITES_TABLE);
        assert_eq!(
            sql,
            "CREATE TABLE favorites (\n    comic_id INTEGER PRIMARY KEY,\n    title TEXT,\n    img TEXT,\n    alt TEXT,\n    original_date TEXT,\n    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP\n)"
        );
    }
}
