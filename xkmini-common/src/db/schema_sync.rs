//! Schema introspection and drift detection
//!
//! Expected table layouts are declared in code ([`TableSchema`]); the actual
//! layout is read back with `PRAGMA table_info` into a [`SchemaSnapshot`].
//! Comparing the two yields the additive fixes (missing nullable columns)
//! that can be applied in place with `ALTER TABLE .. ADD COLUMN`.
//!
//! Everything here takes a generic executor so it runs equally against the
//! pool or inside a migration transaction.

use crate::Result;
use sqlx::{Executor, Row, Sqlite};
use tracing::warn;

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER")
    pub sql_type: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// DEFAULT value (SQL expression)
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    /// Create new column definition
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            default_value: None,
        }
    }

    /// Mark column as PRIMARY KEY
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Set DEFAULT value
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Column clause for CREATE TABLE
    pub fn create_clause(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        sql
    }

    /// Statements that add this column to an existing table
    ///
    /// SQLite refuses `ADD COLUMN` with a non-constant default and refuses
    /// NOT NULL without a default. Such columns are added nullable and
    /// backfilled with their default expression instead.
    pub fn add_column_statements(&self, table: &str) -> Vec<String> {
        let mut add = format!("ALTER TABLE {} ADD COLUMN {} {}", table, self.name, self.sql_type);

        if self.primary_key {
            warn!(
                "Cannot add PRIMARY KEY column {}.{} via ALTER TABLE; adding it without the constraint",
                table, self.name
            );
        }

        match &self.default_value {
            Some(default) if is_constant_default(default) => {
                if self.not_null {
                    add.push_str(" NOT NULL");
                }
                add.push_str(&format!(" DEFAULT {}", default));
                vec![add]
            }
            Some(default) => vec![
                add,
                format!(
                    "UPDATE {} SET {} = {} WHERE {} IS NULL",
                    table, self.name, default, self.name
                ),
            ],
            None => vec![add],
        }
    }
}

/// Non-constant defaults are expressions SQLite evaluates per row
fn is_constant_default(default: &str) -> bool {
    let upper = default.trim().to_uppercase();
    !(upper.starts_with('(')
        || upper == "CURRENT_TIMESTAMP"
        || upper == "CURRENT_DATE"
        || upper == "CURRENT_TIME")
}

/// Actual column from database introspection (PRAGMA table_info result)
#[derive(Debug, Clone, PartialEq)]
pub struct ActualColumn {
    /// Column ID (position in table)
    pub cid: i32,
    /// Column name
    pub name: String,
    /// SQL type from PRAGMA table_info
    pub type_name: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// DEFAULT value
    pub default_value: Option<String>,
    /// PRIMARY KEY flag
    pub pk: bool,
}

impl ActualColumn {
    /// Fixture helper: a plain nullable column
    #[cfg(test)]
    pub(crate) fn named(cid: i32, name: &str, type_name: &str) -> Self {
        Self {
            cid,
            name: name.to_string(),
            type_name: type_name.to_string(),
            not_null: false,
            default_value: None,
            pk: false,
        }
    }
}

/// Point-in-time view of one table's layout
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaSnapshot {
    pub table: String,
    /// Columns in cid order; empty when the table does not exist
    pub columns: Vec<ActualColumn>,
}

impl SchemaSnapshot {
    /// Snapshot for a table that is not there
    pub fn missing(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
        }
    }

    /// Snapshot built from column names (for pure step tests)
    #[cfg(test)]
    pub(crate) fn with_columns(table: &str, names: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            columns: names
                .iter()
                .enumerate()
                .map(|(i, n)| ActualColumn::named(i as i32, n, "TEXT"))
                .collect(),
        }
    }

    pub fn exists(&self) -> bool {
        !self.columns.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Schema drift detected between expected and actual schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    /// Column missing from database
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Column type mismatch (cannot auto-fix)
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
}

/// Defines expected schema for a database table
pub trait TableSchema {
    /// Table name in database
    fn table_name() -> &'static str;

    /// Expected column definitions (order matters for new table creation)
    fn expected_columns() -> Vec<ColumnDefinition>;

    /// CREATE TABLE statement for the expected layout under `name`
    fn create_table_sql(name: &str) -> String {
        let columns: Vec<String> = Self::expected_columns()
            .iter()
            .map(ColumnDefinition::create_clause)
            .collect();
        format!("CREATE TABLE {} (\n    {}\n)", name, columns.join(",\n    "))
    }
}

/// Schema introspection - read actual database schema
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Read a table's columns with PRAGMA table_info
    ///
    /// A missing table yields an empty snapshot.
    pub async fn snapshot<'e, E>(executor: E, table_name: &str) -> Result<SchemaSnapshot>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(executor).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        // Sort by cid to ensure consistent order
        columns.sort_by_key(|c| c.cid);

        Ok(SchemaSnapshot {
            table: table_name.to_string(),
            columns,
        })
    }

    /// Check if table exists
    pub async fn table_exists<'e, E>(executor: E, table_name: &str) -> Result<bool>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type='table' AND name = ?
            )
            "#,
        )
        .bind(table_name)
        .fetch_one(executor)
        .await?;

        Ok(exists)
    }
}

/// Schema comparison - detect drift between expected and actual
pub struct SchemaDiff;

impl SchemaDiff {
    /// Compare expected schema to actual database schema
    pub fn compare(expected: &[ColumnDefinition], actual: &SchemaSnapshot) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            match actual
                .columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(&expected_col.name))
            {
                Some(actual_col) => {
                    if !Self::types_compatible(&expected_col.sql_type, &actual_col.type_name) {
                        drift.push(SchemaDrift::TypeMismatch {
                            table: actual.table.clone(),
                            column: expected_col.name.clone(),
                            expected: expected_col.sql_type.clone(),
                            actual: actual_col.type_name.clone(),
                        });
                    }
                }
                None => drift.push(SchemaDrift::MissingColumn {
                    table: actual.table.clone(),
                    column: expected_col.clone(),
                }),
            }
        }

        drift
    }

    /// Check if SQL types are compatible (SQLite type affinity rules)
    ///
    /// Untyped legacy columns (empty type) are accepted as anything.
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = expected.to_uppercase();
        let act = actual.to_uppercase();

        if exp == act || act.is_empty() {
            return true;
        }

        let int = |t: &str| t.contains("INT");
        let text = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
        let real = |t: &str| t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB");
        let timestamp = |t: &str| t.contains("TIMESTAMP") || t.contains("DATE");

        (int(&exp) && int(&act))
            || (text(&exp) && (text(&act) || timestamp(&act)))
            || (real(&exp) && real(&act))
    }
}
