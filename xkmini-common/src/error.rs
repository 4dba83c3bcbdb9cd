//! Common error types for xkmini

use thiserror::Error;

/// Common result type for xkmini operations
pub type Result<T> = std::result::Result<T, Error>;

/// SQLite primary result codes that indicate writer contention
const SQLITE_BUSY: &str = "5";
const SQLITE_LOCKED: &str = "6";

/// Common error types shared by the store and the web service
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Favorite submission is missing a required field
    #[error("Invalid favorite: {0}")]
    InvalidFavorite(String),

    /// Write still locked after the retry policy ran out
    #[error("Database locked during {operation} after {attempts} attempts")]
    Contention {
        operation: String,
        attempts: u32,
    },

    /// Schema creation or migration failed (transaction rolled back)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the underlying SQLite engine refused the operation because
    /// another connection holds the write lock.
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => {
                if let Some(code) = db_err.code() {
                    // Extended codes keep the primary code in the low byte
                    let primary = code
                        .parse::<i64>()
                        .map(|c| (c & 0xff).to_string())
                        .unwrap_or_else(|_| code.to_string());
                    if primary == SQLITE_BUSY || primary == SQLITE_LOCKED {
                        return true;
                    }
                }
                let message = db_err.message();
                message.contains("database is locked") || message.contains("database table is locked")
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_contention() {
        assert!(!Error::Internal("database is locked".to_string()).is_lock_contention());
        assert!(!Error::InvalidFavorite("title".to_string()).is_lock_contention());
        assert!(!Error::Database(sqlx::Error::RowNotFound).is_lock_contention());
    }

    #[test]
    fn test_contention_display() {
        let err = Error::Contention {
            operation: "add favorite".to_string(),
            attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "Database locked during add favorite after 5 attempts"
        );
    }
}
