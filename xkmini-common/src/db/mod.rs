//! Favorites persistence: connection setup, schema, migrations, retry

pub mod favorites;
pub mod init;
pub mod migrations;
pub mod models;
pub mod retry;
pub mod schema_sync;
pub mod table_schemas;

pub use favorites::FavoritesStore;
pub use init::{open_database, open_in_memory};
pub use migrations::{migrate_favorites, MigrationReport, MigrationStep, FAVORITES_MIGRATIONS};
pub use models::{FavoriteEntry, NewFavorite};
pub use retry::{retry_on_lock, RetryPolicy};
