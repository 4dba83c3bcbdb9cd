//! # xkmini Common Library
//!
//! Shared code for the xkmini comic viewer:
//! - Comic and favorite data model
//! - Favorites store (SQLite schema, migrations, lock retry)
//! - Configuration resolution
//! - Flat-file log formatting

pub mod comic;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;

pub use comic::Comic;
pub use error::{Error, Result};
