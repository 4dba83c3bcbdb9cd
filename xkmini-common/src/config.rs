//! Configuration loading
//!
//! Each setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The first two are merged by the binary's argument parser and arrive here as
//! [`ConfigOverrides`].

use crate::db::RetryPolicy;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_DB_PATH: &str = "data/favorites.sqlite";
pub const DEFAULT_LOG_FILE: &str = "logs/app.log";
pub const DEFAULT_UPSTREAM_URL: &str = "https://xkcd.com";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Config file picked up from the working directory when none is named
const DEFAULT_CONFIG_FILE: &str = "xkmini.toml";

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub log_file: PathBuf,
    pub upstream_url: String,
    pub upstream_timeout: Duration,
    pub max_connections: u32,
    pub retry: RetryPolicy,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub upstream_url: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
}

/// On-disk TOML layout
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub upstream_url: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
    pub max_connections: Option<u32>,
    pub retry: Option<RetrySection>,
}

/// `[retry]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub backoff_ms: Option<u64>,
}

impl FileConfig {
    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid config file: {}", e)))
    }

    /// Load the config file
    ///
    /// An explicitly named file must exist. Without one, `xkmini.toml` in the
    /// working directory is used when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&path)?;
        Self::parse(&content)
    }
}

impl AppConfig {
    /// Resolve configuration from overrides, config file and defaults
    pub fn resolve(overrides: ConfigOverrides, config_file: Option<&Path>) -> Result<Self> {
        let file = FileConfig::load(config_file)?;
        Self::merge(overrides, file)
    }

    /// Merge already-loaded sources (overrides win over the file)
    pub fn merge(overrides: ConfigOverrides, file: FileConfig) -> Result<Self> {
        let retry_file = file.retry.unwrap_or_default();
        let defaults = RetryPolicy::default();
        let retry = RetryPolicy::new(
            retry_file.max_attempts.unwrap_or(defaults.max_attempts),
            retry_file
                .backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.backoff),
        );
        if retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".to_string()));
        }

        let timeout_secs = overrides
            .upstream_timeout_secs
            .or(file.upstream_timeout_secs)
            .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config("upstream_timeout_secs must be positive".to_string()));
        }

        let max_connections = file.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if max_connections == 0 {
            return Err(Error::Config("max_connections must be positive".to_string()));
        }

        Ok(Self {
            bind: overrides
                .bind
                .or(file.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            db_path: overrides
                .db_path
                .or(file.db_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            log_file: overrides
                .log_file
                .or(file.log_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            upstream_url: overrides
                .upstream_url
                .or(file.upstream_url)
                .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            upstream_timeout: Duration::from_secs(timeout_secs),
            max_connections,
            retry,
        })
    }
}
