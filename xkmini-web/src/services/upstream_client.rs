//! Comic source HTTP client
//!
//! One GET per lookup against `<base>/info.0.json` (latest) or
//! `<base>/<num>/info.0.json`. No retries and no caching.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use xkmini_common::Comic;

const USER_AGENT: &str = concat!("xkmini/", env!("CARGO_PKG_VERSION"));

/// Comic source errors
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connection failure or timeout
    #[error("Network error: {0}")]
    Transport(String),

    /// Requested comic does not exist upstream
    #[error("Comic {0} not found upstream")]
    NotFound(u32),

    /// Any other non-success status
    #[error("Upstream returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Body is not a comic object
    #[error("Invalid response from comic source: {0}")]
    InvalidBody(String),
}

/// Anything that can produce comics by number
///
/// `None` asks for the latest comic.
#[async_trait]
pub trait ComicSource: Send + Sync {
    async fn fetch(&self, num: Option<u32>) -> Result<Comic, UpstreamError>;
}

/// HTTP client for the comic JSON endpoint
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint URL for the latest comic or a numbered one
    pub fn comic_url(&self, num: Option<u32>) -> String {
        match num {
            Some(n) => format!("{}/{}/info.0.json", self.base_url, n),
            None => format!("{}/info.0.json", self.base_url),
        }
    }

    async fn get_comic(&self, num: Option<u32>) -> Result<Comic, UpstreamError> {
        let url = self.comic_url(num);
        info!(url = %url, "Fetching comic");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(n) = num {
                return Err(UpstreamError::NotFound(n));
            }
        }
        if !status.is_success() {
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        parse_comic(&body)
    }
}

#[async_trait]
impl ComicSource for UpstreamClient {
    async fn fetch(&self, num: Option<u32>) -> Result<Comic, UpstreamError> {
        let result = self.get_comic(num).await;
        if let Err(ref e) = result {
            error!(requested = ?num, "Comic fetch failed: {}", e);
        }
        result
    }
}

/// Decode a response body into a comic
///
/// The body must be a JSON object with a positive integer `num` that fits in
/// a `u32`.
pub fn parse_comic(body: &[u8]) -> Result<Comic, UpstreamError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| UpstreamError::InvalidBody(format!("not JSON: {}", e)))?;

    let Value::Object(ref fields) = value else {
        return Err(UpstreamError::InvalidBody("expected a JSON object".to_string()));
    };

    match fields.get("num").and_then(Value::as_i64) {
        Some(n) if n >= 1 && u32::try_from(n).is_ok() => {}
        _ => {
            return Err(UpstreamError::InvalidBody(
                "missing or invalid comic number".to_string(),
            ))
        }
    }

    serde_json::from_value(value).map_err(|e| UpstreamError::InvalidBody(e.to_string()))
}
