//! Comic lookup
//!
//! Turns "latest" or "comic N" into a validated [`Comic`], plus the pure
//! helpers the page needs: request id parsing, clamping to the known range,
//! and the navigation targets around a comic.

use crate::services::upstream_client::{ComicSource, UpstreamError};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use xkmini_common::Comic;

pub const MSG_NETWORK: &str =
    "Network error: Unable to fetch comic. Please check your connection and try again.";
pub const MSG_NOT_FOUND: &str = "Comic not found. Please try a different comic number.";
pub const MSG_INVALID_ID: &str = "Invalid comic number. Please enter a valid number.";

/// Lookup errors
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Comic number must be greater than 0 (got {0})")]
    InvalidArgument(i64),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl LookupError {
    /// Fixed message shown to the visitor; upstream detail stays in the log
    pub fn user_message(&self) -> &'static str {
        match self {
            LookupError::InvalidArgument(_) => MSG_INVALID_ID,
            LookupError::Upstream(UpstreamError::Transport(_)) => MSG_NETWORK,
            LookupError::Upstream(_) => MSG_NOT_FOUND,
        }
    }
}

/// Comic lookup over a [`ComicSource`]
#[derive(Clone)]
pub struct ComicLookup {
    source: Arc<dyn ComicSource>,
}

impl ComicLookup {
    pub fn new(source: Arc<dyn ComicSource>) -> Self {
        Self { source }
    }

    /// Most recent comic; its number is the ceiling for valid ids
    pub async fn get_latest(&self) -> Result<Comic, LookupError> {
        Ok(self.source.fetch(None).await?)
    }

    /// Exactly comic `n`
    ///
    /// `n < 1` fails without contacting the source. Single attempt.
    pub async fn get_by_number(&self, n: i64) -> Result<Comic, LookupError> {
        let num = match u32::try_from(n) {
            Ok(num) if num >= 1 => num,
            _ => return Err(LookupError::InvalidArgument(n)),
        };

        let comic = self.source.fetch(Some(num)).await?;
        if comic.num != n {
            return Err(UpstreamError::InvalidBody(format!(
                "asked for comic {} but received {}",
                n, comic.num
            ))
            .into());
        }
        Ok(comic)
    }
}

/// What the `id` query parameter asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedId {
    /// No id given
    Latest,
    Number(i64),
    /// Present but not an integer
    Invalid,
}

pub fn parse_requested_id(raw: Option<&str>) -> RequestedId {
    match raw {
        None => RequestedId::Latest,
        Some(s) => match s.trim().parse::<i64>() {
            Ok(n) => RequestedId::Number(n),
            Err(_) => RequestedId::Invalid,
        },
    }
}

/// Clamp a requested id into `1..=latest`
pub fn clamp_id(requested: i64, latest: u32) -> u32 {
    let ceiling = i64::from(latest.max(1));
    requested.clamp(1, ceiling) as u32
}

/// Navigation targets around the displayed comic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub prev: u32,
    pub next: u32,
    pub random: u32,
    pub latest: u32,
}

impl Navigation {
    pub fn around(current: u32, latest: u32) -> Self {
        Self::around_with(current, latest, &mut rand::thread_rng())
    }

    pub fn around_with<R: Rng>(current: u32, latest: u32, rng: &mut R) -> Self {
        let latest = latest.max(current).max(1);
        Self {
            prev: current.saturating_sub(1).max(1),
            next: current.saturating_add(1).min(latest),
            random: rng.gen_range(1..=latest),
            latest,
        }
    }
}
