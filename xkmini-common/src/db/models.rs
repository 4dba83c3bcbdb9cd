//! Favorites data model

use crate::comic::{calendar_date, Comic};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A persisted favorite, one row per comic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FavoriteEntry {
    pub comic_id: i64,
    pub title: Option<String>,
    pub img: Option<String>,
    pub alt: Option<String>,
    /// Publication date as `YYYY-MM-DD`
    pub original_date: Option<String>,
    /// When the favorite was stored (UTC, `YYYY-MM-DD HH:MM:SS`)
    pub created_at: Option<String>,
}

/// Favorite submission as received from a caller
///
/// Only `num` and `title` are required; see [`NewFavorite::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFavorite {
    pub num: Option<i64>,
    pub title: Option<String>,
    pub img: Option<String>,
    pub alt: Option<String>,
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub day: Option<i64>,
    /// Pre-formatted `YYYY-MM-DD`, used when year/month/day are unusable
    pub date: Option<String>,
}

/// Row values ready to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidFavorite {
    pub comic_id: i64,
    pub title: String,
    pub img: String,
    pub alt: String,
    pub original_date: Option<String>,
}

impl NewFavorite {
    /// Publication date from year/month/day, else from `date`, else none
    pub fn original_date(&self) -> Option<String> {
        calendar_date(self.year, self.month, self.day)
            .or_else(|| {
                self.date
                    .as_deref()
                    .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
            })
            .map(|d| d.format("%Y-%m-%d").to_string())
    }

    /// Check required fields and fill defaults
    pub fn validate(&self) -> Result<ValidFavorite> {
        let comic_id = match self.num {
            Some(num) if num >= 1 => num,
            Some(num) => {
                return Err(Error::InvalidFavorite(format!(
                    "comic number must be positive, got {}",
                    num
                )))
            }
            None => return Err(Error::InvalidFavorite("missing comic number".to_string())),
        };

        let title = self
            .title
            .clone()
            .ok_or_else(|| Error::InvalidFavorite("missing title".to_string()))?;

        Ok(ValidFavorite {
            comic_id,
            title,
            img: self.img.clone().unwrap_or_default(),
            alt: self.alt.clone().unwrap_or_default(),
            original_date: self.original_date(),
        })
    }
}

impl From<&Comic> for NewFavorite {
    fn from(comic: &Comic) -> Self {
        Self {
            num: Some(comic.num),
            title: Some(comic.title.clone()),
            img: Some(comic.img.clone()),
            alt: Some(comic.alt.clone()),
            year: comic.year,
            month: comic.month,
            day: comic.day,
            date: None,
        }
    }
}
