//! Favorites JSON endpoint

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::error;
use xkmini_common::db::FavoriteEntry;

use crate::error::{new_trace_id, ApiError, ApiResult};
use crate::AppState;

/// One favorite as exposed over the API
///
/// `date` is the comic's publication date and `created_at` when it was
/// favorited; neither stands in for the other.
#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub num: i64,
    pub title: Option<String>,
    pub img: Option<String>,
    pub alt: Option<String>,
    pub date: Option<String>,
    pub created_at: Option<String>,
}

impl From<FavoriteEntry> for FavoriteResponse {
    fn from(entry: FavoriteEntry) -> Self {
        Self {
            num: entry.comic_id,
            title: entry.title,
            img: entry.img,
            alt: entry.alt,
            date: entry.original_date,
            created_at: entry.created_at,
        }
    }
}

/// GET /api/favorites
pub async fn list_favorites(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<FavoriteResponse>>> {
    let entries = state.store.list_favorites().await.map_err(|e| {
        let trace_id = new_trace_id();
        error!(trace_id = %trace_id, "Favorites endpoint error: {}", e);
        ApiError::FavoritesUnavailable { trace_id }
    })?;

    Ok(Json(entries.into_iter().map(FavoriteResponse::from).collect()))
}
