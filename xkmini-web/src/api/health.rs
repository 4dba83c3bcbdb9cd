//! Health check endpoint

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    /// Stored favorites, absent when the store could not be read
    pub favorites: Option<i64>,
}

/// GET /health
///
/// 200 with `ok` while the favorites store answers, 503 with `degraded`
/// otherwise.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, label, favorites) = match state.store.count_favorites().await {
        Ok(count) => (StatusCode::OK, "ok", Some(count)),
        Err(e) => {
            warn!("Health check could not read favorites: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", None)
        }
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            module: "xkmini-web".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            favorites,
        }),
    )
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
