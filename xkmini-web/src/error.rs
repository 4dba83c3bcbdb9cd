//! Error types for xkmini-web

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use rand::RngCore;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Favorites could not be read (500, trace id already logged)
    #[error("Failed to fetch favorites (trace_id {trace_id})")]
    FavoritesUnavailable { trace_id: String },

    /// Template rendering failed (500)
    #[error("Template error: {0}")]
    Render(#[from] tera::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::FavoritesUnavailable { trace_id } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to fetch favorites",
                    "trace_id": trace_id,
                })),
            )
                .into_response(),
            ApiError::Render(err) => {
                let trace_id = new_trace_id();
                error!(trace_id = %trace_id, "Rendering failed: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html("An unexpected error occurred."),
                )
                    .into_response()
            }
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Random correlation id for log lines: 8 bytes as 16 lowercase hex digits
pub fn new_trace_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_shape() {
        let id = new_trace_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, new_trace_id());
    }
}
