//! Static UI assets

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

const APP_JS: &str = include_str!("../ui/app.js");

/// GET /static/app.js
///
/// Serves the progressive-enhancement script
pub async fn serve_app_js() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        APP_JS,
    )
        .into_response()
}
