//! xkmini-web library
//!
//! Comic viewer over an upstream comic JSON source, with a local favorites
//! list. The binary in `main.rs` wires configuration, logging and the store
//! into [`build_router`].

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use xkmini_common::db::FavoritesStore;

pub mod api;
pub mod error;
pub mod services;
pub mod views;

use services::ComicLookup;
use views::Templates;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<FavoritesStore>,
    pub lookup: ComicLookup,
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Create application state, compiling the page templates
    pub fn new(store: Arc<FavoritesStore>, lookup: ComicLookup) -> Result<Self, tera::Error> {
        Ok(Self {
            store,
            lookup,
            templates: Arc::new(Templates::new()?),
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::show_comic).post(api::submit_comic))
        .route("/api/favorites", get(api::list_favorites))
        .route("/static/app.js", get(api::serve_app_js))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
