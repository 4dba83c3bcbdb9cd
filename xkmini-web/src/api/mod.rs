//! HTTP handlers for xkmini-web

pub mod comic;
pub mod favorites;
pub mod health;
pub mod ui;

pub use comic::{show_comic, submit_comic};
pub use favorites::list_favorites;
pub use health::health_routes;
pub use ui::serve_app_js;
