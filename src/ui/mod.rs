//! Web UI asset serving.

use std::path::Path;

use axum::{handler::HandlerWithoutStateExt, Router};
use tower_http::services::ServeDir;

use crate::http::handlers;
use crate::http::AppState;

/// Mount the static UI as the router's fallback. Registered routes always take
/// precedence; paths with no matching file end in an empty 404.
pub fn register(router: Router<AppState>, dir: &Path) -> Router<AppState> {
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "UI directory not found, only API routes are served");
    }
    let assets = ServeDir::new(dir)
        .append_index_html_on_directories(true)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(handlers::not_found.into_service());
    router.fallback_service(assets)
}
