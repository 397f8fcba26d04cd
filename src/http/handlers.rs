//! Route handlers. Most of them only hand the request to a collaborator.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::observability::metrics::MetricsExporter;

/// Non-secret settings and the caller's identity for the web UI.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiConfig<'a> {
    pub auth_mode: &'a str,
    pub user: String,
    pub logged_in: bool,
    pub version: &'a str,
    pub close_room_when_owner_leaves: bool,
}

pub async fn stream(State(state): State<AppState>, request: Request) -> Response {
    state.rooms.upgrade(request).await
}

pub async fn login(State(state): State<AppState>, request: Request) -> Response {
    state.users.authenticate(request).await
}

pub async fn logout(State(state): State<AppState>, request: Request) -> Response {
    state.users.logout(request)
}

pub async fn ui_config(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = state.users.current_user(&headers);
    let body = UiConfig {
        auth_mode: state.config.auth_mode.as_str(),
        logged_in: user.is_some(),
        user: user.unwrap_or_default(),
        version: &state.version,
        close_room_when_owner_leaves: state.config.close_room_when_owner_leaves,
    };

    match serde_json::to_vec(&body) {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode ui config");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn metrics(exporter: MetricsExporter) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        exporter.render(),
    )
        .into_response()
}

/// Empty 404, used for every path nothing else claims.
pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
