//! Request router construction.
//!
//! # Responsibilities
//! - Bind the fixed routes to the collaborators
//! - Register the UI assets as the fallback so they never shadow a route
//! - Wrap everything (fallback included) in the middleware stack
//!
//! # Layering
//! ```text
//! access_log → origin_guard → cors → route | ui fallback
//! ```

use std::sync::Arc;

use axum::{
    middleware,
    routing::{any, get, post},
    Router,
};
use thiserror::Error;

use crate::auth::UserStore;
use crate::config::Config;
use crate::http::handlers;
use crate::http::middleware::{access_log, basic_auth, cors};
use crate::observability::metrics::MetricsExporter;
use crate::ui;
use crate::ws::RoomManager;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: Arc<dyn RoomManager>,
    pub users: Arc<dyn UserStore>,
    pub version: Arc<str>,
    pub metrics: Option<MetricsExporter>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        rooms: Arc<dyn RoomManager>,
        users: Arc<dyn UserStore>,
        version: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            config,
            rooms,
            users,
            version: version.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, exporter: MetricsExporter) -> Self {
        self.metrics = Some(exporter);
        self
    }
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("prometheus is enabled but no metrics exporter was provided")]
    MissingMetricsExporter,
}

/// A middleware stage: wraps the router built so far.
pub type Middleware = fn(Router, &AppState) -> Router;

/// Applied in order, so the last entry is the outermost layer.
pub const MIDDLEWARE: [Middleware; 3] = [with_cors, with_origin_guard, with_access_log];

fn with_cors(router: Router, state: &AppState) -> Router {
    router.layer(cors::cors_layer(Arc::clone(&state.config)))
}

fn with_origin_guard(router: Router, state: &AppState) -> Router {
    router.layer(middleware::from_fn_with_state(
        Arc::clone(&state.config),
        cors::origin_guard,
    ))
}

fn with_access_log(router: Router, _state: &AppState) -> Router {
    router.layer(middleware::from_fn(access_log::access_log))
}

/// Build the complete dispatcher. Building twice from the same state yields
/// routers with identical behavior.
pub fn build_router(state: AppState) -> Result<Router, RouterError> {
    let mut routes = Router::new()
        .route("/stream", any(handlers::stream))
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/config", get(handlers::ui_config));

    if state.config.prometheus {
        let exporter = state
            .metrics
            .clone()
            .ok_or(RouterError::MissingMetricsExporter)?;
        tracing::info!("Prometheus enabled");
        routes = routes.route(
            "/metrics",
            get(move || handlers::metrics(exporter.clone())).route_layer(
                middleware::from_fn_with_state(Arc::clone(&state.users), basic_auth::basic_auth),
            ),
        );
    }

    let router = ui::register(routes, &state.config.ui_dir).with_state(state.clone());

    Ok(MIDDLEWARE
        .iter()
        .fold(router, |router, apply| apply(router, &state)))
}
