//! screego HTTP entry layer and its collaborators.

pub mod auth;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod turn;
pub mod ui;
pub mod ws;

pub use config::Config;
pub use http::{build_router, AppState};
pub use lifecycle::Shutdown;
