//! HTTP entry layer.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → middleware (access log, origin guard, CORS)
//!     → server.rs router
//!         /stream  → RoomManager::upgrade
//!         /login   → UserStore::authenticate
//!         /logout  → UserStore::logout
//!         /config  → handlers::ui_config
//!         /metrics → basic auth → Prometheus text (optional)
//!         *        → ui assets, then 404
//! ```

pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{build_router, AppState, RouterError};
