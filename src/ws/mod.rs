//! Signaling room management.
//!
//! # Data Flow
//! ```text
//! GET /stream?room=<id>
//!     → RoomManager::upgrade (origin, auth, handshake)
//!     → one task per socket, frames → Event
//!     → RoomManager::start loop → Registry (rooms, relay credentials)
//!     → outbox per session → socket
//! ```

pub mod registry;
pub mod rooms;

use std::sync::Arc;

use axum::{extract::Request, response::Response};
use futures_util::future::BoxFuture;
use tokio::sync::broadcast;

pub use rooms::Rooms;

/// Owner of live signaling sessions.
pub trait RoomManager: Send + Sync + 'static {
    /// Perform the WebSocket handshake for `request`.
    fn upgrade(&self, request: Request) -> BoxFuture<'_, Response>;

    /// Background loop. Runs until `shutdown` fires and is started once.
    fn start(self: Arc<Self>, shutdown: broadcast::Receiver<()>) -> BoxFuture<'static, ()>;
}
