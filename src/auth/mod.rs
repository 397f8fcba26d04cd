//! Authentication subsystem.
//!
//! The router only talks to [`UserStore`]; [`Users`] is the file-backed
//! implementation used by the `serve` command.

pub mod password;
pub mod session;
pub mod users;

use axum::{extract::Request, http::HeaderMap, response::Response};
use futures_util::future::BoxFuture;

pub use password::hash_password;
pub use users::{Users, UsersError};

/// Credential and session state consulted by HTTP handlers.
///
/// Implementations own their synchronization; the router shares one instance
/// across all connections behind an `Arc`.
pub trait UserStore: Send + Sync + 'static {
    /// Handle a login submission and produce the complete response,
    /// including any session cookie.
    fn authenticate(&self, request: Request) -> BoxFuture<'_, Response>;

    /// End the caller's session.
    fn logout(&self, request: Request) -> Response;

    /// The logged-in user behind the request, if any.
    fn current_user(&self, headers: &HeaderMap) -> Option<String>;

    /// Check a name/password pair.
    fn validate(&self, name: &str, password: &str) -> bool;
}
