//! Cross-cutting request middleware.

pub mod access_log;
pub mod basic_auth;
pub mod cors;
