//! Network layer.
//!
//! # Data Flow
//! ```text
//! server_address
//!     → listener.rs (resolve, bind, serve until shutdown)
//!     → tls.rs (optional, when server_tls is set)
//!     → router
//! ```

pub mod listener;
pub mod tls;
