//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Diagnostics → Users → Relay → Rooms task → Router → Listener
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGINT/SIGTERM → listener drains → rooms signalled → rooms task joined
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{BackgroundTask, Shutdown};
pub use startup::StartupError;
