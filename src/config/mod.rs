//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! TOML file (optional) + SCREEGO_* environment
//!     → loader.rs (parse & merge)
//!     → validation.rs (semantic checks → diagnostics)
//!     → Config (immutable) + Vec<Diagnostic>
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Loading never fails outright; problems become diagnostics and the
//!   bootstrap aborts on fatal ones after logging them all

pub mod diagnostic;
pub mod loader;
pub mod schema;
pub mod validation;

pub use diagnostic::{fatal_count, Diagnostic, Severity};
pub use loader::{load, LoadedConfig};
pub use schema::{AuthMode, Config, LogLevel, Secret};
