//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → GET /metrics (Prometheus scrape, basic auth)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event instead of formatted strings
//! - Metric macros are no-ops until a recorder is installed, so code paths
//!   record unconditionally

pub mod logging;
pub mod metrics;
