//! Structured logging.
//!
//! Uses the `tracing` ecosystem: a registry with an `EnvFilter` and a `fmt`
//! layer. `RUST_LOG` wins over the configured level when it is set.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogLevel;

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(level: LogLevel) -> String {
    format!("screego={level},tower_http={level}")
}

/// Install the global subscriber. Must be called once, before anything logs.
pub fn init(level: LogLevel) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives(level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_follow_level() {
        assert_eq!(
            default_directives(LogLevel::Debug),
            "screego=debug,tower_http=debug"
        );
    }
}
