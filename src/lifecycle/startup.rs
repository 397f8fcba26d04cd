//! Startup orchestration.
//!
//! # Order
//! 1. Replay configuration diagnostics, abort on anything fatal
//! 2. Load the user store
//! 3. Start the relay credential issuer
//! 4. Create the room manager and spawn its loop
//! 5. Build the router and serve until shutdown
//!
//! Every step's failure aborts startup before a listener exists.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;

use crate::auth::{Users, UsersError};
use crate::config::{fatal_count, Config, Diagnostic, LoadedConfig};
use crate::http::{build_router, AppState, RouterError};
use crate::lifecycle::shutdown::{BackgroundTask, Shutdown};
use crate::lifecycle::signals::shutdown_signal;
use crate::net::listener::{self, ListenerError};
use crate::observability::metrics::MetricsExporter;
use crate::turn::{self, RelayError};
use crate::ws::{RoomManager, Rooms};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("{count} fatal configuration problem(s)")]
    Config { count: usize },
    #[error("cannot load users: {0}")]
    Users(#[from] UsersError),
    #[error("cannot start relay: {0}")]
    Relay(#[from] RelayError),
    #[error("cannot install metrics recorder: {0}")]
    Metrics(#[from] BuildError),
    #[error("cannot build router: {0}")]
    Router(#[from] RouterError),
    #[error("{0}")]
    Listener(#[from] ListenerError),
}

/// Log every diagnostic at its severity and count the fatal ones.
pub fn replay_diagnostics(diagnostics: &[Diagnostic]) -> usize {
    for diagnostic in diagnostics {
        diagnostic.log();
    }
    fatal_count(diagnostics)
}

/// Run the server until SIGINT or SIGTERM.
pub async fn serve(loaded: LoadedConfig, version: &str) -> Result<(), StartupError> {
    serve_until(loaded, version, shutdown_signal()).await
}

/// Run the server until `stop` resolves.
pub async fn serve_until<F>(
    loaded: LoadedConfig,
    version: &str,
    stop: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let LoadedConfig {
        config,
        diagnostics,
    } = loaded;

    let fatal = replay_diagnostics(&diagnostics);
    if fatal > 0 {
        return Err(StartupError::Config { count: fatal });
    }
    let config = Arc::new(config);

    let users = Arc::new(Users::read_passwords_file(
        config.users_file.as_deref(),
        &config.secret,
        Duration::from_secs(config.session_timeout_seconds),
    )?);

    let relay = turn::start(&config)?;

    let rooms = Arc::new(Rooms::new(relay, users.clone(), Arc::clone(&config)));

    let shutdown = Shutdown::new();
    let room_task = BackgroundTask::spawn(
        "rooms",
        Arc::clone(&rooms).start(shutdown.subscribe()),
    );

    let result = listen(Arc::clone(&config), rooms, users, version, stop).await;

    shutdown.trigger();
    room_task.join().await;
    if result.is_ok() {
        tracing::info!("Shutdown complete");
    }
    result
}

async fn listen<F>(
    config: Arc<Config>,
    rooms: Arc<Rooms>,
    users: Arc<Users>,
    version: &str,
    stop: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let mut state = AppState::new(Arc::clone(&config), rooms, users, version);
    if config.prometheus {
        state = state.with_metrics(MetricsExporter::install()?);
    }
    let router = build_router(state)?;
    listener::serve(router, &config, stop).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Severity;

    #[test]
    fn counts_fatal_diagnostics() {
        let diagnostics = vec![
            Diagnostic::info("Using config file screego.toml"),
            Diagnostic::warn("SCREEGO_SECRET unset"),
            Diagnostic::fatal("bad"),
            Diagnostic::new(Severity::Panic, "worse"),
        ];
        assert_eq!(replay_diagnostics(&diagnostics), 2);
        assert_eq!(replay_diagnostics(&[]), 0);
    }
}
