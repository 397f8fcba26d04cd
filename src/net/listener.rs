//! Listener setup and the serve loop.
//!
//! # Responsibilities
//! - Resolve `server_address` (Go-style `:port` binds every interface)
//! - Serve plain HTTP or HTTPS depending on `server_tls`
//! - Stop accepting and drain in-flight requests once shutdown resolves

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::net::tls::load_tls_config;

/// How long TLS connections may take to finish after shutdown starts.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Address did not resolve to anything.
    Resolve(String),
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// TLS enabled but certificate or key unusable.
    Tls(std::io::Error),
    /// Server stopped with an error.
    Serve(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Resolve(addr) => write!(f, "Cannot resolve address {}", addr),
            ListenerError::Bind(e) => write!(f, "Failed to bind: {}", e),
            ListenerError::Tls(e) => write!(f, "Failed to load TLS config: {}", e),
            ListenerError::Serve(e) => write!(f, "Server failed: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Turn `:port` into `0.0.0.0:port`; other forms pass through.
pub fn normalize_address(address: &str) -> String {
    match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => address.to_string(),
    }
}

pub async fn resolve(address: &str) -> Result<SocketAddr, ListenerError> {
    let normalized = normalize_address(address);
    let mut candidates = tokio::net::lookup_host(normalized.as_str())
        .await
        .map_err(ListenerError::Bind)?;
    candidates
        .next()
        .ok_or_else(|| ListenerError::Resolve(address.to_string()))
}

/// Serve `router` on the configured address until `shutdown` resolves.
pub async fn serve<F>(router: Router, config: &Config, shutdown: F) -> Result<(), ListenerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = resolve(&config.server_address).await?;

    if config.server_tls {
        let tls = load_tls_config(config).await.map_err(ListenerError::Tls)?;

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown.await;
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        tracing::info!(address = %addr, "HTTPS server started");
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(ListenerError::Serve)
    } else {
        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        serve_on(listener, router, shutdown).await
    }
}

/// Serve plain HTTP on an already bound listener.
pub async fn serve_on<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<(), ListenerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;
    tracing::info!(address = %local_addr, "HTTP server started");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(ListenerError::Serve)
}
