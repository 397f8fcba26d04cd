//! Semantic configuration checks.
//!
//! Serde already rejected syntactically broken input; this pass looks at how
//! the values relate to each other. It reports every problem it finds instead
//! of stopping at the first one.

use std::net::IpAddr;

use crate::config::diagnostic::Diagnostic;
use crate::config::schema::{normalize_origin, AuthMode, Config};

/// Checks a fully merged configuration.
pub fn validate_config(config: &Config) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if config.server_tls {
        if config.tls_cert_file.is_none() {
            diagnostics.push(Diagnostic::fatal(
                "SCREEGO_TLS_CERT_FILE must be set if TLS is enabled",
            ));
        }
        if config.tls_key_file.is_none() {
            diagnostics.push(Diagnostic::fatal(
                "SCREEGO_TLS_KEY_FILE must be set if TLS is enabled",
            ));
        }
    }

    if config.external_ip.is_empty() {
        diagnostics.push(Diagnostic::fatal("SCREEGO_EXTERNAL_IP must be set"));
    }
    for ip in &config.external_ip {
        if ip.parse::<IpAddr>().is_err() {
            diagnostics.push(Diagnostic::fatal(format!(
                "SCREEGO_EXTERNAL_IP: {ip:?} is not an IP address"
            )));
        }
    }

    for origin in &config.cors_allowed_origins {
        if origin != "*" && normalize_origin(origin).is_none() {
            diagnostics.push(Diagnostic::fatal(format!(
                "SCREEGO_CORS_ALLOWED_ORIGINS: {origin:?} is not a valid origin"
            )));
        }
    }

    if config.session_timeout_seconds == 0 {
        diagnostics.push(Diagnostic::fatal(
            "SCREEGO_SESSION_TIMEOUT_SECONDS must be greater than zero",
        ));
    }

    if config.users_file.is_none() {
        if config.auth_mode != AuthMode::None {
            diagnostics.push(Diagnostic::warn(format!(
                "SCREEGO_USERS_FILE unset while auth mode is {}, nobody will be able to log in",
                config.auth_mode.as_str()
            )));
        }
        if config.prometheus {
            diagnostics.push(Diagnostic::warn(
                "SCREEGO_USERS_FILE unset, /metrics will reject every request",
            ));
        }
    }

    diagnostics
}
