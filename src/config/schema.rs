//! Configuration schema definitions.
//!
//! All types derive Serde traits so the TOML file can stay minimal; anything
//! left out falls back to the `Default` impls below.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration of the server.
///
/// Built once by the loader and shared as `Arc<Config>`; nothing mutates it
/// afterwards.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Minimum level of emitted log records.
    pub log_level: LogLevel,

    /// Listen address, `host:port` or Go-style `:port`.
    pub server_address: String,

    /// Serve HTTPS instead of plain HTTP.
    pub server_tls: bool,

    /// Certificate chain (PEM), required when `server_tls` is set.
    pub tls_cert_file: Option<PathBuf>,

    /// Private key (PEM), required when `server_tls` is set.
    pub tls_key_file: Option<PathBuf>,

    /// Users file with one `name:salt$digest` entry per line.
    pub users_file: Option<PathBuf>,

    /// Key used to sign session cookies and relay credentials.
    pub secret: Secret,

    /// Lifetime of a login session.
    pub session_timeout_seconds: u64,

    /// Who has to log in before using the server.
    pub auth_mode: AuthMode,

    /// Origins allowed to issue cross-origin requests. `*` allows any.
    pub cors_allowed_origins: Vec<String>,

    /// Expose `/metrics` (basic auth protected).
    pub prometheus: bool,

    /// Close a room and disconnect everyone once its owner leaves.
    pub close_room_when_owner_leaves: bool,

    /// Public IPs announced to clients for the relay.
    pub external_ip: Vec<String>,

    /// Address of the relay, only the port is announced.
    pub turn_address: String,

    /// Directory holding the compiled web UI.
    pub ui_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            server_address: ":5050".to_string(),
            server_tls: false,
            tls_cert_file: None,
            tls_key_file: None,
            users_file: None,
            secret: Secret::default(),
            session_timeout_seconds: 24 * 60 * 60,
            auth_mode: AuthMode::Turn,
            cors_allowed_origins: Vec::new(),
            prometheus: false,
            close_room_when_owner_leaves: true,
            external_ip: Vec::new(),
            turn_address: "0.0.0.0:3478".to_string(),
            ui_dir: PathBuf::from("ui/build"),
        }
    }
}

impl Config {
    /// Decides whether a cross-origin request from `origin` is permitted.
    ///
    /// Origins are compared in their serialized `scheme://host[:port]` form,
    /// so `https://Example.com:443` and `https://example.com` are equal.
    pub fn check_origin(&self, origin: &str) -> bool {
        let Some(origin) = normalize_origin(origin) else {
            return false;
        };
        self.cors_allowed_origins.iter().any(|allowed| {
            allowed == "*" || normalize_origin(allowed).as_deref() == Some(origin.as_str())
        })
    }
}

/// Parses an origin and returns its ASCII serialization, `None` when the
/// value is not a tuple origin (e.g. `null` or a `data:` URL).
pub fn normalize_origin(origin: &str) -> Option<String> {
    let origin = Url::parse(origin).ok()?.origin();
    origin
        .is_tuple()
        .then(|| origin.ascii_serialization())
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level {other:?}")),
        }
    }
}

/// Authentication requirement for the signaling endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Every room participant must be logged in.
    All,
    /// Only creating a room (and thus handing out relay access) needs a login.
    Turn,
    /// No login required.
    None,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::All => "all",
            AuthMode::Turn => "turn",
            AuthMode::None => "none",
        }
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(AuthMode::All),
            "turn" => Ok(AuthMode::Turn),
            "none" => Ok(AuthMode::None),
            other => Err(format!("unknown auth mode {other:?}, expected all, turn or none")),
        }
    }
}

/// Secret material that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}
