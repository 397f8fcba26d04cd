//! Configuration loading from disk and environment.
//!
//! Sources, later ones win:
//! 1. built-in defaults
//! 2. an optional TOML file
//! 3. `SCREEGO_*` environment variables

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;

use crate::config::diagnostic::Diagnostic;
use crate::config::schema::{Config, Secret};
use crate::config::validation::validate_config;

/// Error type for reading the configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

/// The merged configuration plus everything worth telling the operator.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a TOML configuration file.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Load configuration from `path` (if any) and the process environment.
pub fn load(path: Option<&Path>) -> LoadedConfig {
    load_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load`] with an injectable environment lookup.
pub fn load_with_env<F>(path: Option<&Path>, env: F) -> LoadedConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut diagnostics = Vec::new();

    let mut config = match path {
        Some(path) => match load_config(path) {
            Ok(config) => {
                diagnostics.push(Diagnostic::info(format!(
                    "Using config file {}",
                    path.display()
                )));
                config
            }
            Err(e) => {
                diagnostics.push(Diagnostic::fatal(format!(
                    "cannot load config file {}: {}",
                    path.display(),
                    e
                )));
                Config::default()
            }
        },
        None => Config::default(),
    };

    let mut overrides = EnvOverrides {
        env: &env,
        diagnostics: &mut diagnostics,
    };
    overrides.parsed("SCREEGO_LOG_LEVEL", &mut config.log_level);
    overrides.string("SCREEGO_SERVER_ADDRESS", &mut config.server_address);
    overrides.flag("SCREEGO_SERVER_TLS", &mut config.server_tls);
    overrides.path("SCREEGO_TLS_CERT_FILE", &mut config.tls_cert_file);
    overrides.path("SCREEGO_TLS_KEY_FILE", &mut config.tls_key_file);
    overrides.path("SCREEGO_USERS_FILE", &mut config.users_file);
    if let Some(secret) = env("SCREEGO_SECRET") {
        config.secret = Secret::new(secret);
    }
    overrides.parsed(
        "SCREEGO_SESSION_TIMEOUT_SECONDS",
        &mut config.session_timeout_seconds,
    );
    overrides.parsed("SCREEGO_AUTH_MODE", &mut config.auth_mode);
    overrides.list(
        "SCREEGO_CORS_ALLOWED_ORIGINS",
        &mut config.cors_allowed_origins,
    );
    overrides.flag("SCREEGO_PROMETHEUS", &mut config.prometheus);
    overrides.flag(
        "SCREEGO_CLOSE_ROOM_WHEN_OWNER_LEAVES",
        &mut config.close_room_when_owner_leaves,
    );
    overrides.list("SCREEGO_EXTERNAL_IP", &mut config.external_ip);
    overrides.string("SCREEGO_TURN_ADDRESS", &mut config.turn_address);
    if let Some(dir) = env("SCREEGO_UI_DIR") {
        config.ui_dir = PathBuf::from(dir);
    }

    diagnostics.extend(validate_config(&config));

    if config.secret.is_empty() {
        diagnostics.push(Diagnostic::warn(
            "SCREEGO_SECRET unset, user logins will be invalidated on restart",
        ));
        config.secret = random_secret();
    }

    LoadedConfig {
        config,
        diagnostics,
    }
}

fn random_secret() -> Secret {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    Secret::new(BASE64.encode(bytes))
}

/// Applies environment variables onto config fields, recording a fatal
/// diagnostic for every value that does not parse.
struct EnvOverrides<'a, F> {
    env: &'a F,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<F> EnvOverrides<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, key: &str) -> Option<String> {
        (self.env)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&mut self, key: &str, target: &mut String) {
        if let Some(value) = self.lookup(key) {
            *target = value;
        }
    }

    fn path(&mut self, key: &str, target: &mut Option<PathBuf>) {
        if let Some(value) = self.lookup(key) {
            *target = Some(PathBuf::from(value));
        }
    }

    fn list(&mut self, key: &str, target: &mut Vec<String>) {
        if let Some(value) = self.lookup(key) {
            *target = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    fn flag(&mut self, key: &str, target: &mut bool) {
        let Some(value) = self.lookup(key) else {
            return;
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => *target = true,
            "0" | "false" | "no" => *target = false,
            _ => self
                .diagnostics
                .push(Diagnostic::fatal(format!("cannot parse {key}: {value:?} is not a boolean"))),
        }
    }

    fn parsed<T>(&mut self, key: &str, target: &mut T)
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(value) = self.lookup(key) else {
            return;
        };
        match value.trim().parse() {
            Ok(parsed) => *target = parsed,
            Err(e) => self
                .diagnostics
                .push(Diagnostic::fatal(format!("cannot parse {key}: {e}"))),
        }
    }
}
