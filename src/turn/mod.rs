//! Relay (TURN) credential issuing.
//!
//! Peers behind restrictive NATs relay media through a TURN server. This
//! module does not relay anything itself; it announces the configured relay
//! endpoints and hands out short-lived REST-style credentials the relay can
//! verify with the shared secret:
//!
//! ```text
//! username   = "<unix expiry>:<user>"
//! credential = base64(hmac_sha256(secret, username))
//! ```

use std::net::{AddrParseError, IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

use crate::config::Config;

type HmacSha256 = Hmac<Sha256>;

/// One entry of a WebRTC `iceServers` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    pub username: String,
    pub credential: String,
}

/// Handle used by the room manager to give peers relay access.
pub trait RelayCredentials: Send + Sync + 'static {
    fn credentials(&self, user: &str) -> IceServer;
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid turn address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: AddrParseError,
    },
    #[error("no external ip configured")]
    NoExternalIp,
    #[error("invalid external ip {ip:?}: {source}")]
    ExternalIp {
        ip: String,
        #[source]
        source: AddrParseError,
    },
    #[error("invalid secret: {0}")]
    Secret(#[from] hmac::digest::InvalidLength),
}

/// Relay reachable on the configured external addresses.
pub struct ExternalRelay {
    urls: Vec<String>,
    mac: HmacSha256,
    ttl: Duration,
}

impl ExternalRelay {
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn credentials_at(&self, user: &str, now: SystemTime) -> IceServer {
        let expires = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
            + self.ttl.as_secs();
        let username = format!("{expires}:{user}");
        let mut mac = self.mac.clone();
        mac.update(username.as_bytes());
        IceServer {
            urls: self.urls.clone(),
            username,
            credential: BASE64.encode(mac.finalize().into_bytes()),
        }
    }
}

impl RelayCredentials for ExternalRelay {
    fn credentials(&self, user: &str) -> IceServer {
        self.credentials_at(user, SystemTime::now())
    }
}

/// Prepare the relay described by `config` and return its credential handle.
pub fn start(config: &Config) -> Result<Arc<dyn RelayCredentials>, RelayError> {
    let relay = external_relay(config)?;
    tracing::info!(urls = ?relay.urls(), "Relay credentials ready");
    Ok(Arc::new(relay))
}

fn external_relay(config: &Config) -> Result<ExternalRelay, RelayError> {
    let address: SocketAddr = config
        .turn_address
        .parse()
        .map_err(|source| RelayError::Address {
            address: config.turn_address.clone(),
            source,
        })?;

    if config.external_ip.is_empty() {
        return Err(RelayError::NoExternalIp);
    }

    let mut urls = Vec::with_capacity(config.external_ip.len() * 2);
    for ip in &config.external_ip {
        let ip: IpAddr = ip.parse().map_err(|source| RelayError::ExternalIp {
            ip: ip.clone(),
            source,
        })?;
        let endpoint = SocketAddr::new(ip, address.port());
        urls.push(format!("stun:{endpoint}"));
        urls.push(format!("turn:{endpoint}"));
    }

    Ok(ExternalRelay {
        urls,
        mac: HmacSha256::new_from_slice(config.secret.as_bytes())?,
        ttl: Duration::from_secs(config.session_timeout_seconds),
    })
}
