//! Signed session cookies.
//!
//! A token is `base64url(name:expiry) "." base64url(hmac_sha256(secret, payload))`.
//! Nothing is kept server side; a token stays valid until it expires.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "user";

/// Issues and verifies session tokens.
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
    timeout: Duration,
}

impl SessionSigner {
    pub fn new(secret: &[u8], timeout: Duration) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret)?,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn issue(&self, user: &str, now: SystemTime) -> String {
        let expires = unix_secs(now) + self.timeout.as_secs();
        let payload = format!("{user}:{expires}");
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = mac.finalize().into_bytes();
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Returns the user name if the token is authentic and not expired.
    pub fn verify(&self, token: &str, now: SystemTime) -> Option<String> {
        let (payload, signature) = token.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(&payload);
        mac.verify_slice(&signature).ok()?;

        let payload = String::from_utf8(payload).ok()?;
        let (user, expires) = payload.rsplit_once(':')?;
        let expires: u64 = expires.parse().ok()?;
        (unix_secs(now) < expires).then(|| user.to_string())
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Extract the session token from the request's `Cookie` headers.
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// `Set-Cookie` value carrying a token. `max_age` of `None` yields a browser
/// session cookie.
pub fn session_cookie(token: &str, max_age: Option<Duration>) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict");
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={}", max_age.as_secs()));
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}
