//! File-backed user store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use axum::{
    extract::{FromRequest, Request},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use futures_util::future::BoxFuture;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::auth::password::PasswordHash;
use crate::auth::session::{self, SessionSigner};
use crate::auth::UserStore;
use crate::config::Secret;

/// Errors while loading the users file.
#[derive(Debug, Error)]
pub enum UsersError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {reason}")]
    InvalidLine { line: usize, reason: &'static str },
    #[error("invalid secret: {0}")]
    Secret(#[from] hmac::digest::InvalidLength),
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    user: String,
    pass: String,
    #[serde(default)]
    remember: bool,
}

/// Users loaded from a passwords file plus the session cookie signer.
pub struct Users {
    entries: HashMap<String, PasswordHash>,
    sessions: SessionSigner,
}

impl Users {
    /// Load the users file. A missing path yields a store without users.
    pub fn read_passwords_file(
        path: Option<&Path>,
        secret: &Secret,
        session_timeout: Duration,
    ) -> Result<Self, UsersError> {
        let content = match path {
            Some(path) => std::fs::read_to_string(path).map_err(|source| UsersError::Io {
                path: path.to_path_buf(),
                source,
            })?,
            None => String::new(),
        };
        let users = Self::parse(&content, secret, session_timeout)?;
        tracing::info!(count = users.len(), "Users loaded");
        Ok(users)
    }

    /// Parse users file content: `name:salt$digest` per line, `#` comments.
    pub fn parse(
        content: &str,
        secret: &Secret,
        session_timeout: Duration,
    ) -> Result<Self, UsersError> {
        let mut entries = HashMap::new();
        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let invalid = |reason| UsersError::InvalidLine {
                line: index + 1,
                reason,
            };
            let (name, hash) = line
                .split_once(':')
                .ok_or_else(|| invalid("expected name:hash"))?;
            if name.is_empty() {
                return Err(invalid("empty user name"));
            }
            let hash = PasswordHash::parse(hash).ok_or_else(|| invalid("malformed password hash"))?;
            if entries.insert(name.to_string(), hash).is_some() {
                return Err(invalid("duplicate user"));
            }
        }

        Ok(Self {
            entries,
            sessions: SessionSigner::new(secret.as_bytes(), session_timeout)?,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    async fn login(&self, request: Request) -> Response {
        let Form(form) = match Form::<LoginForm>::from_request(request, &()).await {
            Ok(form) => form,
            Err(rejection) => return rejection.into_response(),
        };

        if !self.validate(&form.user, &form.pass) {
            tracing::info!(user = %form.user, "Login failed");
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "could not authenticate" })),
            )
                .into_response();
        }

        let token = self.sessions.issue(&form.user, SystemTime::now());
        let max_age = form.remember.then(|| self.sessions.timeout());
        tracing::info!(user = %form.user, remember = form.remember, "User logged in");
        (
            StatusCode::OK,
            [(header::SET_COOKIE, session::session_cookie(&token, max_age))],
            Json(json!({})),
        )
            .into_response()
    }
}

impl UserStore for Users {
    fn authenticate(&self, request: Request) -> BoxFuture<'_, Response> {
        Box::pin(self.login(request))
    }

    fn logout(&self, request: Request) -> Response {
        if let Some(user) = self.current_user(request.headers()) {
            tracing::info!(user = %user, "User logged out");
        }
        (
            StatusCode::OK,
            [(header::SET_COOKIE, session::expired_cookie())],
        )
            .into_response()
    }

    fn current_user(&self, headers: &HeaderMap) -> Option<String> {
        let token = session::session_token(headers)?;
        let user = self.sessions.verify(token, SystemTime::now())?;
        // Users removed from the file lose their sessions on restart.
        self.entries.contains_key(&user).then_some(user)
    }

    fn validate(&self, name: &str, password: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(|hash| hash.verify(password))
    }
}
