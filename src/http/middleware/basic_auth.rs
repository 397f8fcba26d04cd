//! HTTP Basic authentication against the user store.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::auth::UserStore;

const REALM: &str = "Basic realm=\"screego\"";

pub async fn basic_auth(
    State(users): State<Arc<dyn UserStore>>,
    request: Request,
    next: Next,
) -> Response {
    match basic_credentials(request.headers()) {
        Some((name, password)) if users.validate(&name, &password) => next.run(request).await,
        _ => unauthorized(),
    }
}

/// Decode `Authorization: Basic <base64(name:password)>`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (name, password) = decoded.split_once(':')?;
    Some((name.to_owned(), password.to_owned()))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [
            (header::WWW_AUTHENTICATE, REALM),
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
        ],
        "Unauthorized.\n",
    )
        .into_response()
}
