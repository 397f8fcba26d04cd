//! Cross-origin request policy.
//!
//! Two layers cooperate:
//! - [`origin_guard`] rejects cross-origin requests whose `Origin` fails
//!   [`Config::check_origin`] before any handler runs, and limits the methods
//!   cross-origin callers may use.
//! - [`cors_layer`] answers preflights and adds the grant headers for origins
//!   that passed.
//!
//! Requests whose `Origin` names the server itself are same-origin and are not
//! subject to the allow-list.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use url::Url;

use crate::config::Config;

/// Methods cross-origin callers may use.
pub const ALLOWED_METHODS: [Method; 2] = [Method::GET, Method::POST];

/// How a request relates to the server's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
    /// No `Origin` header, not a browser cross-origin request.
    Absent,
    SameOrigin,
    Allowed,
    Denied,
}

pub fn classify(config: &Config, headers: &HeaderMap, uri: &Uri) -> OriginKind {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return OriginKind::Absent;
    };
    let Ok(origin) = origin.to_str() else {
        return OriginKind::Denied;
    };
    if is_same_origin(origin, headers, uri) {
        OriginKind::SameOrigin
    } else if config.check_origin(origin) {
        OriginKind::Allowed
    } else {
        OriginKind::Denied
    }
}

/// True unless the request carries an `Origin` the server must refuse.
pub fn origin_allowed(config: &Config, headers: &HeaderMap, uri: &Uri) -> bool {
    classify(config, headers, uri) != OriginKind::Denied
}

fn is_same_origin(origin: &str, headers: &HeaderMap, uri: &Uri) -> bool {
    let Some(host) = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))
    else {
        return false;
    };
    let Ok(origin) = Url::parse(origin) else {
        return false;
    };
    let Some(origin_host) = origin.host_str() else {
        return false;
    };
    let authority = match origin.port() {
        Some(port) => format!("{origin_host}:{port}"),
        None => origin_host.to_string(),
    };
    authority.eq_ignore_ascii_case(host)
}

pub async fn origin_guard(
    State(config): State<Arc<Config>>,
    request: Request,
    next: Next,
) -> Response {
    match classify(&config, request.headers(), request.uri()) {
        OriginKind::Denied => {
            tracing::debug!(
                origin = ?request.headers().get(header::ORIGIN),
                path = %request.uri().path(),
                "Cross-origin request rejected"
            );
            (StatusCode::FORBIDDEN, "Origin not allowed").into_response()
        }
        OriginKind::Allowed
            if request.method() != Method::OPTIONS
                && !ALLOWED_METHODS.contains(request.method()) =>
        {
            StatusCode::METHOD_NOT_ALLOWED.into_response()
        }
        _ => next.run(request).await,
    }
}

/// Grant headers and preflight handling for allowed origins.
pub fn cors_layer(config: Arc<Config>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts| {
                origin.to_str().is_ok_and(|origin| config.check_origin(origin))
            },
        ))
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([
            header::ACCEPT,
            header::ACCEPT_LANGUAGE,
            header::CONTENT_LANGUAGE,
            header::CONTENT_TYPE,
            header::ORIGIN,
        ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            cors_allowed_origins: vec!["https://app.example".into()],
            ..Config::default()
        }
    }

    fn headers(origin: Option<&'static str>, host: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static(host));
        if let Some(origin) = origin {
            headers.insert(header::ORIGIN, HeaderValue::from_static(origin));
        }
        headers
    }

    #[test]
    fn classifies_origins() {
        let config = config();
        let uri = Uri::from_static("/config");
        assert_eq!(
            classify(&config, &headers(None, "screego.example"), &uri),
            OriginKind::Absent
        );
        assert_eq!(
            classify(
                &config,
                &headers(Some("https://screego.example"), "screego.example"),
                &uri
            ),
            OriginKind::SameOrigin
        );
        assert_eq!(
            classify(
                &config,
                &headers(Some("http://localhost:5050"), "localhost:5050"),
                &uri
            ),
            OriginKind::SameOrigin
        );
        assert_eq!(
            classify(
                &config,
                &headers(Some("https://app.example"), "screego.example"),
                &uri
            ),
            OriginKind::Allowed
        );
        assert_eq!(
            classify(
                &config,
                &headers(Some("https://evil.example"), "screego.example"),
                &uri
            ),
            OriginKind::Denied
        );
    }

    #[test]
    fn same_origin_uses_uri_authority_without_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, HeaderValue::from_static("https://h2.example"));
        let uri = Uri::from_static("https://h2.example/config");
        assert!(origin_allowed(&config(), &headers, &uri));
    }
}
