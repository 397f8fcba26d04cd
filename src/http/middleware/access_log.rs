//! Access logging.
//!
//! One DEBUG event per request under the `screego::access` target, emitted
//! after the response is produced, for matched routes and the fallback alike.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::HttpBody,
    extract::{ConnectInfo, Request},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::observability::metrics;

/// `tracing` target of access log events.
pub const ACCESS_LOG_TARGET: &str = "screego::access";

pub async fn access_log(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().host())
        .unwrap_or_default()
        .to_owned();
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration = start.elapsed();
    tracing::debug!(
        target: ACCESS_LOG_TARGET,
        host = %host,
        status,
        size = response_size(&response),
        ip = %ip,
        path = %path,
        duration = ?duration,
        "HTTP"
    );
    metrics::record_request(method.as_str(), status, start);

    response
}

/// Body length if known up front, otherwise the declared `Content-Length`.
fn response_size(response: &Response) -> u64 {
    response.body().size_hint().exact().unwrap_or_else(|| {
        response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn size_prefers_exact_body_length() {
        let response = (StatusCode::OK, "hello").into_response();
        assert_eq!(response_size(&response), 5);
        assert_eq!(response_size(&StatusCode::NOT_FOUND.into_response()), 0);
    }

    #[test]
    fn size_falls_back_to_content_length() {
        let stream = futures_util::stream::iter(vec![Ok::<_, std::io::Error>("abc")]);
        let response = Response::builder()
            .header(header::CONTENT_LENGTH, "3")
            .body(Body::from_stream(stream))
            .unwrap();
        assert_eq!(response_size(&response), 3);
    }
}
