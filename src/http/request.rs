//! Request correlation.
//!
//! # Responsibilities
//! - Name the request ID header
//! - Open one tracing span per request carrying that ID
//!
//! # Design Decisions
//! - IDs are generated by `tower_http`'s `SetRequestIdLayer` (UUID v4) as early as possible
//! - The same ID is echoed back on the response

use axum::{body::Body, http::HeaderMap, http::Request};
use tracing::Span;

pub const X_REQUEST_ID: &str = "x-request-id";

/// The request ID header value, or `"unknown"` when absent or not UTF-8.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Span factory for `TraceLayer`.
pub fn make_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id(request.headers()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_id_lookup() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_id(&headers), "unknown");
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("abc-123"));
        assert_eq!(request_id(&headers), "abc-123");
    }
}
