//! Common types used throughout the middleware pipeline.

use bytes::Bytes;
use http::{header, HeaderValue, StatusCode};
use http_body_util::Full;

/// The HTTP request type used in the middleware pipeline.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware pipeline.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building responses without panicking.
pub trait ResponseExt {
    /// Creates a response with the given status, content type and body.
    ///
    /// Falls back to a plain 500 if `content_type` is not a valid header value.
    fn with_body(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response;

    /// Creates a plain-text response.
    fn text(status: StatusCode, message: &str) -> Response;

    /// Creates a JSON response from a value.
    fn json(status: StatusCode, value: &serde_json::Value) -> Response;
}

impl ResponseExt for Response {
    fn with_body(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response {
        let Ok(content_type) = HeaderValue::from_str(content_type) else {
            return internal_error();
        };
        let mut response = http::Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
        response
    }

    fn text(status: StatusCode, message: &str) -> Response {
        Self::with_body(status, "text/plain; charset=utf-8", message.to_string())
    }

    fn json(status: StatusCode, value: &serde_json::Value) -> Response {
        Self::with_body(status, "application/json", value.to_string())
    }
}

/// A bare 500 response that cannot fail to build.
pub(crate) fn internal_error() -> Response {
    let mut response = http::Response::new(Full::new(Bytes::from_static(
        b"Internal server error",
    )));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
