//! Extraction context providing access to request data.
//!
//! The [`ExtractionContext`] is the read-only view of a request that every
//! loader works from.

use bytes::Bytes;
use http::request::Parts;
use http::{header, HeaderMap, Method, Uri};
use sift_core::{MatchedRoute, Params};

/// Context providing access to all parts of an HTTP request.
///
/// # Example
///
/// ```rust
/// use sift_extract::ExtractionContext;
/// use sift_core::{MatchedRoute, Params};
/// use http::{HeaderMap, Method, Uri};
/// use bytes::Bytes;
///
/// let mut params = Params::new();
/// params.push("id", "123");
///
/// let ctx = ExtractionContext::new(
///     Method::GET,
///     Uri::from_static("/users/123?full=1"),
///     HeaderMap::new(),
///     Bytes::new(),
///     MatchedRoute::new("/users/{id}", params),
/// );
///
/// assert_eq!(ctx.method(), &Method::GET);
/// assert_eq!(ctx.route().params().get("id"), Some("123"));
/// assert_eq!(ctx.query_string(), Some("full=1"));
/// ```
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    route: MatchedRoute,
}

impl ExtractionContext {
    /// Creates a new extraction context.
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
        route: MatchedRoute,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            route,
        }
    }

    /// Creates a context from request parts and an already collected body.
    ///
    /// The matched route is read from the request extensions. Requests the
    /// router did not annotate are treated as a literal route on their path.
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            body,
            route: matched_route(parts),
        }
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the query string if present.
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request body as bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the matched route.
    pub fn route(&self) -> &MatchedRoute {
        &self.route
    }

    /// Returns a specific header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the Content-Type header value, if present and non-blank.
    pub fn content_type(&self) -> Option<&str> {
        self.header(header::CONTENT_TYPE.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// Returns the Accept header value.
    pub fn accept(&self) -> Option<&str> {
        self.header(header::ACCEPT.as_str())
    }
}

/// Returns the route stored by the router, or a literal route for the path.
pub fn matched_route(parts: &Parts) -> MatchedRoute {
    parts
        .extensions
        .get::<MatchedRoute>()
        .cloned()
        .unwrap_or_else(|| MatchedRoute::literal(parts.uri.path()))
}

/// Builder for constructing an `ExtractionContext`.
#[derive(Debug, Default)]
pub struct ExtractionContextBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    pattern: Option<String>,
    params: Params,
}

impl ExtractionContextBuilder {
    /// Creates a new builder for `GET /`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI.
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// Adds a single header.
    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the matched route pattern.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Adds a single path parameter.
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push(name, value);
        self
    }

    /// Builds the extraction context.
    ///
    /// Without an explicit pattern, the URI path is used.
    pub fn build(self) -> ExtractionContext {
        let pattern = self
            .pattern
            .unwrap_or_else(|| self.uri.path().to_string());
        ExtractionContext {
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            body: self.body,
            route: MatchedRoute::new(pattern, self.params),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_reads_matched_route() {
        let mut params = Params::new();
        params.push("age", "30");
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("/30/profile?x=1")
            .header("content-type", "application/json")
            .extension(MatchedRoute::new("/{age}/profile", params))
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();

        let ctx = ExtractionContext::from_parts(&parts, Bytes::from_static(b"{}"));
        assert_eq!(ctx.route().pattern(), "/{age}/profile");
        assert_eq!(ctx.route().params().get("age"), Some("30"));
        assert_eq!(ctx.content_type(), Some("application/json"));
        assert_eq!(ctx.body().as_ref(), b"{}");
    }

    #[test]
    fn test_from_parts_without_route() {
        let request = http::Request::builder()
            .uri("/health")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();

        let ctx = ExtractionContext::from_parts(&parts, Bytes::new());
        assert_eq!(ctx.route().pattern(), "/health");
        assert!(ctx.route().params().is_empty());
    }

    #[test]
    fn test_blank_content_type_is_absent() {
        let ctx = ExtractionContextBuilder::new()
            .header("content-type", "  ")
            .build();
        assert_eq!(ctx.content_type(), None);
    }

    #[test]
    fn test_builder() {
        let ctx = ExtractionContextBuilder::new()
            .method(Method::PUT)
            .uri(Uri::from_static("/items/9?a=1"))
            .pattern("/items/{id}")
            .path_param("id", "9")
            .header("accept", "application/json")
            .body("[]")
            .build();

        assert_eq!(ctx.method(), &Method::PUT);
        assert_eq!(ctx.route().pattern(), "/items/{id}");
        assert_eq!(ctx.accept(), Some("application/json"));
        assert_eq!(ctx.query_string(), Some("a=1"));
    }
}
