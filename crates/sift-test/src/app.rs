//! In-memory application for end-to-end tests.

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;
use crate::router::Router;
use http::{Method, StatusCode};
use serde::Serialize;
use sift_middleware::{
    BoxedMiddleware, Endpoint, Handler, Middleware, MiddlewareContext, Pipeline, Request,
    RequestIdMiddleware, Response, ResponseExt, SiftMiddleware,
};
use std::sync::Arc;

/// A routed application served without a network.
///
/// Requests are matched against the route table, annotated with the
/// endpoint and matched route, then run through
/// `RequestId → extra stages → Sift`. Unmatched requests get a 404.
#[must_use]
pub struct TestApp {
    router: Router,
    pipeline: Pipeline,
    sift: SiftMiddleware,
}

impl TestApp {
    /// Starts building an app around `sift`.
    pub fn builder(sift: SiftMiddleware) -> TestAppBuilder {
        TestAppBuilder {
            sift,
            router: Router::new(),
            stages: Vec::new(),
            error: None,
        }
    }

    /// Returns the extraction middleware, e.g. to inspect its cache.
    pub fn sift(&self) -> &SiftMiddleware {
        &self.sift
    }

    /// Returns the pipeline.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Creates a request bound to this app.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestAppRequest<'_> {
        TestAppRequest {
            app: self,
            builder: TestRequestBuilder::new(method, uri),
        }
    }

    /// Creates a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestAppRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Creates a POST request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestAppRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Creates a PUT request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestAppRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Creates a PATCH request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestAppRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Creates a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestAppRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Routes and serves one request.
    pub async fn dispatch(&self, mut request: Request) -> Response {
        if let Some((endpoint, route)) = self.router.match_route(request.method(), request.uri().path()) {
            request.extensions_mut().insert(endpoint);
            request.extensions_mut().insert(route);
        }

        self.pipeline
            .process(MiddlewareContext::new(), request, |_ctx, _request| {
                Box::pin(async { Response::text(StatusCode::NOT_FOUND, "Not Found") })
            })
            .await
    }

    /// Serves one request and collects the response.
    pub async fn send(&self, request: Request) -> Result<TestResponse, TestError> {
        TestResponse::from_http(self.dispatch(request).await).await
    }
}

/// Builder for [`TestApp`].
#[must_use]
pub struct TestAppBuilder {
    sift: SiftMiddleware,
    router: Router,
    stages: Vec<BoxedMiddleware>,
    error: Option<TestError>,
}

impl TestAppBuilder {
    /// Mounts a handler for `method` at `pattern`.
    pub fn route<H: Handler>(self, method: Method, pattern: &str, handler: H) -> Self {
        self.mount(method, pattern, Endpoint::new(handler))
    }

    /// Mounts an existing endpoint, keeping its identity.
    pub fn mount(mut self, method: Method, pattern: &str, endpoint: Endpoint) -> Self {
        if let Err(e) = self.router.insert(method, pattern, endpoint) {
            self.error.get_or_insert(e);
        }
        self
    }

    /// Mounts a GET handler.
    pub fn get<H: Handler>(self, pattern: &str, handler: H) -> Self {
        self.route(Method::GET, pattern, handler)
    }

    /// Mounts a POST handler.
    pub fn post<H: Handler>(self, pattern: &str, handler: H) -> Self {
        self.route(Method::POST, pattern, handler)
    }

    /// Adds a stage that runs after request id assignment and before Sift.
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Builds the app, reporting the first invalid route.
    pub fn build(self) -> Result<TestApp, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut pipeline = Pipeline::builder().stage(RequestIdMiddleware::new());
        for stage in self.stages {
            pipeline = pipeline.shared_stage(stage);
        }
        let pipeline = pipeline.stage(self.sift.clone()).build();

        Ok(TestApp {
            router: self.router,
            pipeline,
            sift: self.sift,
        })
    }
}

/// A request builder bound to a [`TestApp`].
#[must_use]
pub struct TestAppRequest<'a> {
    app: &'a TestApp,
    builder: TestRequestBuilder,
}

impl TestAppRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets the Accept header.
    pub fn accept(mut self, accept: impl AsRef<str>) -> Self {
        self.builder = self.builder.accept(accept);
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.query(name, value);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<bytes::Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets a form-urlencoded body.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.form(value);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(e) => panic!("test request failed: {e}"),
        }
    }

    /// Sends the request, returning build errors.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.app.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sift_core::Payload;
    use sift_middleware::{handler, REQUEST_ID_HEADER};

    fn app() -> TestApp {
        TestApp::builder(SiftMiddleware::default())
            .get(
                "/items/{id}",
                handler::untyped(|_req, payload: Payload| async move {
                    Response::json(StatusCode::OK, &payload.into_value())
                }),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_routed_request_reaches_handler() {
        let app = app();
        let response = app.get("/items/7").query("q", "x").send().await;

        response
            .assert_status(StatusCode::OK)
            .assert_json(&json!({"q": "x", "id": "7"}));
        assert!(response.header(REQUEST_ID_HEADER).is_some());
        assert_eq!(app.sift().builds(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_request_is_404() {
        let app = app();
        let response = app.get("/nothing").send().await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(app.sift().builds(), 0);
    }

    #[tokio::test]
    async fn test_extra_stage_runs_before_sift() {
        let app = TestApp::builder(SiftMiddleware::default())
            .stage(sift_middleware::FnMiddleware::new("tag", |ctx, request, next| {
                Box::pin(async move {
                    let mut response = next.run(ctx, request).await;
                    response
                        .headers_mut()
                        .insert("x-tag", http::HeaderValue::from_static("seen"));
                    response
                })
            }))
            .build()
            .unwrap();

        assert_eq!(app.pipeline().stage_names(), vec!["request_id", "tag", "sift"]);
        let response = app.get("/").send().await;
        assert_eq!(response.header_str("x-tag"), Some("seen"));
    }

    #[test]
    fn test_invalid_route_fails_build() {
        let result = TestApp::builder(SiftMiddleware::default())
            .get("no-slash", handler::request(|_req| async {
                Response::text(StatusCode::OK, "")
            }))
            .build();
        assert!(matches!(result, Err(TestError::InvalidRoute { .. })));
    }
}
