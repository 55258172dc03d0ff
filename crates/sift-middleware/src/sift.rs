//! The extraction middleware stage.
//!
//! [`SiftMiddleware`] looks for the [`Endpoint`] the router stored in the
//! request extensions, builds (or reuses) the [`CompositeHandler`] for the
//! route identity, and lets it serve the request. Requests without an
//! endpoint pass through untouched. An endpoint without a [`MatchedRoute`]
//! is served by a composite built for that request alone, so unrouted paths
//! never grow the cache.
//!
//! The stage answers matched requests itself, so it must be the last stage
//! of a [`Pipeline`](crate::Pipeline).

use crate::cache::HandlerCache;
use crate::composite::CompositeHandler;
use crate::context::MiddlewareContext;
use crate::handler::{Endpoint, Handler};
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::responder::ErrorResponder;
use crate::types::{Request, Response};
use sift_core::{CodecRegistry, MatchedRoute, RouteIdentity, SiftResult};
use sift_extract::{BodyOptions, Loaders, SourceOrders};
use std::sync::Arc;
use tracing::{error, warn};

/// Middleware that extracts, merges and validates handler input.
///
/// Cloning is cheap; clones share one handler cache.
///
/// ```
/// use sift_core::CodecRegistry;
/// use sift_middleware::{Pipeline, RequestIdMiddleware, SiftMiddleware};
///
/// let sift = SiftMiddleware::new(CodecRegistry::with_defaults());
/// let pipeline = Pipeline::builder()
///     .stage(RequestIdMiddleware::new())
///     .stage(sift.clone())
///     .build();
///
/// assert_eq!(pipeline.stage_names(), vec!["request_id", "sift"]);
/// assert_eq!(sift.builds(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct SiftMiddleware {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    loaders: Arc<Loaders>,
    orders: SourceOrders,
    responder: ErrorResponder,
    cache: HandlerCache,
}

impl Default for SiftMiddleware {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SiftMiddleware {
    /// Creates the middleware with the standard source orders.
    pub fn new(codecs: CodecRegistry) -> Self {
        Self::builder().codecs(codecs).build()
    }

    /// Starts building a middleware.
    pub fn builder() -> SiftMiddlewareBuilder {
        SiftMiddlewareBuilder::default()
    }

    /// Returns the handler cache.
    pub fn cache(&self) -> &HandlerCache {
        &self.inner.cache
    }

    /// Returns how many composite handlers have been built.
    pub fn builds(&self) -> usize {
        self.inner.cache.builds()
    }

    /// Returns the per-method source orders.
    pub fn orders(&self) -> &SourceOrders {
        &self.inner.orders
    }

    /// Returns the codec registry.
    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        self.inner.loaders.codecs()
    }

    /// Checks ahead of traffic that `handler` can be served.
    pub fn check(&self, handler: &dyn Handler) -> SiftResult<()> {
        handler.signature().validate()
    }

    fn build_composite(&self, identity: &RouteIdentity, endpoint: &Endpoint) -> SiftResult<CompositeHandler> {
        CompositeHandler::build(
            identity.clone(),
            Arc::clone(endpoint.handler()),
            &self.inner.orders,
            Arc::clone(&self.inner.loaders),
            self.inner.responder.clone(),
        )
    }

    fn composite_for(
        &self,
        identity: &RouteIdentity,
        endpoint: &Endpoint,
        routed: bool,
    ) -> SiftResult<Arc<CompositeHandler>> {
        if !routed {
            return self.build_composite(identity, endpoint).map(Arc::new);
        }
        self.inner
            .cache
            .get_or_build(identity, || self.build_composite(identity, endpoint))
    }
}

impl Middleware for SiftMiddleware {
    fn name(&self) -> &'static str {
        "sift"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let Some(endpoint) = request.extensions().get::<Endpoint>().cloned() else {
                return next.run(ctx, request).await;
            };

            let route = request.extensions().get::<MatchedRoute>();
            let routed = route.is_some();
            let pattern = route.map_or_else(|| request.uri().path().to_string(), |r| r.pattern().to_string());
            let identity = RouteIdentity::new(request.method().clone(), pattern, endpoint.id());
            if !routed {
                warn!(
                    request_id = %ctx.request_id(),
                    route = %identity,
                    "Endpoint without a matched route, handler not cached"
                );
            }

            match self.composite_for(&identity, &endpoint, routed) {
                Ok(composite) => composite.handle(request, ctx.request_id()).await,
                Err(err) => {
                    error!(
                        request_id = %ctx.request_id(),
                        route = %identity,
                        error = %err,
                        "Handler cannot be served"
                    );
                    self.inner
                        .responder
                        .respond_to(&err, &request, ctx.request_id())
                }
            }
        })
    }
}

/// Builder for [`SiftMiddleware`].
#[derive(Debug, Default)]
pub struct SiftMiddlewareBuilder {
    codecs: Option<CodecRegistry>,
    orders: Option<SourceOrders>,
    body: BodyOptions,
}

impl SiftMiddlewareBuilder {
    /// Sets the codec registry. Defaults to JSON only.
    #[must_use]
    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = Some(codecs);
        self
    }

    /// Sets the per-method source orders.
    #[must_use]
    pub fn orders(mut self, orders: SourceOrders) -> Self {
        self.orders = Some(orders);
        self
    }

    /// Sets the body loading options.
    #[must_use]
    pub fn body_options(mut self, body: BodyOptions) -> Self {
        self.body = body;
        self
    }

    /// Builds the middleware.
    pub fn build(self) -> SiftMiddleware {
        let codecs = Arc::new(self.codecs.unwrap_or_else(CodecRegistry::with_defaults));
        SiftMiddleware {
            inner: Arc::new(Inner {
                loaders: Arc::new(Loaders::new(Arc::clone(&codecs), self.body)),
                orders: self.orders.unwrap_or_default(),
                responder: ErrorResponder::new(codecs),
                cache: HandlerCache::new(),
            }),
        }
    }
}
