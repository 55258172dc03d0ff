//! Cache of composite handlers keyed by route identity.

use crate::composite::CompositeHandler;
use dashmap::DashMap;
use sift_core::{RouteIdentity, SiftResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Concurrent cache of built [`CompositeHandler`]s.
///
/// Each [`RouteIdentity`] is built at most once under normal traffic. Two
/// requests racing on a cold identity may both build; the last insert wins
/// and both results are equivalent.
#[derive(Debug, Default)]
pub struct HandlerCache {
    entries: DashMap<RouteIdentity, Arc<CompositeHandler>>,
    builds: AtomicUsize,
}

impl HandlerCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached handler for `identity`, building it with `build` on
    /// a miss.
    ///
    /// A failed build is not cached.
    pub fn get_or_build<F>(&self, identity: &RouteIdentity, build: F) -> SiftResult<Arc<CompositeHandler>>
    where
        F: FnOnce() -> SiftResult<CompositeHandler>,
    {
        if let Some(entry) = self.entries.get(identity) {
            return Ok(Arc::clone(entry.value()));
        }

        // No shard lock is held while building.
        let composite = Arc::new(build()?);
        self.builds.fetch_add(1, Ordering::Relaxed);
        sift_telemetry::metrics::record_handler_build();
        tracing::debug!(route = %identity, parser = composite.parser_name(), "Built composite handler");

        self.entries.insert(identity.clone(), Arc::clone(&composite));
        Ok(composite)
    }

    /// Returns the cached handler for `identity`, if any.
    pub fn get(&self, identity: &RouteIdentity) -> Option<Arc<CompositeHandler>> {
        self.entries.get(identity).map(|entry| Arc::clone(entry.value()))
    }

    /// Returns how many composites have been built.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Returns the number of cached identities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached handler.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{self, Endpoint};
    use crate::responder::ErrorResponder;
    use crate::types::{Response, ResponseExt};
    use http::{Method, StatusCode};
    use sift_core::{CodecRegistry, SiftError};
    use sift_extract::{Loaders, SourceOrders};

    fn endpoint() -> Endpoint {
        Endpoint::new(handler::untyped(|_req, _payload| async {
            Response::text(StatusCode::OK, "")
        }))
    }

    fn build(identity: &RouteIdentity, endpoint: &Endpoint) -> SiftResult<CompositeHandler> {
        let codecs = Arc::new(CodecRegistry::with_defaults());
        CompositeHandler::build(
            identity.clone(),
            Arc::clone(endpoint.handler()),
            &SourceOrders::default(),
            Arc::new(Loaders::new(Arc::clone(&codecs), Default::default())),
            ErrorResponder::new(codecs),
        )
    }

    #[test]
    fn test_builds_once_per_identity() {
        let cache = HandlerCache::new();
        let endpoint = endpoint();
        let identity = RouteIdentity::new(Method::GET, "/items", endpoint.id());

        let first = cache.get_or_build(&identity, || build(&identity, &endpoint)).unwrap();
        let second = cache
            .get_or_build(&identity, || panic!("cached identity rebuilt"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.builds(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_method_pattern_and_handler_are_distinct() {
        let cache = HandlerCache::new();
        let a = endpoint();
        let b = endpoint();

        for identity in [
            RouteIdentity::new(Method::GET, "/items", a.id()),
            RouteIdentity::new(Method::POST, "/items", a.id()),
            RouteIdentity::new(Method::GET, "/things", a.id()),
            RouteIdentity::new(Method::GET, "/items", b.id()),
        ] {
            let endpoint = if identity.handler() == a.id() { &a } else { &b };
            cache.get_or_build(&identity, || build(&identity, endpoint)).unwrap();
        }

        assert_eq!(cache.builds(), 4);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let cache = HandlerCache::new();
        let endpoint = endpoint();
        let identity = RouteIdentity::new(Method::GET, "/items", endpoint.id());

        let err = cache
            .get_or_build(&identity, || Err(SiftError::configuration("bad handler")))
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(cache.is_empty());
        assert_eq!(cache.builds(), 0);

        cache.get_or_build(&identity, || build(&identity, &endpoint)).unwrap();
        assert!(cache.get(&identity).is_some());

        cache.clear();
        assert!(cache.get(&identity).is_none());
    }
}
