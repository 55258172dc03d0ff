//! Matched routes and route identity.
//!
//! Routing is not part of Sift. A router runs first and stores a
//! [`MatchedRoute`] in the request extensions; Sift reads it back to load
//! path parameters and to key its handler cache.

use crate::params::Params;
use http::Method;
use std::fmt;
use std::sync::Arc;

/// The route a request matched, as reported by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedRoute {
    pattern: String,
    params: Params,
}

impl MatchedRoute {
    /// Creates a matched route.
    pub fn new(pattern: impl Into<String>, params: Params) -> Self {
        Self {
            pattern: pattern.into(),
            params,
        }
    }

    /// Creates a match for a literal path with no parameters.
    pub fn literal(path: impl Into<String>) -> Self {
        Self::new(path, Params::new())
    }

    /// Returns the canonical resource pattern (e.g. `/{age}/profile`).
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the captured path parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// Identity of a mounted handler value.
///
/// Two `HandlerId`s are equal when they were taken from clones of the same
/// `Arc`. The id is only meaningful while that `Arc` is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);

impl HandlerId {
    /// Returns the identity of the value behind `handler`.
    pub fn of<T: ?Sized>(handler: &Arc<T>) -> Self {
        Self(Arc::as_ptr(handler).cast::<()>() as usize)
    }
}

/// Cache key for one handler mounted at one resource for one method.
///
/// The same handler mounted at two patterns, or under two methods, yields two
/// distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteIdentity {
    method: Method,
    pattern: String,
    handler: HandlerId,
}

impl RouteIdentity {
    /// Creates a route identity.
    pub fn new(method: Method, pattern: impl Into<String>, handler: HandlerId) -> Self {
        Self {
            method,
            pattern: pattern.into(),
            handler,
        }
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the resource pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the handler identity.
    pub fn handler(&self) -> HandlerId {
        self.handler
    }
}

impl fmt::Display for RouteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.pattern)
    }
}
