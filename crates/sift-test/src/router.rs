//! In-memory route table.
//!
//! Patterns are `/`-separated segments; a segment written `{name}` captures
//! one path segment. Routes are tried in registration order.

use crate::error::TestError;
use http::Method;
use sift_core::{MatchedRoute, Params};
use sift_middleware::Endpoint;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    endpoint: Endpoint,
}

/// Routes requests to mounted endpoints.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts `endpoint` for `method` at `pattern`.
    pub fn insert(&mut self, method: Method, pattern: &str, endpoint: Endpoint) -> Result<(), TestError> {
        let segments = parse_pattern(pattern)?;
        self.routes.push(Route {
            method,
            pattern: pattern.to_string(),
            segments,
            endpoint,
        });
        Ok(())
    }

    /// Finds the endpoint serving `method` and `path`.
    ///
    /// Captured segments are percent-decoded.
    pub fn match_route(&self, method: &Method, path: &str) -> Option<(Endpoint, MatchedRoute)> {
        let parts: Vec<&str> = split(path).collect();
        self.routes
            .iter()
            .filter(|route| &route.method == method)
            .find_map(|route| {
                let params = capture(&route.segments, &parts)?;
                Some((
                    route.endpoint.clone(),
                    MatchedRoute::new(route.pattern.clone(), params),
                ))
            })
    }

    /// Returns the number of mounted routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if nothing is mounted.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, TestError> {
    let invalid = |reason: &str| TestError::InvalidRoute {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    if !pattern.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }

    split(pattern)
        .map(|segment| match segment.strip_prefix('{') {
            Some(rest) => match rest.strip_suffix('}') {
                Some(name) if !name.is_empty() => Ok(Segment::Param(name.to_string())),
                Some(_) => Err(invalid("empty parameter name")),
                None => Err(invalid("unclosed parameter")),
            },
            None => Ok(Segment::Static(segment.to_string())),
        })
        .collect()
}

fn capture(segments: &[Segment], parts: &[&str]) -> Option<Params> {
    if segments.len() != parts.len() {
        return None;
    }

    let mut params = Params::new();
    for (segment, part) in segments.iter().zip(parts) {
        match segment {
            Segment::Static(expected) if expected == part => {}
            Segment::Static(_) => return None,
            Segment::Param(name) => {
                let value = urlencoding::decode(part).ok()?;
                params.push(name.as_str(), value.into_owned());
            }
        }
    }
    Some(params)
}
