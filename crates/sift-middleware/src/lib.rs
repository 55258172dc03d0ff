//! # Sift Middleware
//!
//! A small async middleware pipeline and the extraction stage that feeds
//! handlers validated input.
//!
//! ## Pipeline
//!
//! ```text
//! Request → RequestId → … → Sift ──→ CompositeHandler → Handler
//!                                  │
//!                                  └─→ ErrorResponder (400/406/413/415/422)
//! ```
//!
//! | Item | Purpose |
//! |------|---------|
//! | [`Middleware`], [`Next`], [`Pipeline`] | Ordered async stages |
//! | [`RequestIdMiddleware`] | Generate or propagate `x-request-id` (UUID v7) |
//! | [`SiftMiddleware`] | Resolve the endpoint, build or reuse its composite |
//! | [`CompositeHandler`] | Load, merge and parse, then call the handler |
//! | [`HandlerCache`] | One composite per method, route pattern and handler |
//! | [`ErrorResponder`] | Negotiate and serialize error bodies |
//!
//! ## Handlers
//!
//! The router stores the matched [`Endpoint`] and
//! [`MatchedRoute`](sift_core::MatchedRoute) in the request extensions.
//! Handlers come from the constructors in [`handler`]:
//!
//! ```
//! use serde::Deserialize;
//! use sift_middleware::{handler, Endpoint, Response, ResponseExt};
//! use validator::Validate;
//!
//! #[derive(Deserialize, Validate)]
//! struct Person {
//!     #[validate(length(min = 1))]
//!     given_name: String,
//!     age: u32,
//! }
//!
//! let endpoint = Endpoint::new(handler::model(|_request, person: Person| async move {
//!     Response::text(http::StatusCode::OK, &format!("{} is {}", person.given_name, person.age))
//! }));
//! # let _ = endpoint;
//! ```

#![doc(html_root_url = "https://docs.rs/sift-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cache;
mod composite;
pub mod context;
pub mod handler;
pub mod middleware;
pub mod pipeline;
mod request_id;
mod responder;
mod sift;
pub mod types;

pub use cache::HandlerCache;
pub use composite::CompositeHandler;
pub use context::{MiddlewareContext, RequestId};
pub use handler::{Endpoint, Handler, HandlerInput};
pub use middleware::{BoxFuture, FnMiddleware, Middleware, Next};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder};
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER};
pub use responder::ErrorResponder;
pub use sift::{SiftMiddleware, SiftMiddlewareBuilder};
pub use types::{Request, Response, ResponseExt};
