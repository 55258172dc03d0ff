//! # Sift
//!
//! **Request data extraction and validation for HTTP handlers.**
//!
//! Sift sits in a middleware pipeline in front of your handlers. For every
//! routed request it:
//!
//! 1. gathers data from route params, query params and the body, in an
//!    order chosen per HTTP method;
//! 2. merges it into one payload, later sources winning;
//! 3. validates or coerces the payload into the type the handler declares;
//! 4. calls the handler, or answers with 400, 406, 413, 415 or 422.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sift::prelude::*;
//!
//! #[derive(Deserialize, Validate)]
//! struct NewUser {
//!     #[validate(length(min = 1))]
//!     name: String,
//!     age: u32,
//! }
//!
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_optional_file("sift.toml")?
//!     .with_env_prefix("SIFT")
//!     .load()?;
//! let sift = Sift::new(config).init()?;
//!
//! let pipeline = Pipeline::builder()
//!     .stage(RequestIdMiddleware::new())
//!     .stage(sift)
//!     .build();
//!
//! // The router stores the matched `Endpoint` and `MatchedRoute` in the
//! // request extensions before calling `pipeline.process(..)`.
//! let create = Endpoint::new(handler::model(|_req, user: NewUser| async move {
//!     Response::text(StatusCode::CREATED, &user.name)
//! }));
//! ```
//!
//! ## Crates
//!
//! | Crate | Contents |
//! |-------|----------|
//! | [`core`] | Payloads, codecs, errors, route identity |
//! | [`extract`] | Loaders, merge orders, parsers, negotiation |
//! | [`middleware`] | Pipeline, handlers, composite cache, error responses |
//! | [`config`] | TOML/JSON/env configuration |
//! | [`telemetry`] | Logging and Prometheus metrics |

#![doc(html_root_url = "https://docs.rs/sift/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod setup;

pub use setup::{default_codecs, SetupError, Sift};

// Re-export core types
pub use sift_core as core;

// Re-export extraction types
pub use sift_extract as extract;

// Re-export middleware types
pub use sift_middleware as middleware;

// Re-export configuration types
pub use sift_config as config;

// Re-export telemetry types
pub use sift_telemetry as telemetry;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::Sift;
    pub use sift_config::{ConfigLoader, SiftConfig};
    pub use sift_core::{
        CodecRegistry, FormatSupport, MatchedRoute, Payload, Record, SiftError, SiftResult,
        ValidationReport,
    };
    pub use sift_extract::{DataParam, DataSource, PayloadShape, Signature, SourceOrders};
    pub use sift_middleware::{
        handler, Endpoint, Handler, HandlerInput, Middleware, MiddlewareContext, Pipeline,
        Request, RequestIdMiddleware, Response, ResponseExt, SiftMiddleware,
    };
}
