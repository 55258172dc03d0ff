//! # Sift Extract
//!
//! Turns an HTTP request into the single value a handler asks for.
//!
//! ## Pipeline
//!
//! | Stage | Item | Description |
//! |-------|------|-------------|
//! | Load | [`Loaders`], [`DataSource`] | Read route params, query params and body |
//! | Merge | [`SourceOrders`], [`merge`] | Combine sources in per-method order |
//! | Parse | [`Parser`], [`DataParam`] | Validate or coerce into the declared type |
//! | Negotiate | [`negotiate`] | Pick the content type for error bodies |
//!
//! ## Example
//!
//! ```rust
//! use sift_extract::{gather, DataParam, ExtractionContextBuilder, Loaders, Parsed, Parser, SourceOrders};
//! use http::{Method, Uri};
//! use serde::Deserialize;
//! use validator::Validate;
//!
//! #[derive(Deserialize, Validate)]
//! struct Profile {
//!     name: String,
//!     age: u32,
//! }
//!
//! # tokio_test::block_on(async {
//! let ctx = ExtractionContextBuilder::new()
//!     .method(Method::POST)
//!     .uri(Uri::from_static("/30/profile?name=ada"))
//!     .pattern("/{age}/profile")
//!     .path_param("age", "30")
//!     .header("content-type", "application/json")
//!     .body("{}")
//!     .build();
//!
//! let orders = SourceOrders::default();
//! let payload = gather(&Loaders::default(), orders.for_method(ctx.method()), &ctx)
//!     .await
//!     .unwrap();
//!
//! let parser = Parser::select(&DataParam::model::<Profile>());
//! let Parsed::Value(value) = parser.parse(payload).await.unwrap() else {
//!     unreachable!()
//! };
//! let profile = value.downcast::<Profile>().unwrap();
//! assert_eq!(profile.age, 30);
//! assert_eq!(profile.name, "ada");
//! # });
//! ```
//!
//! ## Error Handling
//!
//! Every stage returns [`sift_core::SiftError`]; the variant determines the
//! response status (400, 413, 415, 422 or 406).

#![doc(html_root_url = "https://docs.rs/sift-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod negotiate;
mod orchestrator;
mod parser;
mod source;

pub use context::{matched_route, ExtractionContext, ExtractionContextBuilder};
pub use negotiate::{negotiate, AcceptHeader, MediaRange};
pub use orchestrator::{gather, merge, SourceOrders};
pub use parser::{
    field_errors, BoxedValue, DataParam, ParseFn, Parsed, Parser, PayloadShape, Signature,
    TypedBinding,
};
pub use source::{
    load_body, load_query_params, load_route_params, BodyOptions, DataSource, EmptyBodyPolicy,
    Loaders, DEFAULT_MAX_BODY_SIZE,
};
