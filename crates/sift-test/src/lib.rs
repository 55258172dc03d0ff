//! # Sift Test
//!
//! In-memory testing for Sift handlers: no sockets, the full pipeline.
//!
//! ## Example
//!
//! ```
//! use http::StatusCode;
//! use serde::Deserialize;
//! use sift_middleware::{handler, Response, ResponseExt, SiftMiddleware};
//! use sift_test::TestApp;
//! use validator::Validate;
//!
//! #[derive(Deserialize, Validate)]
//! struct Lookup {
//!     id: u32,
//! }
//!
//! # tokio_test::block_on(async {
//! let app = TestApp::builder(SiftMiddleware::default())
//!     .get("/things/{id}", handler::model(|_req, lookup: Lookup| async move {
//!         Response::text(StatusCode::OK, &lookup.id.to_string())
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let response = app.get("/things/42").send().await;
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.text().unwrap(), "42");
//!
//! let response = app.get("/things/abc").send().await;
//! assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/sift-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
mod error;
mod request;
mod response;
mod router;

pub use app::{TestApp, TestAppBuilder, TestAppRequest};
pub use error::TestError;
pub use request::TestRequestBuilder;
pub use response::TestResponse;
pub use router::Router;
