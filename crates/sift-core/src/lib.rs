//! # Sift Core
//!
//! Core types shared by every Sift crate.
//!
//! - [`SiftError`] - Error taxonomy with HTTP status mapping
//! - [`ValidationReport`] / [`FieldError`] - 422 response bodies
//! - [`Payload`] / [`Record`] - Raw and merged request data
//! - [`CodecRegistry`] / [`FormatSupport`] - Content-type codecs
//! - [`MatchedRoute`] / [`RouteIdentity`] - What the router matched, and the
//!   key Sift caches composite handlers under
//! - [`coerce`] - Lenient deserialization of string-typed request data

#![doc(html_root_url = "https://docs.rs/sift-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod coerce;
mod error;
mod params;
pub mod payload;
mod report;
mod route;

pub use codec::{CodecError, CodecRegistry, DecodeErrorKind, FormatSupport};
pub use error::{ErrorDetail, ErrorEnvelope, SiftError, SiftResult};
pub use params::Params;
pub use payload::{Payload, Record};
pub use report::{FieldError, ValidationReport};
pub use route::{HandlerId, MatchedRoute, RouteIdentity};
