//! Typed configuration for Sift.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict parsing (unknown fields are errors)
//! - Layered loading (defaults → file → env)
//!
//! # Configuration File Format
//!
//! ```toml
//! default_content_type = "application/json"
//! max_body_bytes = 1048576
//! empty_body = "empty_record"
//!
//! [sources]
//! GET = ["query", "route"]
//! POST = ["query", "body", "route"]
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = false
//! addr = "0.0.0.0:9090"
//! ```
//!
//! # Environment Variable Overrides
//!
//! With [`ConfigLoader::with_env_prefix`]`("SIFT")`:
//!
//! - `SIFT__DEFAULT_CONTENT_TYPE=application/json`
//! - `SIFT__MAX_BODY_BYTES=65536`
//! - `SIFT__EMPTY_BODY=decode`
//! - `SIFT__SOURCES__GET=route,query`
//! - `SIFT__LOGGING__LEVEL=debug`
//! - `SIFT__LOGGING__FORMAT=pretty`
//! - `SIFT__METRICS__ENABLED=true`
//! - `SIFT__METRICS__ADDR=0.0.0.0:9100`

#![doc(html_root_url = "https://docs.rs/sift-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::SiftConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LogFormat, LoggingConfig, MetricsConfig};
