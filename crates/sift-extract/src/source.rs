//! Data sources and their loaders.
//!
//! | Source | Produces | Fails with |
//! |--------|----------|------------|
//! | [`DataSource::RouteParams`] | record of path segments | never |
//! | [`DataSource::QueryParams`] | record; repeated keys become lists | never |
//! | [`DataSource::Body`] | record or list, via the codec registry | 413, 415, 400 |

use crate::ExtractionContext;
use serde::{Deserialize, Serialize};
use sift_core::payload::record_from_pairs;
use sift_core::{CodecRegistry, Payload, Record, SiftError, SiftResult};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default maximum body size (1 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Where a piece of request data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataSource {
    /// Parameters captured from the matched route pattern.
    #[serde(rename = "route")]
    RouteParams,
    /// Parameters from the URL query string.
    #[serde(rename = "query")]
    QueryParams,
    /// The decoded request body.
    #[serde(rename = "body")]
    Body,
}

impl DataSource {
    /// Returns `true` if this source may produce a list payload.
    pub const fn can_return_list(self) -> bool {
        matches!(self, Self::Body)
    }

    /// Returns the short configuration name of this source.
    pub const fn name(self) -> &'static str {
        match self {
            Self::RouteParams => "route",
            Self::QueryParams => "query",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataSource {
    type Err = SiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "route" | "route_params" | "path" => Ok(Self::RouteParams),
            "query" | "query_params" => Ok(Self::QueryParams),
            "body" => Ok(Self::Body),
            other => Err(SiftError::configuration(format!(
                "unknown data source '{other}'"
            ))),
        }
    }
}

/// How a zero-length body is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyBodyPolicy {
    /// An empty or whitespace-only body loads as an empty record.
    #[default]
    EmptyRecord,
    /// The empty text is handed to the codec like any other body.
    Decode,
}

/// Body loading limits and policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyOptions {
    /// Maximum accepted body size in bytes.
    pub max_bytes: usize,
    /// Treatment of empty bodies.
    pub empty_body: EmptyBodyPolicy,
}

impl Default for BodyOptions {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BODY_SIZE,
            empty_body: EmptyBodyPolicy::default(),
        }
    }
}

/// Loads raw data from any [`DataSource`].
///
/// Shared read-only by every composite handler.
#[derive(Debug, Clone)]
pub struct Loaders {
    codecs: Arc<CodecRegistry>,
    body: BodyOptions,
}

impl Loaders {
    /// Creates loaders backed by `codecs`.
    pub fn new(codecs: Arc<CodecRegistry>, body: BodyOptions) -> Self {
        Self { codecs, body }
    }

    /// Returns the codec registry.
    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    /// Returns the body options.
    pub fn body_options(&self) -> BodyOptions {
        self.body
    }

    /// Loads the payload for `source`.
    pub async fn load(&self, source: DataSource, ctx: &ExtractionContext) -> SiftResult<Payload> {
        tracing::trace!(source = %source, route = ctx.route().pattern(), "Loading data source");
        match source {
            DataSource::RouteParams => Ok(load_route_params(ctx)),
            DataSource::QueryParams => Ok(load_query_params(ctx)),
            DataSource::Body => load_body(ctx, &self.codecs, self.body),
        }
    }
}

impl Default for Loaders {
    fn default() -> Self {
        Self::new(Arc::new(CodecRegistry::with_defaults()), BodyOptions::default())
    }
}

/// Returns the matched path parameters as a record of strings.
pub fn load_route_params(ctx: &ExtractionContext) -> Payload {
    Payload::Record(ctx.route().params().to_record())
}

/// Returns the query parameters as a record.
///
/// A key that appears once maps to its value; a repeated key maps to the list
/// of its values in order. Undecodable pairs are skipped.
pub fn load_query_params(ctx: &ExtractionContext) -> Payload {
    let query = ctx.query_string().unwrap_or("");
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Ignoring malformed query string");
        Vec::new()
    });
    Payload::Record(record_from_pairs(pairs))
}

/// Decodes the body with the codec for its content type.
///
/// The declared content type is used when present, else the registry's
/// default. Bodies must decode to a mapping or a list.
pub fn load_body(
    ctx: &ExtractionContext,
    codecs: &CodecRegistry,
    options: BodyOptions,
) -> SiftResult<Payload> {
    let body = ctx.body();
    if body.len() > options.max_bytes {
        return Err(SiftError::payload_too_large(options.max_bytes, body.len()));
    }

    let declared = ctx.content_type();
    let content_type = declared.unwrap_or_else(|| codecs.default_content_type());
    let format = codecs
        .get(content_type)
        .ok_or_else(|| SiftError::unsupported_content_type(declared))?;

    let text = std::str::from_utf8(body).map_err(|e| {
        SiftError::decode(
            format.mime_type(),
            sift_core::DecodeErrorKind::Encoding,
            e.to_string(),
        )
    })?;

    if options.empty_body == EmptyBodyPolicy::EmptyRecord && text.trim().is_empty() {
        return Ok(Payload::Record(Record::new()));
    }

    let value = format
        .deserialize(text)
        .map_err(|e| SiftError::decode(format.mime_type(), e.kind, e.message))?;

    Payload::from_value(value).map_err(|scalar| {
        SiftError::decode(
            format.mime_type(),
            sift_core::DecodeErrorKind::Data,
            format!("expected an object or an array, found {}", value_kind(&scalar)),
        )
    })
}

fn value_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
