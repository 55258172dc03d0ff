//! Content-type codecs.
//!
//! A [`FormatSupport`] couples a MIME type with the functions that turn text
//! into a [`Value`] and back. The [`CodecRegistry`] holds every supported
//! format in registration order, which is also the order used when the
//! client's `Accept` header is a wildcard.
//!
//! # Example
//!
//! ```
//! use sift_core::codec::{CodecRegistry, FormatSupport};
//!
//! let registry = CodecRegistry::with_defaults()
//!     .with_format(FormatSupport::form_urlencoded());
//!
//! assert!(registry.get("application/json; charset=utf-8").is_some());
//! assert!(registry.get("text/xml").is_none());
//! assert_eq!(registry.default_content_type(), "application/json");
//! ```

use crate::payload::record_from_pairs;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// The JSON MIME type.
pub const APPLICATION_JSON: &str = "application/json";

/// The URL-encoded form MIME type.
pub const APPLICATION_FORM: &str = "application/x-www-form-urlencoded";

/// Category of a codec failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeErrorKind {
    /// The text is not well-formed for the format.
    Syntax,
    /// The text ended before a complete value was read.
    Eof,
    /// The text is well-formed but the value cannot be represented.
    Data,
    /// The body is not valid UTF-8.
    Encoding,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Syntax => "syntax",
            Self::Eof => "eof",
            Self::Data => "data",
            Self::Encoding => "encoding",
        };
        f.write_str(s)
    }
}

/// Error returned by a codec function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct CodecError {
    /// Failure category.
    pub kind: DecodeErrorKind,
    /// Codec-provided detail.
    pub message: String,
}

impl CodecError {
    /// Creates a codec error.
    pub fn new(kind: DecodeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;
        let kind = match err.classify() {
            Category::Eof => DecodeErrorKind::Eof,
            Category::Data => DecodeErrorKind::Data,
            Category::Syntax | Category::Io => DecodeErrorKind::Syntax,
        };
        Self::new(kind, err.to_string())
    }
}

/// Serializes a value to text.
pub type SerializeFn = fn(&Value) -> Result<String, CodecError>;

/// Deserializes text to a value.
pub type DeserializeFn = fn(&str) -> Result<Value, CodecError>;

/// A registered content type.
#[derive(Debug, Clone)]
pub struct FormatSupport {
    mime_type: String,
    serialize: SerializeFn,
    deserialize: DeserializeFn,
}

impl FormatSupport {
    /// Creates a format from its MIME type and codec functions.
    pub fn new(mime_type: impl AsRef<str>, serialize: SerializeFn, deserialize: DeserializeFn) -> Self {
        Self {
            mime_type: essence(mime_type.as_ref()),
            serialize,
            deserialize,
        }
    }

    /// `application/json` backed by `serde_json`.
    pub fn json() -> Self {
        Self::new(APPLICATION_JSON, json_serialize, json_deserialize)
    }

    /// `application/x-www-form-urlencoded` backed by `serde_urlencoded`.
    ///
    /// Repeated keys decode to lists. Only flat records can be encoded.
    pub fn form_urlencoded() -> Self {
        Self::new(APPLICATION_FORM, form_serialize, form_deserialize)
    }

    /// Returns the MIME type this format handles.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Serializes `value`.
    pub fn serialize(&self, value: &Value) -> Result<String, CodecError> {
        (self.serialize)(value)
    }

    /// Deserializes `text`.
    pub fn deserialize(&self, text: &str) -> Result<Value, CodecError> {
        (self.deserialize)(text)
    }
}

fn json_serialize(value: &Value) -> Result<String, CodecError> {
    Ok(serde_json::to_string(value)?)
}

fn json_deserialize(text: &str) -> Result<Value, CodecError> {
    Ok(serde_json::from_str(text)?)
}

fn form_serialize(value: &Value) -> Result<String, CodecError> {
    let Value::Object(record) = value else {
        return Err(CodecError::new(
            DecodeErrorKind::Data,
            "only records can be form-encoded",
        ));
    };

    let mut pairs = Vec::with_capacity(record.len());
    for (key, value) in record {
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.as_str(), scalar_text(item)));
                }
            }
            other => pairs.push((key.as_str(), scalar_text(other))),
        }
    }

    serde_urlencoded::to_string(pairs).map_err(|e| CodecError::new(DecodeErrorKind::Data, e.to_string()))
}

fn form_deserialize(text: &str) -> Result<Value, CodecError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(text)
        .map_err(|e| CodecError::new(DecodeErrorKind::Syntax, e.to_string()))?;
    Ok(Value::Object(record_from_pairs(pairs)))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Returns the normalized MIME essence: text before any `;`, trimmed and
/// lowercased.
///
/// ```
/// use sift_core::codec::essence;
///
/// assert_eq!(essence(" Application/JSON ; charset=utf-8"), "application/json");
/// ```
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Registry of supported content types.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    formats: IndexMap<String, FormatSupport>,
    default_content_type: String,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CodecRegistry {
    /// Creates an empty registry whose default content type is `default_content_type`.
    pub fn new(default_content_type: impl AsRef<str>) -> Self {
        Self {
            formats: IndexMap::new(),
            default_content_type: essence(default_content_type.as_ref()),
        }
    }

    /// Creates a registry with `application/json` registered as the default.
    pub fn with_defaults() -> Self {
        Self::new(APPLICATION_JSON).with_format(FormatSupport::json())
    }

    /// Adds a format, builder style.
    pub fn with_format(mut self, format: FormatSupport) -> Self {
        self.register(format);
        self
    }

    /// Registers a format, returning any format it replaced.
    pub fn register(&mut self, format: FormatSupport) -> Option<FormatSupport> {
        self.formats.insert(format.mime_type.clone(), format)
    }

    /// Sets the content type used when a request declares none.
    pub fn set_default_content_type(&mut self, content_type: impl AsRef<str>) {
        self.default_content_type = essence(content_type.as_ref());
    }

    /// Returns the default content type.
    pub fn default_content_type(&self) -> &str {
        &self.default_content_type
    }

    /// Looks up a format by content type, ignoring parameters.
    pub fn get(&self, content_type: &str) -> Option<&FormatSupport> {
        self.formats.get(&essence(content_type))
    }

    /// Returns `true` if a format is registered for `content_type`.
    pub fn contains(&self, content_type: &str) -> bool {
        self.get(content_type).is_some()
    }

    /// Returns the format registered for the default content type.
    pub fn default_format(&self) -> Option<&FormatSupport> {
        self.formats.get(&self.default_content_type)
    }

    /// Returns registered MIME types in registration order.
    pub fn mime_types(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    /// Returns registered formats in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &FormatSupport> {
        self.formats.values()
    }

    /// Returns the number of registered formats.
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Returns `true` if no formats are registered.
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_ignores_parameters_and_case() {
        let registry = CodecRegistry::with_defaults();
        assert!(registry.get("application/json").is_some());
        assert!(registry.get("APPLICATION/JSON;charset=utf-8").is_some());
        assert!(registry.get("application/jsonx").is_none());
        assert!(registry.get("").is_none());
    }

    #[test]
    fn test_json_error_kinds() {
        let json = FormatSupport::json();
        assert_eq!(json.deserialize("{").unwrap_err().kind, DecodeErrorKind::Eof);
        assert_eq!(
            json.deserialize("{x}").unwrap_err().kind,
            DecodeErrorKind::Syntax
        );
        assert_eq!(json.deserialize("[1, 2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_form_repeated_keys() {
        let form = FormatSupport::form_urlencoded();
        let value = form.deserialize("id=1&id=2&name=a+b").unwrap();
        assert_eq!(value, json!({"id": ["1", "2"], "name": "a b"}));
    }

    #[test]
    fn test_form_serialize_flat_record() {
        let form = FormatSupport::form_urlencoded();
        let text = form
            .serialize(&json!({"error": "bad", "ids": [1, 2]}))
            .unwrap();
        assert_eq!(text, "error=bad&ids=1&ids=2");
        assert!(form.serialize(&json!([1])).is_err());
    }

    #[test]
    fn test_registration_order() {
        let registry = CodecRegistry::with_defaults().with_format(FormatSupport::form_urlencoded());
        let types: Vec<_> = registry.mime_types().collect();
        assert_eq!(types, vec![APPLICATION_JSON, APPLICATION_FORM]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_default_format() {
        let mut registry = CodecRegistry::with_defaults().with_format(FormatSupport::form_urlencoded());
        assert_eq!(registry.default_format().unwrap().mime_type(), APPLICATION_JSON);

        registry.set_default_content_type(APPLICATION_FORM);
        assert_eq!(registry.default_format().unwrap().mime_type(), APPLICATION_FORM);

        let empty = CodecRegistry::new("text/plain");
        assert!(empty.default_format().is_none());
        assert!(empty.is_empty());
    }
}
