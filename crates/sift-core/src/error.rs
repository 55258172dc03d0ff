//! Error types for Sift.
//!
//! [`SiftError`] is the single error type that flows out of loaders, parsers
//! and negotiation. Every variant maps to exactly one HTTP status:
//!
//! | Variant | Status | Code |
//! |---|---|---|
//! | `UnsupportedContentType` | 415 | `UNSUPPORTED_CONTENT_TYPE` |
//! | `Decode` | 400 | `DECODE_ERROR` |
//! | `PayloadTooLarge` | 413 | `PAYLOAD_TOO_LARGE` |
//! | `Validation` | 422 | `VALIDATION_FAILED` |
//! | `NotAcceptable` | 406 | `NOT_ACCEPTABLE` |
//! | `Configuration` | 500 | `CONFIGURATION_ERROR` |
//! | `Internal` | 500 | `INTERNAL_ERROR` |
//!
//! Client errors (4xx) are rendered back to the caller; the two server-side
//! variants are logged and answered with a generic envelope.

use crate::codec::DecodeErrorKind;
use crate::report::ValidationReport;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Result type alias using [`SiftError`].
pub type SiftResult<T> = Result<T, SiftError>;

/// Standard error type for Sift.
///
/// # Example
///
/// ```
/// use sift_core::SiftError;
/// use http::StatusCode;
///
/// let err = SiftError::unsupported_content_type(Some("text/xml"));
/// assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
/// assert_eq!(err.error_code(), "UNSUPPORTED_CONTENT_TYPE");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SiftError {
    /// The body's content type is missing (with no default) or has no codec.
    #[error("Unsupported content type: {}", .content_type.as_deref().unwrap_or("<none>"))]
    UnsupportedContentType {
        /// The declared content type, if any.
        content_type: Option<String>,
    },

    /// The body could not be decoded by its codec.
    #[error("Malformed {content_type} body: {message}")]
    Decode {
        /// Content type whose codec rejected the body.
        content_type: String,
        /// Codec-specific failure category.
        kind: DecodeErrorKind,
        /// Human-readable detail from the codec.
        message: String,
    },

    /// The body exceeds the configured size limit.
    #[error("Payload too large: {actual} bytes exceeds limit of {limit}")]
    PayloadTooLarge {
        /// Configured limit in bytes.
        limit: usize,
        /// Actual body size in bytes.
        actual: usize,
    },

    /// The merged payload did not satisfy the handler's declared type.
    #[error("Validation failed: {report}")]
    Validation {
        /// Structured description of what failed.
        report: ValidationReport,
    },

    /// No registered content type satisfies the `Accept` header.
    #[error("Not acceptable: {accept}")]
    NotAcceptable {
        /// The raw `Accept` header value.
        accept: String,
        /// Content types that could have been produced.
        supported: Vec<String>,
    },

    /// A handler or route was mounted in a way the pipeline cannot serve.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// Any other server-side failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl SiftError {
    /// Creates an unsupported content type error.
    pub fn unsupported_content_type(content_type: Option<&str>) -> Self {
        Self::UnsupportedContentType {
            content_type: content_type.map(ToString::to_string),
        }
    }

    /// Creates a decode error.
    pub fn decode(
        content_type: impl Into<String>,
        kind: DecodeErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Decode {
            content_type: content_type.into(),
            kind,
            message: message.into(),
        }
    }

    /// Creates a payload too large error.
    pub const fn payload_too_large(limit: usize, actual: usize) -> Self {
        Self::PayloadTooLarge { limit, actual }
    }

    /// Creates a validation error from a report.
    pub const fn validation(report: ValidationReport) -> Self {
        Self::Validation { report }
    }

    /// Creates a not acceptable error.
    pub fn not_acceptable(accept: impl Into<String>, supported: Vec<String>) -> Self {
        Self::NotAcceptable {
            accept: accept.into(),
            supported,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedContentType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Decode { .. } => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::Configuration { .. } | Self::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a machine-readable error code.
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedContentType { .. } => "UNSUPPORTED_CONTENT_TYPE",
            Self::Decode { .. } => "DECODE_ERROR",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::Validation { .. } => "VALIDATION_FAILED",
            Self::NotAcceptable { .. } => "NOT_ACCEPTABLE",
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Returns `true` if the error is the caller's fault.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Returns the validation report, if this is a validation error.
    pub const fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Validation { report } => Some(report),
            _ => None,
        }
    }

    /// Builds the value written into the response body.
    ///
    /// Validation errors serialize their report verbatim. Everything else is
    /// wrapped in an [`ErrorEnvelope`]; server-side errors never leak their
    /// message.
    pub fn to_body(&self) -> Value {
        match self {
            Self::Validation { report } => report.to_value(),
            Self::NotAcceptable { supported, .. } => {
                let mut body = ErrorEnvelope::from_error(self).to_value();
                body["error"]["supported"] = json!(supported);
                body
            }
            _ => ErrorEnvelope::from_error(self).to_value(),
        }
    }
}

/// Serializable error envelope for non-validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorEnvelope {
    /// Creates an envelope describing `error`.
    pub fn from_error(error: &SiftError) -> Self {
        let message = if error.is_client_error() {
            error.to_string()
        } else {
            "Internal server error".to_string()
        };
        Self {
            error: ErrorDetail {
                code: error.error_code().to_string(),
                message,
            },
        }
    }

    /// Converts the envelope into a JSON value.
    pub fn to_value(&self) -> Value {
        json!({
            "error": {
                "code": self.error.code,
                "message": self.error.message,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (SiftError::unsupported_content_type(None), 415),
            (
                SiftError::decode("application/json", DecodeErrorKind::Syntax, "eof"),
                400,
            ),
            (SiftError::payload_too_large(10, 20), 413),
            (
                SiftError::validation(ValidationReport::message("bad")),
                422,
            ),
            (SiftError::not_acceptable("text/html", vec![]), 406),
            (SiftError::configuration("two params"), 500),
            (SiftError::internal("boom"), 500),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code().as_u16(), status, "{error}");
        }
    }

    #[test]
    fn test_unsupported_content_type_display() {
        let err = SiftError::unsupported_content_type(Some("text/xml"));
        assert_eq!(err.to_string(), "Unsupported content type: text/xml");

        let err = SiftError::unsupported_content_type(None);
        assert_eq!(err.to_string(), "Unsupported content type: <none>");
    }

    #[test]
    fn test_validation_body_is_report() {
        let err = SiftError::validation(ValidationReport::errors(vec!["missing 'name'".into()]));
        assert_eq!(err.to_body(), json!({"errors": ["missing 'name'"]}));
        assert!(err.report().is_some());
    }

    #[test]
    fn test_envelope_body() {
        let err = SiftError::decode("application/json", DecodeErrorKind::Syntax, "eof");
        let body = err.to_body();
        assert_eq!(body["error"]["code"], "DECODE_ERROR");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("application/json"));
    }

    #[test]
    fn test_not_acceptable_lists_supported() {
        let err = SiftError::not_acceptable("text/html", vec!["application/json".into()]);
        let body = err.to_body();
        assert_eq!(body["error"]["code"], "NOT_ACCEPTABLE");
        assert_eq!(body["error"]["supported"], json!(["application/json"]));
    }

    #[test]
    fn test_server_errors_hide_message() {
        let err = SiftError::configuration("handler declares 2 data parameters");
        let body = err.to_body();
        assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
        assert_eq!(body["error"]["message"], "Internal server error");
        assert!(!err.is_client_error());
    }
}
