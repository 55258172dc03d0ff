//! Validation reports.
//!
//! A [`ValidationReport`] is what a rejected client sees in a 422 body. Its
//! shape depends on which parser rejected the payload:
//!
//! - model parsers produce a list of [`FieldError`]s
//!   (`[{"loc": ["age"], "msg": "...", "type": "..."}]`)
//! - record parsers produce `{"errors": ["..."]}`
//! - plain-type checks produce `{"error": "..."}`

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Path to the offending value, outermost first.
    pub loc: Vec<String>,
    /// Human-readable message.
    pub msg: String,
    /// Machine-readable failure kind (e.g. `missing`, `type_error.integer`).
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    /// Creates a field error.
    pub fn new(loc: Vec<String>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    /// Creates a field error for a top-level field.
    pub fn at(field: impl Into<String>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(vec![field.into()], msg, kind)
    }

    /// Returns the dotted location (`address.zip`).
    pub fn path(&self) -> String {
        self.loc.join(".")
    }
}

/// Structured report attached to a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationReport {
    /// Field-level errors from a validation model.
    Fields(Vec<FieldError>),
    /// Messages from strict record construction.
    Errors {
        /// Construction error messages.
        errors: Vec<String>,
    },
    /// A single shape-mismatch message.
    Message {
        /// The message.
        error: String,
    },
}

impl ValidationReport {
    /// Creates a field-level report.
    pub fn fields(errors: Vec<FieldError>) -> Self {
        Self::Fields(errors)
    }

    /// Creates a report from construction messages.
    pub fn errors(errors: Vec<String>) -> Self {
        Self::Errors { errors }
    }

    /// Creates a single-message report.
    pub fn message(error: impl Into<String>) -> Self {
        Self::Message {
            error: error.into(),
        }
    }

    /// Returns `true` if any field error is located at `field`.
    pub fn mentions(&self, field: &str) -> bool {
        match self {
            Self::Fields(errors) => errors.iter().any(|e| e.loc.iter().any(|l| l == field)),
            Self::Errors { errors } => errors.iter().any(|e| e.contains(field)),
            Self::Message { error } => error.contains(field),
        }
    }

    /// Converts the report into the JSON value written to response bodies.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Fields(errors) => Value::Array(
                errors
                    .iter()
                    .map(|e| json!({"loc": e.loc, "msg": e.msg, "type": e.kind}))
                    .collect(),
            ),
            Self::Errors { errors } => json!({ "errors": errors }),
            Self::Message { error } => json!({ "error": error }),
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fields(errors) => {
                let parts: Vec<_> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.path(), e.msg))
                    .collect();
                write!(f, "{}", parts.join("; "))
            }
            Self::Errors { errors } => write!(f, "{}", errors.join("; ")),
            Self::Message { error } => f.write_str(error),
        }
    }
}
