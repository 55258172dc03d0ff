//! Test error types.

use thiserror::Error;

/// Errors that can occur during testing.
#[derive(Debug, Error)]
pub enum TestError {
    /// Request building failed.
    #[error("Request build error: {0}")]
    RequestBuild(String),

    /// Response body reading failed.
    #[error("Body read error: {0}")]
    BodyRead(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Header name or value is invalid.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A route pattern could not be registered.
    #[error("Invalid route '{pattern}': {reason}")]
    InvalidRoute {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = TestError::InvalidRoute {
            pattern: "/{id".to_string(),
            reason: "unclosed parameter".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid route '/{id': unclosed parameter");

        let err: TestError = serde_json::from_str::<u8>("x").unwrap_err().into();
        assert!(matches!(err, TestError::Json(_)));
    }
}
