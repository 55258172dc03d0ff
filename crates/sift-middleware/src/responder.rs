//! Error responses.
//!
//! Every [`SiftError`] that escapes extraction is turned into a response here.
//! The body is written with a codec picked by content negotiation:
//!
//! - validation failures (422) honour the `Accept` header strictly, so a
//!   client accepting nothing registered gets a 406 instead;
//! - other client errors use the negotiated codec when there is one and the
//!   registry default otherwise;
//! - server-side errors are logged in full and answered with a generic
//!   envelope.

use crate::context::RequestId;
use crate::types::{internal_error, Request, Response, ResponseExt};
use http::{header, HeaderMap, StatusCode};
use sift_core::{CodecRegistry, FormatSupport, SiftError};
use sift_extract::negotiate;
use sift_telemetry::metrics;
use std::sync::Arc;
use tracing::{error, info};

/// Builds client and server error responses.
#[derive(Debug, Clone)]
pub struct ErrorResponder {
    codecs: Arc<CodecRegistry>,
}

impl ErrorResponder {
    /// Creates a responder writing bodies with `codecs`.
    pub fn new(codecs: Arc<CodecRegistry>) -> Self {
        Self { codecs }
    }

    /// Returns the codec registry.
    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    /// Answers `request` with `err`.
    pub fn respond_to(&self, err: &SiftError, request: &Request, request_id: RequestId) -> Response {
        self.respond(err, request.headers(), request_id)
    }

    /// Builds the response for `err`, negotiating with the request `headers`.
    pub fn respond(&self, err: &SiftError, headers: &HeaderMap, request_id: RequestId) -> Response {
        let accept = header_str(headers, header::ACCEPT);
        let content_type = header_str(headers, header::CONTENT_TYPE).map(sift_core::codec::essence);

        let (err, format) = match err {
            SiftError::Validation { .. } => {
                match negotiate(accept, content_type.as_deref(), &self.codecs) {
                    Ok(format) => (err.clone(), Some(format)),
                    Err(refused) => (refused, self.codecs.default_format()),
                }
            }
            _ => {
                let format = negotiate(accept, content_type.as_deref(), &self.codecs)
                    .ok()
                    .or_else(|| self.codecs.default_format());
                (err.clone(), format)
            }
        };

        let status = err.status_code();
        let code = err.error_code();
        if status.is_server_error() {
            error!(
                request_id = %request_id,
                status = status.as_u16(),
                error_code = code,
                error = %err,
                "Request failed"
            );
        } else {
            info!(
                request_id = %request_id,
                status = status.as_u16(),
                error_code = code,
                error = %err,
                "Request rejected"
            );
        }
        metrics::record_rejection(status.as_u16(), code);

        self.render(status, &err, format)
    }

    fn render(&self, status: StatusCode, err: &SiftError, format: Option<&FormatSupport>) -> Response {
        let body = err.to_body();

        let candidates = format.into_iter().chain(self.codecs.default_format());
        for format in candidates {
            match format.serialize(&body) {
                Ok(text) => return Response::with_body(status, format.mime_type(), text),
                Err(e) => {
                    error!(
                        content_type = format.mime_type(),
                        error = %e,
                        "Failed to serialize error body"
                    );
                }
            }
        }

        if status.is_server_error() {
            return internal_error();
        }
        Response::text(status, &err.to_string())
    }
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use sift_core::codec::{APPLICATION_FORM, APPLICATION_JSON};
    use sift_core::{DecodeErrorKind, FieldError, ValidationReport};

    fn responder() -> ErrorResponder {
        let codecs = CodecRegistry::with_defaults().with_format(FormatSupport::form_urlencoded());
        ErrorResponder::new(Arc::new(codecs))
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, http::HeaderValue::from_static(value));
        }
        map
    }

    fn validation() -> SiftError {
        SiftError::validation(ValidationReport::fields(vec![FieldError::at(
            "name",
            "field required",
            "missing",
        )]))
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn content_type(response: &Response) -> &str {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_is_422_json() {
        let response = responder().respond(&validation(), &HeaderMap::new(), RequestId::new());
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(content_type(&response), APPLICATION_JSON);
        assert_eq!(
            body_json(response).await,
            json!([{"loc": ["name"], "msg": "field required", "type": "missing"}])
        );
    }

    #[tokio::test]
    async fn test_validation_error_not_acceptable() {
        let response = responder().respond(
            &validation(),
            &headers(&[("accept", "text/html")]),
            RequestId::new(),
        );
        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(content_type(&response), APPLICATION_JSON);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "NOT_ACCEPTABLE");
        assert_eq!(body["error"]["supported"], json!([APPLICATION_JSON, APPLICATION_FORM]));
    }

    #[tokio::test]
    async fn test_wildcard_accept_uses_request_content_type() {
        let err = SiftError::validation(ValidationReport::message("list value passed, expecting dict"));
        let response = responder().respond(
            &err,
            &headers(&[("accept", "*/*"), ("content-type", "application/x-www-form-urlencoded")]),
            RequestId::new(),
        );
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(content_type(&response), APPLICATION_FORM);
    }

    #[tokio::test]
    async fn test_zero_quality_type_is_not_used_for_wildcard() {
        let err = SiftError::validation(ValidationReport::message("list value passed, expecting dict"));
        let response = responder().respond(
            &err,
            &headers(&[("accept", "application/json;q=0, */*"), ("content-type", "application/json")]),
            RequestId::new(),
        );
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(content_type(&response), APPLICATION_FORM);
    }

    #[tokio::test]
    async fn test_unserializable_report_falls_back_to_default_codec() {
        let response = responder().respond(
            &validation(),
            &headers(&[("accept", "application/x-www-form-urlencoded")]),
            RequestId::new(),
        );
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(content_type(&response), APPLICATION_JSON);
    }

    #[tokio::test]
    async fn test_client_errors_never_become_406() {
        let err = SiftError::decode(APPLICATION_JSON, DecodeErrorKind::Syntax, "expected value");
        let response = responder().respond(
            &err,
            &headers(&[("accept", "text/html")]),
            RequestId::new(),
        );
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(content_type(&response), APPLICATION_JSON);
        assert_eq!(body_json(response).await["error"]["code"], "DECODE_ERROR");

        let response = responder().respond(
            &SiftError::unsupported_content_type(Some("text/xml")),
            &HeaderMap::new(),
            RequestId::new(),
        );
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_server_errors_hide_message() {
        let err = SiftError::configuration("handler declares 2 data parameters");
        let response = responder().respond(&err, &HeaderMap::new(), RequestId::new());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_no_codec_at_all_falls_back_to_text() {
        let responder = ErrorResponder::new(Arc::new(CodecRegistry::new("text/plain")));
        let response = responder.respond(&validation(), &HeaderMap::new(), RequestId::new());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
