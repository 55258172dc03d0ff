//! Mounted application handlers.
//!
//! A [`Handler`] describes the data parameter it takes with a [`Signature`]
//! and is invoked with the request plus a [`HandlerInput`]. The router
//! places the handler it matched into the request extensions as an
//! [`Endpoint`], which is where the extraction middleware finds it.
//!
//! Build handlers from async closures:
//!
//! | Constructor | Declares | Closure receives |
//! |-------------|----------|------------------|
//! | [`request`] | nothing | `Request` |
//! | [`untyped`], [`any`] | an untyped / any parameter | `Request, Payload` |
//! | [`shaped`] | a plain value type | `Request, Payload` |
//! | [`model`] | a validation model `T` | `Request, T` |
//! | [`record`] | a plain record `T` | `Request, T` |
//! | [`with_signature`] | anything | `Request, HandlerInput` |

use crate::middleware::BoxFuture;
use crate::types::{Request, Response, ResponseExt};
use http::StatusCode;
use serde::de::DeserializeOwned;
use sift_core::{HandlerId, Payload};
use sift_extract::{BoxedValue, DataParam, Parsed, PayloadShape, Signature};
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use validator::Validate;

/// The data handed to a handler next to the request.
pub enum HandlerInput {
    /// The handler declares no data parameter.
    None,
    /// The merged payload, unchanged or shape-checked.
    Payload(Payload),
    /// A typed value built from the payload.
    Value(BoxedValue),
}

impl From<Parsed> for HandlerInput {
    fn from(parsed: Parsed) -> Self {
        match parsed {
            Parsed::Payload(payload) => Self::Payload(payload),
            Parsed::Value(value) => Self::Value(value),
        }
    }
}

impl fmt::Debug for HandlerInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Payload(payload) => f.debug_tuple("Payload").field(payload).finish(),
            Self::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// An application handler the extraction middleware can serve.
pub trait Handler: Send + Sync + 'static {
    /// Returns the handler's declared data parameters.
    fn signature(&self) -> &Signature;

    /// Invokes the handler.
    fn call(&self, request: Request, input: HandlerInput) -> BoxFuture<'static, Response>;
}

/// A handler mounted on a route, as stored in request extensions.
#[derive(Clone)]
pub struct Endpoint(Arc<dyn Handler>);

impl Endpoint {
    /// Wraps a handler.
    pub fn new<H: Handler>(handler: H) -> Self {
        Self(Arc::new(handler))
    }

    /// Wraps an already shared handler.
    pub fn from_arc(handler: Arc<dyn Handler>) -> Self {
        Self(handler)
    }

    /// Returns the handler.
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.0
    }

    /// Returns the identity of the mounted handler value.
    ///
    /// Clones of one `Endpoint` share an id; two `Endpoint::new` calls on
    /// equal closures do not.
    pub fn id(&self) -> HandlerId {
        HandlerId::of(&self.0)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id())
            .field("signature", self.0.signature())
            .finish()
    }
}

fn input_mismatch(expected: &str, input: &HandlerInput) -> Response {
    tracing::error!(expected, received = ?input, "Handler invoked with unexpected input");
    Response::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// Handler taking only the request.
pub struct RequestHandler<F> {
    func: F,
    signature: Signature,
}

impl<F, Fut> Handler for RequestHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, request: Request, _input: HandlerInput) -> BoxFuture<'static, Response> {
        Box::pin((self.func)(request))
    }
}

/// Handler receiving the merged payload.
pub struct PayloadHandler<F> {
    func: F,
    signature: Signature,
}

impl<F, Fut> Handler for PayloadHandler<F>
where
    F: Fn(Request, Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, request: Request, input: HandlerInput) -> BoxFuture<'static, Response> {
        match input {
            HandlerInput::Payload(payload) => Box::pin((self.func)(request, payload)),
            other => {
                let response = input_mismatch("payload", &other);
                Box::pin(async move { response })
            }
        }
    }
}

/// Handler receiving a typed value.
pub struct ValueHandler<F, T> {
    func: F,
    signature: Signature,
    _marker: PhantomData<fn() -> T>,
}

impl<F, T, Fut> Handler for ValueHandler<F, T>
where
    F: Fn(Request, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
    T: Send + 'static,
{
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, request: Request, input: HandlerInput) -> BoxFuture<'static, Response> {
        let value = match input {
            HandlerInput::Value(value) => value,
            other => {
                let response = input_mismatch(std::any::type_name::<T>(), &other);
                return Box::pin(async move { response });
            }
        };
        match value.downcast::<T>() {
            Ok(value) => Box::pin((self.func)(request, *value)),
            Err(_) => {
                tracing::error!(
                    expected = std::any::type_name::<T>(),
                    "Handler invoked with a value of another type"
                );
                let response =
                    Response::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
                Box::pin(async move { response })
            }
        }
    }
}

/// Handler receiving whatever the middleware produced.
pub struct RawHandler<F> {
    func: F,
    signature: Signature,
}

impl<F, Fut> Handler for RawHandler<F>
where
    F: Fn(Request, HandlerInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn call(&self, request: Request, input: HandlerInput) -> BoxFuture<'static, Response> {
        Box::pin((self.func)(request, input))
    }
}

/// A handler that takes only the request; extraction is skipped entirely.
pub fn request<F, Fut>(func: F) -> RequestHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    RequestHandler {
        func,
        signature: Signature::none(),
    }
}

/// A handler with an unannotated data parameter: receives the payload as is.
pub fn untyped<F, Fut>(func: F) -> PayloadHandler<F>
where
    F: Fn(Request, Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    PayloadHandler {
        func,
        signature: Signature::single(DataParam::Untyped),
    }
}

/// A handler whose data parameter accepts anything: receives the payload as is.
pub fn any<F, Fut>(func: F) -> PayloadHandler<F>
where
    F: Fn(Request, Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    PayloadHandler {
        func,
        signature: Signature::single(DataParam::Any),
    }
}

/// A handler whose data parameter is a plain value of the given shape.
///
/// ```
/// use sift_extract::PayloadShape;
/// use sift_middleware::{handler, Handler, Response, ResponseExt};
///
/// let h = handler::shaped(PayloadShape::Mapping, |_request, payload| async move {
///     Response::json(http::StatusCode::OK, &payload.into_value())
/// });
/// assert!(h.signature().validate().is_ok());
/// ```
pub fn shaped<F, Fut>(shape: PayloadShape, func: F) -> PayloadHandler<F>
where
    F: Fn(Request, Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    PayloadHandler {
        func,
        signature: Signature::single(DataParam::plain(shape)),
    }
}

/// A handler whose data parameter is a validation model.
///
/// Scalars in the payload are coerced to the model's field types, then the
/// model's `Validate` rules run.
pub fn model<T, F, Fut>(func: F) -> ValueHandler<F, T>
where
    T: DeserializeOwned + Validate + Send + 'static,
    F: Fn(Request, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    ValueHandler {
        func,
        signature: Signature::single(DataParam::model::<T>()),
        _marker: PhantomData,
    }
}

/// A handler whose data parameter is a plain record, built without coercion.
pub fn record<T, F, Fut>(func: F) -> ValueHandler<F, T>
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(Request, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    ValueHandler {
        func,
        signature: Signature::single(DataParam::record::<T>()),
        _marker: PhantomData,
    }
}

/// A handler with an explicit signature.
pub fn with_signature<F, Fut>(signature: Signature, func: F) -> RawHandler<F>
where
    F: Fn(Request, HandlerInput) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    RawHandler { func, signature }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::{BodyExt, Full};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Validate)]
    struct Item {
        #[validate(length(min = 1))]
        name: String,
    }

    fn empty_request() -> Request {
        http::Request::builder()
            .uri("/")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_signatures() {
        let h = request(|_req| async { Response::text(StatusCode::OK, "") });
        assert!(h.signature().params().is_empty());

        let h = untyped(|_req, _p| async { Response::text(StatusCode::OK, "") });
        assert!(matches!(h.signature().params(), [DataParam::Untyped]));

        let h = any(|_req, _p| async { Response::text(StatusCode::OK, "") });
        assert!(matches!(h.signature().params(), [DataParam::Any]));

        let h = model(|_req, _item: Item| async { Response::text(StatusCode::OK, "") });
        assert!(matches!(h.signature().params(), [DataParam::Model(_)]));

        let h = record(|_req, _item: Item| async { Response::text(StatusCode::OK, "") });
        assert!(matches!(h.signature().params(), [DataParam::Record(_)]));
    }

    #[tokio::test]
    async fn test_value_handler_receives_typed_value() {
        let h = model(|_req, item: Item| async move { Response::text(StatusCode::OK, &item.name) });
        let input = HandlerInput::Value(Box::new(Item {
            name: "lamp".to_string(),
        }));

        let response = h.call(empty_request(), input).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "lamp");
    }

    #[tokio::test]
    async fn test_value_handler_rejects_wrong_type() {
        let h = model(|_req, item: Item| async move { Response::text(StatusCode::OK, &item.name) });

        let response = h.call(empty_request(), HandlerInput::Value(Box::new(42_u8))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = h.call(empty_request(), HandlerInput::None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_payload_handler() {
        let h = untyped(|_req, payload: Payload| async move {
            Response::json(StatusCode::OK, &payload.into_value())
        });
        let payload = Payload::from_value(json!({"a": 1})).unwrap();

        let response = h.call(empty_request(), HandlerInput::Payload(payload)).await;
        assert_eq!(body_text(response).await, r#"{"a":1}"#);

        let response = h.call(empty_request(), HandlerInput::None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_endpoint_identity() {
        let endpoint = Endpoint::new(request(|_req| async { Response::text(StatusCode::OK, "") }));
        let clone = endpoint.clone();
        assert_eq!(endpoint.id(), clone.id());

        let other = Endpoint::new(request(|_req| async { Response::text(StatusCode::OK, "") }));
        assert_ne!(endpoint.id(), other.id());
    }

    #[test]
    fn test_with_signature_keeps_params() {
        let h = with_signature(
            Signature::new(vec![DataParam::Any, DataParam::Untyped]),
            |_req, _input| async { Response::text(StatusCode::OK, "") },
        );
        assert!(h.signature().validate().is_err());
    }
}
