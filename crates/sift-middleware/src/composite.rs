//! Composite handlers.
//!
//! A [`CompositeHandler`] wraps one mounted handler for one route identity.
//! It fixes the source order and parser at build time, then for every
//! request loads, merges and parses the data before calling the handler.

use crate::context::RequestId;
use crate::handler::{Handler, HandlerInput};
use crate::responder::ErrorResponder;
use crate::types::{Request, Response};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use sift_core::{RouteIdentity, SiftResult};
use sift_extract::{gather, DataSource, ExtractionContext, Loaders, Parsed, Parser, SourceOrders};
use sift_telemetry::metrics::{self, PayloadOutcome};
use std::fmt;
use std::sync::Arc;

struct DataPlan {
    order: Vec<DataSource>,
    parser: Parser,
}

impl DataPlan {
    fn reads_body(&self) -> bool {
        self.order.contains(&DataSource::Body)
    }
}

/// A handler bound to its route, source order and parser.
pub struct CompositeHandler {
    identity: RouteIdentity,
    handler: Arc<dyn Handler>,
    plan: Option<DataPlan>,
    loaders: Arc<Loaders>,
    responder: ErrorResponder,
}

impl CompositeHandler {
    /// Builds the composite for `handler` mounted at `identity`.
    ///
    /// Fails with a configuration error if the handler declares more than
    /// one data parameter.
    pub fn build(
        identity: RouteIdentity,
        handler: Arc<dyn Handler>,
        orders: &SourceOrders,
        loaders: Arc<Loaders>,
        responder: ErrorResponder,
    ) -> SiftResult<Self> {
        let plan = Parser::for_signature(handler.signature())?.map(|parser| DataPlan {
            order: orders.for_method(identity.method()).to_vec(),
            parser,
        });

        Ok(Self {
            identity,
            handler,
            plan,
            loaders,
            responder,
        })
    }

    /// Returns the route identity this composite serves.
    pub fn identity(&self) -> &RouteIdentity {
        &self.identity
    }

    /// Returns the source order, empty when the handler takes no data.
    pub fn source_order(&self) -> &[DataSource] {
        self.plan.as_ref().map_or(&[], |plan| plan.order.as_slice())
    }

    /// Returns the parser strategy name, or `"none"`.
    pub fn parser_name(&self) -> &'static str {
        self.plan.as_ref().map_or("none", |plan| plan.parser.strategy())
    }

    /// Serves one request.
    ///
    /// Extraction failures are answered by the error responder and the
    /// handler is not called.
    pub async fn handle(&self, request: Request, request_id: RequestId) -> Response {
        let Some(plan) = &self.plan else {
            return self.handler.call(request, HandlerInput::None).await;
        };

        let (parts, body) = request.into_parts();
        let (body, bytes) = if plan.reads_body() {
            let bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };
            (Full::new(bytes.clone()), bytes)
        } else {
            (body, Bytes::new())
        };

        let ctx = ExtractionContext::from_parts(&parts, bytes);
        let request = Request::from_parts(parts, body);

        match self.extract(plan, &ctx).await {
            Ok(parsed) => {
                metrics::record_payload(PayloadOutcome::Parsed);
                self.handler.call(request, parsed.into()).await
            }
            Err(err) => {
                metrics::record_payload(PayloadOutcome::Rejected);
                tracing::debug!(
                    request_id = %request_id,
                    route = %self.identity,
                    parser = plan.parser.strategy(),
                    error = %err,
                    "Extraction failed"
                );
                self.responder.respond_to(&err, &request, request_id)
            }
        }
    }

    async fn extract(&self, plan: &DataPlan, ctx: &ExtractionContext) -> SiftResult<Parsed> {
        let payload = gather(&self.loaders, &plan.order, ctx).await?;
        plan.parser.parse(payload).await
    }
}

impl fmt::Debug for CompositeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeHandler")
            .field("identity", &self.identity)
            .field("source_order", &self.source_order())
            .field("parser", &self.parser_name())
            .finish_non_exhaustive()
    }
}
