//! Per-method source ordering and payload merging.
//!
//! Every HTTP method has an ordered tuple of [`DataSource`]s. Loaders run in
//! that order and their outputs are merged so that later sources win:
//!
//! | Method | Order |
//! |--------|-------|
//! | `GET`, `HEAD`, `DELETE` | query, route |
//! | `POST`, `PUT`, `PATCH` | query, body, route |
//!
//! When the body decodes to a list, the list becomes the payload and every
//! mapping item in it is merged with the other sources. Sources ordered after
//! the body override item fields; sources ordered before it only fill keys an
//! item does not have.

use crate::source::{DataSource, Loaders};
use crate::ExtractionContext;
use http::Method;
use sift_core::{Payload, SiftError, SiftResult};
use std::collections::HashMap;

const READ_ORDER: &[DataSource] = &[DataSource::QueryParams, DataSource::RouteParams];
const WRITE_ORDER: &[DataSource] = &[
    DataSource::QueryParams,
    DataSource::Body,
    DataSource::RouteParams,
];

/// Source orders keyed by HTTP method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOrders {
    orders: HashMap<Method, Vec<DataSource>>,
}

impl Default for SourceOrders {
    fn default() -> Self {
        let mut orders = HashMap::new();
        for method in [Method::GET, Method::DELETE] {
            orders.insert(method, READ_ORDER.to_vec());
        }
        for method in [Method::POST, Method::PUT, Method::PATCH] {
            orders.insert(method, WRITE_ORDER.to_vec());
        }
        Self { orders }
    }
}

impl SourceOrders {
    /// Creates the standard orders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with no orders at all.
    pub fn empty() -> Self {
        Self {
            orders: HashMap::new(),
        }
    }

    /// Replaces the order for `method`.
    ///
    /// A source may appear at most once.
    pub fn set(&mut self, method: Method, order: Vec<DataSource>) -> SiftResult<()> {
        validate_order(&method, &order)?;
        self.orders.insert(method, order);
        Ok(())
    }

    /// Replaces the order for `method`, builder style.
    pub fn with(mut self, method: Method, order: Vec<DataSource>) -> SiftResult<Self> {
        self.set(method, order)?;
        Ok(self)
    }

    /// Returns the order for `method`.
    ///
    /// `HEAD` falls back to the `GET` order. Methods with no order run no
    /// loaders.
    pub fn for_method(&self, method: &Method) -> &[DataSource] {
        if let Some(order) = self.orders.get(method) {
            return order;
        }
        if method == Method::HEAD {
            if let Some(order) = self.orders.get(&Method::GET) {
                return order;
            }
        }
        &[]
    }
}

fn validate_order(method: &Method, order: &[DataSource]) -> SiftResult<()> {
    for (i, source) in order.iter().enumerate() {
        if order[..i].contains(source) {
            return Err(SiftError::configuration(format!(
                "data source '{source}' listed twice for {method}"
            )));
        }
    }
    Ok(())
}

/// Runs every loader in `order` and merges their outputs.
pub async fn gather(
    loaders: &Loaders,
    order: &[DataSource],
    ctx: &ExtractionContext,
) -> SiftResult<Payload> {
    let mut outputs = Vec::with_capacity(order.len());
    for &source in order {
        outputs.push((source, loaders.load(source, ctx).await?));
    }
    Ok(merge(outputs))
}

/// Merges loader outputs given in source order.
///
/// Without a list output, records are merged left to right with later keys
/// replacing earlier ones. With a list output, see the module docs. Among the
/// sources before the list, later sources still take precedence over earlier
/// ones.
pub fn merge(outputs: Vec<(DataSource, Payload)>) -> Payload {
    let list_at = outputs
        .iter()
        .position(|(source, payload)| source.can_return_list() && payload.is_list());

    let Some(list_at) = list_at else {
        let mut merged = Payload::empty();
        for (_, payload) in &outputs {
            if let Some(record) = payload.as_record() {
                merged.overlay(record);
            }
        }
        return merged;
    };

    let mut before = outputs;
    let after = before.split_off(list_at + 1);
    let mut merged = match before.pop() {
        Some((_, list)) => list,
        None => Payload::List(Vec::new()),
    };

    for record in before.iter().rev().filter_map(|(_, p)| p.as_record()) {
        merged.underlay(record);
    }
    for record in after.iter().filter_map(|(_, p)| p.as_record()) {
        merged.overlay(record);
    }
    merged
}
