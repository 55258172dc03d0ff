//! Request payloads.
//!
//! A [`Payload`] is the raw data a single source produced, and after merging,
//! the combined data handed to a parser. It is either one [`Record`] or a list
//! of values (only request bodies may produce lists).

use serde_json::{Map, Value};

/// A key to value mapping. Key order follows insertion order.
pub type Record = Map<String, Value>;

/// Data produced by a source, or the merged result of several sources.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A single mapping.
    Record(Record),
    /// A sequence of items; mapping items take part in merges.
    List(Vec<Value>),
}

impl Default for Payload {
    fn default() -> Self {
        Self::Record(Record::new())
    }
}

impl Payload {
    /// Creates an empty record payload.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if this payload is list-shaped.
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Returns the record, if this payload is one.
    pub const fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::List(_) => None,
        }
    }

    /// Returns the list items, if this payload is a list.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            Self::Record(_) => None,
        }
    }

    /// Converts a decoded value into a payload.
    ///
    /// Objects become records and arrays become lists. Any other value is
    /// returned unchanged as the error.
    pub fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Object(record) => Ok(Self::Record(record)),
            Value::Array(items) => Ok(Self::List(items)),
            other => Err(other),
        }
    }

    /// Converts the payload into a plain JSON value.
    pub fn into_value(self) -> Value {
        match self {
            Self::Record(record) => Value::Object(record),
            Self::List(items) => Value::Array(items),
        }
    }

    /// Writes every key of `other` into this payload, replacing existing values.
    ///
    /// For a list, each mapping item is updated; other items are left alone.
    pub fn overlay(&mut self, other: &Record) {
        match self {
            Self::Record(record) => overlay_record(record, other),
            Self::List(items) => {
                for item in items.iter_mut() {
                    if let Value::Object(record) = item {
                        overlay_record(record, other);
                    }
                }
            }
        }
    }

    /// Writes keys of `other` that are not already present.
    ///
    /// For a list, each mapping item is filled independently; other items are
    /// left alone.
    pub fn underlay(&mut self, other: &Record) {
        match self {
            Self::Record(record) => underlay_record(record, other),
            Self::List(items) => {
                for item in items.iter_mut() {
                    if let Value::Object(record) = item {
                        underlay_record(record, other);
                    }
                }
            }
        }
    }
}

/// Collapses ordered key/value pairs into a record.
///
/// A key seen once maps to its string value; a repeated key maps to a list of
/// all its values in the order they appeared.
///
/// ```
/// use sift_core::payload::record_from_pairs;
/// use serde_json::json;
///
/// let record = record_from_pairs(vec![
///     ("id".to_string(), "1".to_string()),
///     ("q".to_string(), "x".to_string()),
///     ("id".to_string(), "2".to_string()),
/// ]);
/// assert_eq!(record["id"], json!(["1", "2"]));
/// assert_eq!(record["q"], json!("x"));
/// ```
pub fn record_from_pairs<I>(pairs: I) -> Record
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut record = Record::new();
    for (key, value) in pairs {
        match record.get_mut(&key) {
            None => {
                record.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    record
}

impl From<Record> for Payload {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

fn overlay_record(target: &mut Record, other: &Record) {
    for (key, value) in other {
        target.insert(key.clone(), value.clone());
    }
}

fn underlay_record(target: &mut Record, other: &Record) {
    for (key, value) in other {
        if !target.contains_key(key) {
            target.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_overlay_record_replaces() {
        let mut payload = Payload::Record(record(json!({"a": 1, "b": 2})));
        payload.overlay(&record(json!({"b": 3, "c": 4})));
        assert_eq!(payload.into_value(), json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_underlay_record_keeps_existing() {
        let mut payload = Payload::Record(record(json!({"a": 1, "b": 2})));
        payload.underlay(&record(json!({"b": 3, "c": 4})));
        assert_eq!(payload.into_value(), json!({"a": 1, "b": 2, "c": 4}));
    }

    #[test]
    fn test_list_skips_non_records() {
        let mut payload = Payload::List(vec![json!({"a": 1}), json!(7), json!("x")]);
        payload.overlay(&record(json!({"a": 2})));
        payload.underlay(&record(json!({"z": 0})));
        assert_eq!(
            payload.into_value(),
            json!([{"a": 2, "z": 0}, 7, "x"])
        );
    }

    #[test]
    fn test_from_value() {
        assert!(Payload::from_value(json!({})).unwrap().as_record().is_some());
        assert!(Payload::from_value(json!([1])).unwrap().is_list());
        assert_eq!(Payload::from_value(json!(3)), Err(json!(3)));
    }

    #[test]
    fn test_default_is_empty_record() {
        assert_eq!(Payload::empty(), Payload::Record(Record::new()));
    }
}
