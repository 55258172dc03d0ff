//! Route parameter storage.

use crate::payload::Record;
use serde_json::Value;
use smallvec::SmallVec;

/// Maximum number of parameters stored inline.
const INLINE_PARAMS: usize = 4;

/// Path parameters captured by the router, in pattern order.
///
/// # Example
///
/// ```rust
/// use sift_core::Params;
///
/// let mut params = Params::new();
/// params.push("age", "30");
///
/// assert_eq!(params.get("age"), Some("30"));
/// assert_eq!(params.get("name"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value for a parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over the parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Converts the parameters into a record of string values.
    ///
    /// A name captured twice keeps its last value.
    pub fn to_record(&self) -> Record {
        self.iter()
            .map(|(n, v)| (n.to_string(), Value::String(v.to_string())))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_params_push_and_get() {
        let mut params = Params::new();
        params.push("id", "123");
        params.push("name", "alice");

        assert_eq!(params.get("id"), Some("123"));
        assert_eq!(params.get("name"), Some("alice"));
        assert_eq!(params.get("unknown"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_params_many() {
        let params: Params = (0..10).map(|i| (format!("k{i}"), format!("v{i}"))).collect();
        assert_eq!(params.len(), 10);
        assert_eq!(params.get("k7"), Some("v7"));
    }

    #[test]
    fn test_to_record_values_are_strings() {
        let params: Params = [("age", "30"), ("slug", "a-b")].into_iter().collect();
        let record = params.to_record();
        assert_eq!(record["age"], json!("30"));
        assert_eq!(record["slug"], json!("a-b"));
    }

    #[test]
    fn test_iter_order() {
        let params: Params = [("b", "2"), ("a", "1")].into_iter().collect();
        let pairs: Vec<_> = (&params).into_iter().collect();
        assert_eq!(pairs, vec![("b", "2"), ("a", "1")]);
    }
}
