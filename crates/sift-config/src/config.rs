//! The root [`SiftConfig`] type.

use http::Method;
use serde::{Deserialize, Serialize};
use sift_core::codec::APPLICATION_JSON;
use sift_extract::{BodyOptions, DataSource, EmptyBodyPolicy, SourceOrders, DEFAULT_MAX_BODY_SIZE};
use std::collections::BTreeMap;

use crate::{ConfigError, LogFormat, LoggingConfig, MetricsConfig};

/// Methods that may carry a source order override.
const KNOWN_METHODS: &[Method] = &[
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Complete Sift configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// ```
/// use sift_config::SiftConfig;
///
/// let config = SiftConfig::default();
/// assert_eq!(config.default_content_type, "application/json");
/// assert_eq!(config.max_body_bytes, 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SiftConfig {
    /// Content type used for bodies without one, and for error responses
    /// when negotiation has nothing better.
    #[serde(default = "default_content_type")]
    pub default_content_type: String,

    /// Largest accepted request body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Treatment of empty request bodies.
    #[serde(default)]
    pub empty_body: EmptyBodyPolicy,

    /// Per-method source order overrides, keyed by method name.
    #[serde(default)]
    pub sources: BTreeMap<String, Vec<DataSource>>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for SiftConfig {
    fn default() -> Self {
        Self {
            default_content_type: default_content_type(),
            max_body_bytes: default_max_body_bytes(),
            empty_body: EmptyBodyPolicy::default(),
            sources: BTreeMap::new(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl SiftConfig {
    /// Development preset: pretty debug logs.
    #[must_use]
    pub fn development() -> Self {
        Self {
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: LogFormat::Pretty,
                include_location: true,
                ..LoggingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Production preset: JSON info logs and the Prometheus exporter.
    #[must_use]
    pub fn production() -> Self {
        Self {
            metrics: MetricsConfig {
                enabled: true,
                ..MetricsConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `default_content_type` is not a `type/subtype` string
    /// - `max_body_bytes` is zero
    /// - a `sources` key is not an HTTP method, or lists a source twice
    /// - the metrics address is invalid while metrics are enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_media_type(&self.default_content_type) {
            return Err(ConfigError::invalid(
                "default_content_type",
                format!("not a media type: {}", self.default_content_type),
            ));
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::invalid(
                "max_body_bytes",
                "must be greater than zero",
            ));
        }

        self.source_orders()?;

        if self.metrics.enabled
            && self
                .metrics
                .addr
                .parse::<std::net::SocketAddr>()
                .is_err()
        {
            return Err(ConfigError::invalid(
                "metrics.addr",
                format!("invalid socket address: {}", self.metrics.addr),
            ));
        }

        Ok(())
    }

    /// Builds the source order table: defaults plus the `sources` overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an unknown method name or a
    /// duplicated source.
    pub fn source_orders(&self) -> Result<SourceOrders, ConfigError> {
        let mut orders = SourceOrders::default();
        for (name, order) in &self.sources {
            let field = format!("sources.{name}");
            let method = parse_method(name)
                .ok_or_else(|| ConfigError::invalid(&field, "unknown HTTP method"))?;
            orders
                .set(method, order.clone())
                .map_err(|e| ConfigError::invalid(&field, e.to_string()))?;
        }
        Ok(orders)
    }

    /// Returns the body loader options.
    pub fn body_options(&self) -> BodyOptions {
        BodyOptions {
            max_bytes: self.max_body_bytes,
            empty_body: self.empty_body,
        }
    }
}

/// Parses a known HTTP method name, case-insensitively.
pub(crate) fn parse_method(name: &str) -> Option<Method> {
    let method = Method::from_bytes(name.trim().to_ascii_uppercase().as_bytes()).ok()?;
    KNOWN_METHODS.contains(&method).then_some(method)
}

fn is_media_type(s: &str) -> bool {
    match s.split_once('/') {
        Some((ty, subtype)) => {
            let valid = |part: &str| !part.is_empty() && !part.chars().any(char::is_whitespace);
            valid(ty) && valid(subtype) && !subtype.contains('/')
        }
        None => false,
    }
}

fn default_content_type() -> String {
    APPLICATION_JSON.to_string()
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SiftConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.empty_body, EmptyBodyPolicy::EmptyRecord);
        assert_eq!(config.body_options(), BodyOptions::default());
        assert_eq!(config.source_orders().unwrap(), SourceOrders::default());
    }

    #[test]
    fn test_presets() {
        assert_eq!(SiftConfig::development().logging.format, LogFormat::Pretty);
        let production = SiftConfig::production();
        assert!(production.metrics.enabled);
        assert!(production.validate().is_ok());
    }

    #[test]
    fn test_invalid_content_type() {
        for bad in ["json", "application/", "/json", "text/ plain", "a/b/c"] {
            let config = SiftConfig {
                default_content_type: bad.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_zero_body_limit() {
        let config = SiftConfig {
            max_body_bytes: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "max_body_bytes"
        ));
    }

    #[test]
    fn test_source_overrides() {
        let mut config = SiftConfig::default();
        config
            .sources
            .insert("get".to_string(), vec![DataSource::RouteParams, DataSource::QueryParams]);
        config
            .sources
            .insert("OPTIONS".to_string(), vec![DataSource::QueryParams]);

        let orders = config.source_orders().unwrap();
        assert_eq!(
            orders.for_method(&Method::GET),
            &[DataSource::RouteParams, DataSource::QueryParams]
        );
        assert_eq!(orders.for_method(&Method::OPTIONS), &[DataSource::QueryParams]);
        assert_eq!(
            orders.for_method(&Method::POST),
            SourceOrders::default().for_method(&Method::POST)
        );
    }

    #[test]
    fn test_source_overrides_rejected() {
        let mut config = SiftConfig::default();
        config.sources.insert("FETCH".to_string(), vec![DataSource::Body]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "sources.FETCH"
        ));

        let mut config = SiftConfig::default();
        config
            .sources
            .insert("POST".to_string(), vec![DataSource::Body, DataSource::Body]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = SiftConfig::default();
        config.metrics.addr = "nowhere".to_string();
        assert!(config.validate().is_ok());

        config.metrics.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("patch"), Some(Method::PATCH));
        assert_eq!(parse_method(" Get "), Some(Method::GET));
        assert_eq!(parse_method("BREW"), None);
        assert_eq!(parse_method(""), None);
    }
}
