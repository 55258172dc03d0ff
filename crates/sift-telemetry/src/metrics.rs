//! Prometheus metrics for Sift.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `sift_payloads_total` | Counter | `outcome` | Payloads handed to a parser, by outcome |
//! | `sift_rejections_total` | Counter | `status`, `code` | Requests answered by the middleware itself |
//! | `sift_handler_builds_total` | Counter | - | Composite handlers built |
//!
//! The recording functions are cheap no-ops until a recorder is installed
//! with [`init_metrics`].

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;

/// Payload counter name.
pub const PAYLOADS_TOTAL: &str = "sift_payloads_total";
/// Rejection counter name.
pub const REJECTIONS_TOTAL: &str = "sift_rejections_total";
/// Handler build counter name.
pub const HANDLER_BUILDS_TOTAL: &str = "sift_handler_builds_total";

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether the Prometheus exporter is installed.
    pub enabled: bool,

    /// Address of the exporter's HTTP listener (e.g., "0.0.0.0:9090").
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Outcome of handing a payload to a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadOutcome {
    /// The handler received its value.
    Parsed,
    /// The payload failed validation or coercion.
    Rejected,
}

impl PayloadOutcome {
    /// Returns the label value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Rejected => "rejected",
        }
    }
}

/// Installs the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparseable address and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let handle = PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);

    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        PAYLOADS_TOTAL,
        "Payloads handed to a parser, by outcome"
    );
    describe_counter!(
        REJECTIONS_TOTAL,
        "Requests rejected before reaching the handler, by status and error code"
    );
    describe_counter!(
        HANDLER_BUILDS_TOTAL,
        "Composite handlers built by the handler cache"
    );
}

/// Records a parse outcome.
pub fn record_payload(outcome: PayloadOutcome) {
    counter!(PAYLOADS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

/// Records a request the middleware answered itself.
pub fn record_rejection(status: u16, code: &'static str) {
    counter!(
        REJECTIONS_TOTAL,
        "status" => status.to_string(),
        "code" => code
    )
    .increment(1);
}

/// Records a composite handler build.
pub fn record_handler_build() {
    counter!(HANDLER_BUILDS_TOTAL).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_disabled() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not-an-address".to_string(),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(PayloadOutcome::Parsed.as_str(), "parsed");
        assert_eq!(PayloadOutcome::Rejected.as_str(), "rejected");
    }

    #[test]
    fn test_record_functions_dont_panic() {
        record_payload(PayloadOutcome::Parsed);
        record_rejection(422, "VALIDATION_FAILED");
        record_handler_build();
    }

    #[test]
    fn test_render_without_init() {
        let _ = render_metrics();
    }
}
