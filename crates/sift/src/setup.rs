//! Building the extraction middleware from configuration.

use sift_config::{ConfigError, SiftConfig};
use sift_core::{CodecRegistry, FormatSupport, SiftResult};
use sift_middleware::{Handler, SiftMiddleware};
use sift_telemetry::TelemetryError;
use thiserror::Error;

/// Errors raised while setting Sift up.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// The default content type has no registered codec.
    #[error("default content type '{content_type}' has no codec (registered: {registered:?})")]
    MissingDefaultCodec {
        /// The configured default content type.
        content_type: String,
        /// The registered MIME types.
        registered: Vec<String>,
    },
}

/// Returns the codecs shipped with Sift: JSON and form-urlencoded, with
/// `default_content_type` as the fallback.
pub fn default_codecs(default_content_type: &str) -> CodecRegistry {
    let mut codecs = CodecRegistry::with_defaults().with_format(FormatSupport::form_urlencoded());
    codecs.set_default_content_type(default_content_type);
    codecs
}

/// Turns a [`SiftConfig`] into a ready [`SiftMiddleware`].
///
/// ```
/// use sift::Sift;
/// use sift_config::SiftConfig;
///
/// let sift = Sift::new(SiftConfig::default()).build().unwrap();
/// assert_eq!(sift.codecs().len(), 2);
/// ```
#[derive(Debug)]
#[must_use]
pub struct Sift {
    config: SiftConfig,
    codecs: Option<CodecRegistry>,
}

impl Sift {
    /// Starts from `config`.
    pub fn new(config: SiftConfig) -> Self {
        Self {
            config,
            codecs: None,
        }
    }

    /// Replaces the shipped codecs.
    ///
    /// The configured default content type still applies.
    pub fn codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = Some(codecs);
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SiftConfig {
        &self.config
    }

    /// Builds the middleware without touching global telemetry state.
    pub fn build(self) -> Result<SiftMiddleware, SetupError> {
        let config = self.config;
        config.validate()?;

        let codecs = match self.codecs {
            Some(mut codecs) => {
                codecs.set_default_content_type(&config.default_content_type);
                codecs
            }
            None => default_codecs(&config.default_content_type),
        };
        if codecs.default_format().is_none() {
            return Err(SetupError::MissingDefaultCodec {
                content_type: config.default_content_type,
                registered: codecs.mime_types().map(ToString::to_string).collect(),
            });
        }

        Ok(SiftMiddleware::builder()
            .codecs(codecs)
            .orders(config.source_orders()?)
            .body_options(config.body_options())
            .build())
    }

    /// Installs logging and metrics, then builds the middleware.
    ///
    /// Call once at startup.
    pub fn init(self) -> Result<SiftMiddleware, SetupError> {
        sift_telemetry::init_telemetry(
            &self.config.logging.to_log_config(),
            &self.config.metrics.to_metrics_config(),
        )?;

        let default_content_type = self.config.default_content_type.clone();
        let max_body_bytes = self.config.max_body_bytes;
        let sift = self.build()?;
        tracing::info!(
            default_content_type = %default_content_type,
            max_body_bytes,
            codecs = sift.codecs().len(),
            "Sift initialized"
        );
        Ok(sift)
    }

    /// Checks at mount time that `handler` can be served.
    pub fn check(handler: &dyn Handler) -> SiftResult<()> {
        handler.signature().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use sift_core::codec::{APPLICATION_FORM, APPLICATION_JSON};
    use sift_extract::{DataParam, DataSource, Signature};
    use sift_middleware::{handler, Response, ResponseExt};

    #[test]
    fn test_default_codecs() {
        let codecs = default_codecs(APPLICATION_FORM);
        assert!(codecs.contains(APPLICATION_JSON));
        assert!(codecs.contains(APPLICATION_FORM));
        assert_eq!(codecs.default_content_type(), APPLICATION_FORM);
    }

    #[test]
    fn test_build_from_config() {
        let mut config = SiftConfig::default();
        config
            .sources
            .insert("get".to_string(), vec![DataSource::RouteParams]);

        let sift = Sift::new(config).build().unwrap();
        assert_eq!(sift.orders().for_method(&Method::GET), &[DataSource::RouteParams]);
        assert_eq!(sift.codecs().len(), 2);
    }

    #[test]
    fn test_custom_codecs_keep_configured_default() {
        let config = SiftConfig {
            default_content_type: APPLICATION_FORM.to_string(),
            ..SiftConfig::default()
        };
        let codecs = CodecRegistry::new(APPLICATION_JSON).with_format(FormatSupport::form_urlencoded());
        let sift = Sift::new(config).codecs(codecs).build().unwrap();
        assert_eq!(sift.codecs().len(), 1);
        assert_eq!(sift.codecs().default_content_type(), APPLICATION_FORM);
    }

    #[test]
    fn test_default_without_codec_is_rejected() {
        let config = SiftConfig {
            default_content_type: "text/xml".to_string(),
            ..SiftConfig::default()
        };
        match Sift::new(config).build() {
            Err(SetupError::MissingDefaultCodec {
                content_type,
                registered,
            }) => {
                assert_eq!(content_type, "text/xml");
                assert_eq!(registered, vec![APPLICATION_JSON, APPLICATION_FORM]);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_custom_codecs_must_cover_default() {
        let config = SiftConfig {
            default_content_type: APPLICATION_FORM.to_string(),
            ..SiftConfig::default()
        };
        let result = Sift::new(config).codecs(CodecRegistry::with_defaults()).build();
        assert!(matches!(result, Err(SetupError::MissingDefaultCodec { .. })));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SiftConfig {
            max_body_bytes: 0,
            ..SiftConfig::default()
        };
        assert!(matches!(Sift::new(config).build(), Err(SetupError::Config(_))));
    }

    #[test]
    fn test_init_with_telemetry_disabled() {
        let mut config = SiftConfig::default();
        config.logging.enabled = false;
        config.metrics.enabled = false;
        assert!(Sift::new(config).init().is_ok());
    }

    #[test]
    fn test_check() {
        let ok = handler::request(|_req| async { Response::text(StatusCode::OK, "") });
        assert!(Sift::check(&ok).is_ok());

        let two = handler::with_signature(
            Signature::new(vec![DataParam::Any, DataParam::Any]),
            |_req, _input| async { Response::text(StatusCode::OK, "") },
        );
        assert_eq!(Sift::check(&two).unwrap_err().error_code(), "CONFIGURATION_ERROR");
    }
}
