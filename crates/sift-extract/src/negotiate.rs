//! Response content negotiation.
//!
//! Error bodies are written in a content type the client accepts:
//!
//! 1. the first `Accept` preference (by quality, then header order) that is a
//!    registered MIME type;
//! 2. otherwise, if the header has no wildcard, the request is not acceptable;
//! 3. with a wildcard, or no usable `Accept` header at all, the request's own
//!    content type if it is registered, else the registry default, else any
//!    other registered type.
//!
//! Types listed with `q=0` are never chosen in step 3.

use mime::Mime;
use sift_core::{CodecRegistry, FormatSupport, SiftError, SiftResult};
use std::cmp::Ordering;

/// One parsed media range from an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    mime: Mime,
    quality: f32,
}

impl MediaRange {
    /// Parses a single media range, e.g. `text/html; q=0.8`.
    pub fn parse(s: &str) -> Option<Self> {
        let mime: Mime = s.trim().parse().ok()?;
        let quality = mime
            .get_param("q")
            .and_then(|q| q.as_str().parse::<f32>().ok())
            .filter(|q| (0.0..=1.0).contains(q))
            .unwrap_or(1.0);
        Some(Self { mime, quality })
    }

    /// Returns the `type/subtype` essence.
    pub fn essence(&self) -> &str {
        self.mime.essence_str()
    }

    /// Returns the quality value.
    pub fn quality(&self) -> f32 {
        self.quality
    }

    /// Returns `true` for `*/*` and `type/*` ranges.
    pub fn is_wildcard(&self) -> bool {
        self.mime.type_() == mime::STAR || self.mime.subtype() == mime::STAR
    }
}

/// A parsed `Accept` header, most preferred first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptHeader {
    ranges: Vec<MediaRange>,
    excluded: Vec<String>,
}

impl AcceptHeader {
    /// Parses an `Accept` header.
    ///
    /// Unparseable entries are dropped. Entries with `q=0` are kept apart as
    /// exclusions. Entries with equal quality keep their header order.
    ///
    /// ```
    /// use sift_extract::AcceptHeader;
    ///
    /// let accept = AcceptHeader::parse("text/html;q=0.5, application/json, */*;q=0.1");
    /// let order: Vec<_> = accept.ranges().iter().map(|r| r.essence()).collect();
    /// assert_eq!(order, vec!["application/json", "text/html", "*/*"]);
    /// assert!(accept.has_wildcard());
    /// ```
    pub fn parse(header: &str) -> Self {
        let (mut ranges, refused): (Vec<MediaRange>, Vec<MediaRange>) = header
            .split(',')
            .filter_map(MediaRange::parse)
            .partition(|r| r.quality > 0.0);

        ranges.sort_by(|a, b| b.quality.partial_cmp(&a.quality).unwrap_or(Ordering::Equal));
        let excluded = refused
            .iter()
            .map(|r| r.essence().to_ascii_lowercase())
            .collect();

        Self { ranges, excluded }
    }

    /// Returns the ranges in preference order.
    pub fn ranges(&self) -> &[MediaRange] {
        &self.ranges
    }

    /// Returns `true` if the header named nothing at all.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && self.excluded.is_empty()
    }

    /// Returns `true` if `mime_type` was listed with `q=0`.
    pub fn excludes(&self, mime_type: &str) -> bool {
        self.excluded.iter().any(|e| e.eq_ignore_ascii_case(mime_type))
    }

    /// Returns `true` if any range is a wildcard.
    pub fn has_wildcard(&self) -> bool {
        self.ranges.iter().any(MediaRange::is_wildcard)
    }

    /// Returns the first registered format named exactly by a range.
    pub fn find_registered<'r>(&self, codecs: &'r CodecRegistry) -> Option<&'r FormatSupport> {
        self.ranges
            .iter()
            .filter(|r| !r.is_wildcard())
            .find_map(|r| codecs.get(r.essence()))
    }
}

/// Picks the format used to write a response body.
///
/// `accept` is the raw `Accept` header and `request_content_type` the
/// request's `Content-Type`.
pub fn negotiate<'r>(
    accept: Option<&str>,
    request_content_type: Option<&str>,
    codecs: &'r CodecRegistry,
) -> SiftResult<&'r FormatSupport> {
    let header = AcceptHeader::parse(accept.unwrap_or(""));

    if let Some(format) = header.find_registered(codecs) {
        return Ok(format);
    }

    if !header.is_empty() && !header.has_wildcard() {
        return Err(SiftError::not_acceptable(
            accept.unwrap_or_default(),
            codecs.mime_types().map(ToString::to_string).collect(),
        ));
    }

    let allowed = |format: &&FormatSupport| !header.excludes(format.mime_type());

    if let Some(format) = request_content_type
        .and_then(|ct| codecs.get(ct))
        .filter(allowed)
    {
        return Ok(format);
    }

    let Some(default) = codecs.default_format() else {
        return Err(SiftError::configuration(format!(
            "default content type '{}' has no registered codec",
            codecs.default_content_type()
        )));
    };
    if allowed(&default) {
        return Ok(default);
    }

    codecs.iter().find(allowed).ok_or_else(|| {
        SiftError::not_acceptable(
            accept.unwrap_or_default(),
            codecs.mime_types().map(ToString::to_string).collect(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::codec::{APPLICATION_FORM, APPLICATION_JSON};

    fn registry() -> CodecRegistry {
        CodecRegistry::with_defaults().with_format(FormatSupport::form_urlencoded())
    }

    fn pick(accept: Option<&str>, content_type: Option<&str>) -> SiftResult<String> {
        let codecs = registry();
        negotiate(accept, content_type, &codecs).map(|f| f.mime_type().to_string())
    }

    #[test]
    fn test_parse_quality_order() {
        let accept = AcceptHeader::parse("a/b;q=0.2, c/d, e/f;q=0.9, g/h;q=0");
        let order: Vec<_> = accept.ranges().iter().map(MediaRange::essence).collect();
        assert_eq!(order, vec!["c/d", "e/f", "a/b"]);
        assert!(accept.excludes("g/h"));
        assert!(!accept.excludes("a/b"));
    }

    #[test]
    fn test_parse_skips_garbage() {
        let accept = AcceptHeader::parse("not a type, application/json");
        assert_eq!(accept.ranges().len(), 1);
        assert!(AcceptHeader::parse("").is_empty());
    }

    #[test]
    fn test_first_registered_preference_wins() {
        assert_eq!(
            pick(Some("text/html, application/x-www-form-urlencoded, application/json"), None).unwrap(),
            APPLICATION_FORM
        );
        assert_eq!(
            pick(Some("application/x-www-form-urlencoded;q=0.5, application/json"), None).unwrap(),
            APPLICATION_JSON
        );
    }

    #[test]
    fn test_no_match_without_wildcard_is_not_acceptable() {
        let err = pick(Some("text/html, text/xml"), None).unwrap_err();
        assert_eq!(err.status_code().as_u16(), 406);
        match err {
            SiftError::NotAcceptable { supported, .. } => {
                assert_eq!(supported, vec![APPLICATION_JSON, APPLICATION_FORM]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_wildcard_uses_request_content_type() {
        assert_eq!(
            pick(Some("text/html, */*;q=0.1"), Some(APPLICATION_FORM)).unwrap(),
            APPLICATION_FORM
        );
        assert_eq!(pick(Some("text/*"), Some(APPLICATION_FORM)).unwrap(), APPLICATION_FORM);
    }

    #[test]
    fn test_wildcard_falls_back_to_default() {
        assert_eq!(pick(Some("*/*"), Some("text/xml")).unwrap(), APPLICATION_JSON);
        assert_eq!(pick(Some("*/*"), None).unwrap(), APPLICATION_JSON);
    }

    #[test]
    fn test_missing_header_behaves_like_wildcard() {
        assert_eq!(pick(None, Some(APPLICATION_FORM)).unwrap(), APPLICATION_FORM);
        assert_eq!(pick(Some(""), None).unwrap(), APPLICATION_JSON);
    }

    #[test]
    fn test_zero_quality_excludes_wildcard_fallback() {
        assert_eq!(
            pick(Some("application/json;q=0, */*"), Some(APPLICATION_JSON)).unwrap(),
            APPLICATION_FORM
        );
        assert_eq!(
            pick(Some("application/x-www-form-urlencoded;q=0, */*"), Some(APPLICATION_FORM))
                .unwrap(),
            APPLICATION_JSON
        );
    }

    #[test]
    fn test_everything_excluded_is_not_acceptable() {
        let err = pick(
            Some("application/json;q=0, application/x-www-form-urlencoded;q=0, */*"),
            None,
        )
        .unwrap_err();
        assert_eq!(err.status_code().as_u16(), 406);

        let err = pick(Some("application/json;q=0"), None).unwrap_err();
        assert_eq!(err.status_code().as_u16(), 406);
    }

    #[test]
    fn test_default_without_codec() {
        let codecs = CodecRegistry::new("text/plain");
        let err = negotiate(None, None, &codecs).unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }
}
