//! Configuration types for document export.
//!
//! Everything that used to be a module-level constant in a one-off script
//! (API endpoint, entity-substitution table, comment layout, default format)
//! lives in [`ExportConfig`], built via [`ExportConfigBuilder`]. The config is
//! immutable once built and is passed by reference into every pipeline stage.

use crate::error::GDocDownError;
use crate::pipeline::sanitize::DEFAULT_ENTITY_SUBSTITUTIONS;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Drive v3 REST root used for `files/{id}/export`.
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Configuration for a document export.
///
/// Built via [`ExportConfig::builder()`] or using [`ExportConfig::default()`].
///
/// # Example
/// ```rust
/// use gdoc_down::ExportConfig;
///
/// let config = ExportConfig::builder()
///     .default_format("pdf")
///     .request_timeout_secs(30)
///     .max_annotations(200)
///     .build()
///     .unwrap();
/// assert_eq!(config.default_format, "pdf");
/// ```
#[derive(Clone)]
pub struct ExportConfig {
    /// Format token used when neither `--format` nor an output file name
    /// decides the format. Default: `"docx"`.
    pub default_format: String,

    /// Base URL of the Drive REST API. Default: [`DEFAULT_API_BASE_URL`].
    ///
    /// Overridable so tests and proxies can point the client elsewhere.
    pub api_base_url: String,

    /// Timeout for the single export request, in seconds. Default: 120.
    ///
    /// Large spreadsheets exported as PDF can take well over a minute on the
    /// Drive side; the export endpoint streams nothing until it is done.
    pub request_timeout_secs: u64,

    /// Where comment markers and their footnotes sit in the HTML export.
    pub annotations: AnnotationLayout,

    /// Entity → replacement pairs applied to the raw HTML before parsing,
    /// in order. Default: [`DEFAULT_ENTITY_SUBSTITUTIONS`].
    pub entity_substitutions: Vec<(String, String)>,

    /// Appended after every top-level block of the typeset output. Default: `"\n\n"`.
    pub paragraph_separator: String,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_format: "docx".to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 120,
            annotations: AnnotationLayout::default(),
            entity_substitutions: DEFAULT_ENTITY_SUBSTITUTIONS
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            paragraph_separator: "\n\n".to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("default_format", &self.default_format)
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("annotations", &self.annotations)
            .field("entity_substitutions", &self.entity_substitutions.len())
            .field("paragraph_separator", &self.paragraph_separator)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExportProgressCallback>"),
            )
            .finish()
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExportConfig`].
#[derive(Debug)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn default_format(mut self, format: impl Into<String>) -> Self {
        self.config.default_format = format.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn annotations(mut self, layout: AnnotationLayout) -> Self {
        self.config.annotations = layout;
        self
    }

    pub fn max_annotations(mut self, n: u32) -> Self {
        self.config.annotations.max_annotations = n;
        self
    }

    pub fn footnote_depth(mut self, hops: usize) -> Self {
        self.config.annotations.footnote_depth = hops;
        self
    }

    pub fn comment_macro(mut self, name: impl Into<String>) -> Self {
        self.config.annotations.comment_macro = name.into();
        self
    }

    /// Append one entity substitution after the defaults.
    pub fn entity(mut self, entity: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.config
            .entity_substitutions
            .push((entity.into(), replacement.into()));
        self
    }

    pub fn entity_substitutions(mut self, table: Vec<(String, String)>) -> Self {
        self.config.entity_substitutions = table;
        self
    }

    pub fn paragraph_separator(mut self, sep: impl Into<String>) -> Self {
        self.config.paragraph_separator = sep.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExportConfig, GDocDownError> {
        let c = &self.config;
        if c.default_format.trim().is_empty() {
            return Err(GDocDownError::InvalidConfig(
                "Default format must not be empty".into(),
            ));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(GDocDownError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        if c.request_timeout_secs == 0 {
            return Err(GDocDownError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        c.annotations.validate()?;
        if c.entity_substitutions.iter().any(|(from, _)| from.is_empty()) {
            return Err(GDocDownError::InvalidConfig(
                "Entity substitutions must not have an empty pattern".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Shape of the comment apparatus in Google's HTML export.
///
/// A comment is exported as a superscript reference
/// `<sup><a id="cmnt_ref1" href="#cmnt1">[a]</a></sup>` in the body and a
/// footnote block at the end of the body:
///
/// ```text
/// <div>                                  ← footnote block (2 hops up)
///   <p><a id="cmnt1" href="#cmnt_ref1">[a]</a><span>comment text</span></p>
/// </div>
/// ```
///
/// The nesting is not a documented contract of the export, so the hop count
/// is a parameter rather than a hard-coded traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationLayout {
    /// Id prefix of the numbered marker inside the footnote. Default: `"cmnt"`.
    pub body_prefix: String,
    /// Id prefix of the marker at the commented text. Default: `"cmnt_ref"`.
    pub reference_prefix: String,
    /// Parent hops from the footnote marker to the footnote block. Default: 2.
    pub footnote_depth: usize,
    /// Upper bound on the comment sequence scanned. Default: 1000.
    pub max_annotations: u32,
    /// Macro wrapped around inlined comment text. Default: `"pdfcomment"`.
    pub comment_macro: String,
}

impl Default for AnnotationLayout {
    fn default() -> Self {
        Self {
            body_prefix: "cmnt".to_string(),
            reference_prefix: "cmnt_ref".to_string(),
            footnote_depth: 2,
            max_annotations: 1000,
            comment_macro: "pdfcomment".to_string(),
        }
    }
}

impl AnnotationLayout {
    pub fn body_id(&self, sequence: u32) -> String {
        format!("{}{}", self.body_prefix, sequence)
    }

    pub fn reference_id(&self, sequence: u32) -> String {
        format!("{}{}", self.reference_prefix, sequence)
    }

    /// Wrap comment text in the configured macro: `\pdfcomment{text}`.
    pub fn directive(&self, text: &str) -> String {
        format!("\\{}{{{}}}", self.comment_macro, text)
    }

    fn validate(&self) -> Result<(), GDocDownError> {
        if self.footnote_depth == 0 {
            return Err(GDocDownError::InvalidConfig(
                "Footnote depth must be ≥ 1".into(),
            ));
        }
        if self.max_annotations == 0 {
            return Err(GDocDownError::InvalidConfig(
                "Max annotations must be ≥ 1".into(),
            ));
        }
        if self.body_prefix.is_empty() || self.reference_prefix.is_empty() {
            return Err(GDocDownError::InvalidConfig(
                "Comment id prefixes must not be empty".into(),
            ));
        }
        if self.body_prefix == self.reference_prefix {
            return Err(GDocDownError::InvalidConfig(
                "Comment body and reference prefixes must differ".into(),
            ));
        }
        if self.comment_macro.is_empty()
            || !self.comment_macro.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(GDocDownError::InvalidConfig(format!(
                "Comment macro must be a plain TeX control word, got '{}'",
                self.comment_macro
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        let config = ExportConfig::builder().build().unwrap();
        assert_eq!(config.default_format, "docx");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.paragraph_separator, "\n\n");
        assert_eq!(config.annotations.footnote_depth, 2);
        assert!(config
            .entity_substitutions
            .iter()
            .any(|(from, to)| from == "&mdash;" && to == "---"));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = ExportConfig::builder()
            .api_base_url("http://127.0.0.1:9000/drive/v3/")
            .build()
            .unwrap();
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000/drive/v3");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(ExportConfig::builder().request_timeout_secs(0).build().is_err());
        assert!(ExportConfig::builder().footnote_depth(0).build().is_err());
        assert!(ExportConfig::builder().max_annotations(0).build().is_err());
        assert!(ExportConfig::builder().comment_macro("pdf comment").build().is_err());
        assert!(ExportConfig::builder().api_base_url("ftp://x").build().is_err());
        assert!(ExportConfig::builder().entity("", "x").build().is_err());
    }

    #[test]
    fn layout_ids_and_directive() {
        let layout = AnnotationLayout::default();
        assert_eq!(layout.body_id(3), "cmnt3");
        assert_eq!(layout.reference_id(3), "cmnt_ref3");
        assert_eq!(layout.directive("check this"), "\\pdfcomment{check this}");
    }

    #[test]
    fn debug_hides_callback() {
        let config = ExportConfig::builder()
            .progress_callback(std::sync::Arc::new(crate::progress::NoopProgressCallback))
            .build()
            .unwrap();
        let dbg = format!("{config:?}");
        assert!(dbg.contains("<dyn ExportProgressCallback>"));
    }
}
