//! Error types for the gdoc-down library.
//!
//! Every failure is fatal for the conversion in progress: there is no
//! per-page or per-block partial success here. Either the complete artefact
//! is written or nothing is, and the caller receives one [`GDocDownError`].
//!
//! Variants that carry user input (format token, extension, HTTP status)
//! render it literally so the CLI can print the message unchanged.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the gdoc-down library.
#[derive(Debug, Error)]
pub enum GDocDownError {
    // ── Pointer file errors ───────────────────────────────────────────────
    /// The pointer file was not found at the given path.
    #[error("Google document file not found: '{path}'\nCheck the path exists and is readable.")]
    PointerNotFound { path: PathBuf },

    /// Process does not have read permission on the pointer file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The pointer file extension is not `.gdoc`, `.gsheet` or `.gslides`.
    #[error("Unknown Google document extension \"{extension}\"")]
    UnknownSourceExtension { extension: String },

    /// The pointer file could not be parsed or has no document identifier.
    #[error("Malformed Google document file '{path}': {detail}")]
    MalformedPointerFile { path: PathBuf, detail: String },

    // ── Format errors ─────────────────────────────────────────────────────
    /// The requested output format is not offered for this document kind.
    #[error("Unknown format \"{format}\"")]
    UnknownFormat { format: String },

    /// An explicit output file path and an extension override were both given.
    #[error("Output file path and extension cannot both be specified")]
    ConflictingOutputSpec,

    // ── Remote export errors ──────────────────────────────────────────────
    /// No OAuth access token could be found.
    #[error("No Google Drive credentials available.\n{hint}")]
    CredentialsMissing { hint: String },

    /// The export request could not be sent or its body could not be read.
    #[error("Export request for '{document_id}' failed: {reason}\nCheck your internet connection.")]
    ExportRequestFailed { document_id: String, reason: String },

    /// The export request exceeded the configured timeout.
    #[error("Export request timed out after {secs}s for '{document_id}'\nIncrease --timeout.")]
    ExportTimeout { document_id: String, secs: u64 },

    /// The export endpoint answered with a non-success status.
    #[error("Export of '{document_id}' as {mime_type} failed with HTTP status {status}")]
    ExportFailed {
        document_id: String,
        mime_type: String,
        status: u16,
    },

    // ── Markup errors ─────────────────────────────────────────────────────
    /// The sanitised HTML export is not well-formed.
    #[error("Markup parse error at byte {position}: {detail}")]
    MarkupParseError { position: usize, detail: String },

    /// A required structural element is absent from the parsed export.
    #[error("Exported markup has no <{element}> element")]
    MissingElement { element: String },

    /// A comment marker is not nested where the annotation layout expects it.
    #[error("Comment {sequence} does not match the expected footnote layout: {detail}")]
    AnnotationLayout { sequence: u32, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GDocDownError {
    /// True when the failure happened before any network traffic, i.e. the
    /// request itself was invalid rather than the remote side.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            GDocDownError::UnknownSourceExtension { .. }
                | GDocDownError::UnknownFormat { .. }
                | GDocDownError::ConflictingOutputSpec
                | GDocDownError::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_display() {
        let e = GDocDownError::UnknownFormat {
            format: "unsupported".into(),
        };
        assert_eq!(e.to_string(), "Unknown format \"unsupported\"");
    }

    #[test]
    fn unknown_extension_display() {
        let e = GDocDownError::UnknownSourceExtension {
            extension: ".tmp".into(),
        };
        assert_eq!(e.to_string(), "Unknown Google document extension \".tmp\"");
    }

    #[test]
    fn export_failed_display() {
        let e = GDocDownError::ExportFailed {
            document_id: "abc".into(),
            mime_type: "application/pdf".into(),
            status: 403,
        };
        let msg = e.to_string();
        assert!(msg.contains("403"), "got: {msg}");
        assert!(msg.contains("application/pdf"), "got: {msg}");
    }

    #[test]
    fn markup_parse_error_display() {
        let e = GDocDownError::MarkupParseError {
            position: 42,
            detail: "unclosed <p>".into(),
        };
        assert!(e.to_string().contains("byte 42"));
    }

    #[test]
    fn usage_errors_are_classified() {
        assert!(GDocDownError::ConflictingOutputSpec.is_usage_error());
        assert!(!GDocDownError::ExportFailed {
            document_id: "x".into(),
            mime_type: "text/plain".into(),
            status: 500,
        }
        .is_usage_error());
    }
}
