//! Results of an export.

use crate::pipeline::annotations::InlinedAnnotation;
use crate::pipeline::pointer::DocumentPointer;
use serde::Serialize;
use std::path::PathBuf;

/// The converted artefact, before or after it has been written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPayload {
    /// Opaque bytes from the export endpoint.
    Bytes(Vec<u8>),
    /// Typeset text produced from the HTML export.
    Text(String),
}

impl ExportPayload {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ExportPayload::Bytes(b) => b,
            ExportPayload::Text(t) => t.as_bytes(),
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ExportPayload::Text(t) => Some(t),
            ExportPayload::Bytes(_) => None,
        }
    }
}

/// Everything a conversion produced.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub pointer: DocumentPointer,
    /// Format token that was resolved, e.g. `"tex"`.
    pub format: String,
    /// MIME type requested from the export endpoint.
    pub mime_type: String,
    pub payload: ExportPayload,
    /// Where the payload is (or would be) written.
    pub target_path: PathBuf,
    /// Comments inlined by typeset rendering; empty for passthrough formats.
    pub annotations: Vec<InlinedAnnotation>,
    pub stats: ExportStats,
}

/// Counters and timings for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub bytes_downloaded: usize,
    pub bytes_written: usize,
    pub annotations_inlined: usize,
    pub download_duration_ms: u64,
    pub total_duration_ms: u64,
}
