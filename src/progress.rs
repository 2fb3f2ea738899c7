//! Progress-callback trait for export events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::ExportConfigBuilder::progress_callback`] to be told when
//! the export request starts and finishes, when typeset rendering is done
//! and when the output file is in place.
//!
//! # Example
//!
//! ```rust
//! use gdoc_down::{ExportConfig, ExportProgressCallback};
//! use std::sync::Arc;
//!
//! struct Log;
//!
//! impl ExportProgressCallback for Log {
//!     fn on_export_complete(&self, document_id: &str, bytes: usize) {
//!         eprintln!("{document_id}: {bytes} bytes");
//!     }
//! }
//!
//! let config = ExportConfig::builder()
//!     .progress_callback(Arc::new(Log) as Arc<dyn ExportProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the export pipeline at each stage.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExportProgressCallback: Send + Sync {
    /// Called just before the export request is sent.
    fn on_export_start(&self, document_id: &str, mime_type: &str) {
        let _ = (document_id, mime_type);
    }

    /// Called when the export payload has been received.
    fn on_export_complete(&self, document_id: &str, bytes: usize) {
        let _ = (document_id, bytes);
    }

    /// Called after typeset rendering, with the number of inlined comments.
    fn on_render_complete(&self, annotations: usize) {
        let _ = annotations;
    }

    /// Called once the output file is in place.
    fn on_write_complete(&self, path: &Path, bytes: usize) {
        let _ = (path, bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExportConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;
