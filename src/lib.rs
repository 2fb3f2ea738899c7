//! # gdoc-down
//!
//! Download Google Drive documents named by their local pointer files
//! (`.gdoc`, `.gsheet`, `.gslides`) in a chosen export format.
//!
//! ## Why this crate?
//!
//! Drive for desktop syncs Google documents as tiny JSON stubs with no
//! content, so the usual tools can't read them. This crate follows the stub
//! to the document, asks Drive to export it, and writes the result next to
//! the stub. Most formats are written exactly as Drive returns them. The
//! `tex` format is different: Drive's HTML export is cleaned, reviewer
//! comments are moved inline as `\pdfcomment{...}` and the body is flattened
//! into paragraphs ready to paste into a LaTeX document.
//!
//! ## Pipeline Overview
//!
//! ```text
//! pointer file
//!  │
//!  ├─ 1. Identify  kind from the extension, id from the JSON
//!  ├─ 2. Resolve   (kind, format) → export MIME type
//!  ├─ 3. Export    one Drive `files/{id}/export` request
//!  ├─ 4. Typeset   sanitize → inline comments → serialize   (tex only)
//!  └─ 5. Output    atomic write to `<stem>.<ext>`
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gdoc_down::{convert_to_file, resolve_token, DriveClient, ExportConfig, ExportRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Token from GDOC_DOWN_ACCESS_TOKEN or GDOC_DOWN_TOKEN_FILE
//!     let config = ExportConfig::default();
//!     let client = DriveClient::new(resolve_token(None, None)?, &config)?;
//!     let request = ExportRequest::default().format("pdf");
//!     let stats = convert_to_file(&client, "Report.gdoc", &request, &config).await?;
//!     eprintln!("{} bytes written", stats.bytes_written);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gdoc-down` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! gdoc-down = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod credentials;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AnnotationLayout, ExportConfig, ExportConfigBuilder, DEFAULT_API_BASE_URL};
pub use convert::{
    convert, convert_sync, convert_to_file, execute, inspect, plan, render_typeset, write_output,
    ExportPlan, ExportRequest,
};
pub use credentials::{resolve_token, AccessToken};
pub use error::GDocDownError;
pub use output::{ExportOutput, ExportPayload, ExportStats};
pub use pipeline::export::{DriveClient, ExportClient};
pub use pipeline::formats::{DocumentKind, FormatSpec, Rendering, FORMATS};
pub use pipeline::pointer::{identify, DocumentPointer};
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
