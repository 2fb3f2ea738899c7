//! Format resolution: which export MIME type answers a requested extension.
//!
//! Drive only exports each document kind to a fixed set of MIME types, and a
//! cross-kind request (say `xlsx` for a presentation) is rejected with an
//! opaque 400. Resolving against one static registry turns that into a local
//! `Unknown format "<token>"` before any request is made.
//!
//! The registry key is `(DocumentKind, extension)`. Two entries may share an
//! extension only if their kind sets are disjoint.

use crate::error::GDocDownError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// The three Google Drive document kinds a pointer file can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Google Docs (`.gdoc`).
    Document,
    /// Google Sheets (`.gsheet`).
    Spreadsheet,
    /// Google Slides (`.gslides`).
    Presentation,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Document,
        DocumentKind::Spreadsheet,
        DocumentKind::Presentation,
    ];

    /// Map a pointer-file extension (with or without the leading dot) to a kind.
    ///
    /// The error carries the extension exactly as it appears on the file name,
    /// dot included, so the message matches what the user typed.
    pub fn from_extension(extension: &str) -> Result<Self, GDocDownError> {
        let bare = extension.strip_prefix('.').unwrap_or(extension);
        match bare.to_ascii_lowercase().as_str() {
            "gdoc" => Ok(DocumentKind::Document),
            "gsheet" => Ok(DocumentKind::Spreadsheet),
            "gslides" => Ok(DocumentKind::Presentation),
            _ => Err(GDocDownError::UnknownSourceExtension {
                extension: extension.to_string(),
            }),
        }
    }

    /// Kind of the pointer file at `path`, judged by its extension alone.
    pub fn from_path(path: &Path) -> Result<Self, GDocDownError> {
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        Self::from_extension(&extension)
    }

    /// Pointer-file extension for this kind, without the dot.
    pub fn pointer_extension(self) -> &'static str {
        match self {
            DocumentKind::Document => "gdoc",
            DocumentKind::Spreadsheet => "gsheet",
            DocumentKind::Presentation => "gslides",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentKind::Document => "document",
            DocumentKind::Spreadsheet => "spreadsheet",
            DocumentKind::Presentation => "presentation",
        };
        f.write_str(name)
    }
}

/// What happens to the exported payload before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Rendering {
    /// Bytes are written exactly as the export endpoint returned them.
    Passthrough,
    /// The HTML export is sanitised, comments are inlined as `\pdfcomment{}`
    /// and the body is flattened to paragraph-separated text.
    Typeset,
}

/// One supported output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatSpec {
    /// Format token and output file extension (`"html.zip"` has a dot inside).
    pub extension: &'static str,
    /// MIME type requested from the export endpoint.
    pub mime_type: &'static str,
    /// Document kinds this entry applies to.
    pub kinds: &'static [DocumentKind],
    pub rendering: Rendering,
    pub description: &'static str,
}

impl FormatSpec {
    pub fn applies_to(&self, kind: DocumentKind) -> bool {
        self.kinds.contains(&kind)
    }
}

use self::DocumentKind::{Document as Doc, Presentation as Slides, Spreadsheet as Sheet};

const MIME_DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const MIME_PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

/// The export registry. Keep entries grouped by extension.
pub static FORMATS: &[FormatSpec] = &[
    FormatSpec {
        extension: "csv",
        mime_type: "text/csv",
        kinds: &[Sheet],
        rendering: Rendering::Passthrough,
        description: "Comma-separated values (first sheet)",
    },
    FormatSpec {
        extension: "docx",
        mime_type: MIME_DOCX,
        kinds: &[Doc],
        rendering: Rendering::Passthrough,
        description: "Microsoft Word",
    },
    FormatSpec {
        extension: "epub",
        mime_type: "application/epub+zip",
        kinds: &[Doc],
        rendering: Rendering::Passthrough,
        description: "EPUB e-book",
    },
    FormatSpec {
        extension: "html",
        mime_type: "text/html",
        kinds: &[Doc],
        rendering: Rendering::Passthrough,
        description: "Single-page HTML",
    },
    FormatSpec {
        extension: "html.zip",
        mime_type: "application/zip",
        kinds: &[Doc, Sheet],
        rendering: Rendering::Passthrough,
        description: "Zipped HTML with images",
    },
    FormatSpec {
        extension: "md",
        mime_type: "text/markdown",
        kinds: &[Doc],
        rendering: Rendering::Passthrough,
        description: "Markdown",
    },
    FormatSpec {
        extension: "odp",
        mime_type: "application/vnd.oasis.opendocument.presentation",
        kinds: &[Slides],
        rendering: Rendering::Passthrough,
        description: "OpenDocument presentation",
    },
    FormatSpec {
        extension: "ods",
        mime_type: "application/vnd.oasis.opendocument.spreadsheet",
        kinds: &[Sheet],
        rendering: Rendering::Passthrough,
        description: "OpenDocument spreadsheet",
    },
    FormatSpec {
        extension: "odt",
        mime_type: "application/vnd.oasis.opendocument.text",
        kinds: &[Doc],
        rendering: Rendering::Passthrough,
        description: "OpenDocument text",
    },
    FormatSpec {
        extension: "pdf",
        mime_type: "application/pdf",
        kinds: &[Doc, Sheet, Slides],
        rendering: Rendering::Passthrough,
        description: "PDF",
    },
    FormatSpec {
        extension: "pptx",
        mime_type: MIME_PPTX,
        kinds: &[Slides],
        rendering: Rendering::Passthrough,
        description: "Microsoft PowerPoint",
    },
    FormatSpec {
        extension: "rtf",
        mime_type: "application/rtf",
        kinds: &[Doc],
        rendering: Rendering::Passthrough,
        description: "Rich text",
    },
    FormatSpec {
        extension: "tex",
        mime_type: "text/html",
        kinds: &[Doc],
        rendering: Rendering::Typeset,
        description: "LaTeX body text with comments as \\pdfcomment{} (unknown HTML entities fail)",
    },
    FormatSpec {
        extension: "tsv",
        mime_type: "text/tab-separated-values",
        kinds: &[Sheet],
        rendering: Rendering::Passthrough,
        description: "Tab-separated values (first sheet)",
    },
    FormatSpec {
        extension: "txt",
        mime_type: "text/plain",
        kinds: &[Doc, Slides],
        rendering: Rendering::Passthrough,
        description: "Plain text",
    },
    FormatSpec {
        extension: "xlsx",
        mime_type: MIME_XLSX,
        kinds: &[Sheet],
        rendering: Rendering::Passthrough,
        description: "Microsoft Excel",
    },
];

/// Normalise a user-supplied format token for lookup.
fn normalise_token(token: &str) -> String {
    let token = token.trim();
    token.strip_prefix('.').unwrap_or(token).to_ascii_lowercase()
}

/// Resolve a format token for a document kind.
///
/// Matching ignores case, surrounding whitespace and a leading dot; the error
/// reports the token as given.
pub fn resolve_format(kind: DocumentKind, token: &str) -> Result<&'static FormatSpec, GDocDownError> {
    let wanted = normalise_token(token);
    FORMATS
        .iter()
        .find(|spec| spec.extension == wanted && spec.applies_to(kind))
        .ok_or_else(|| GDocDownError::UnknownFormat {
            format: token.to_string(),
        })
}

/// All formats offered for `kind`, in registry order.
pub fn formats_for(kind: DocumentKind) -> impl Iterator<Item = &'static FormatSpec> {
    FORMATS.iter().filter(move |spec| spec.applies_to(kind))
}

/// Infer a format from an output file name by its longest matching suffix,
/// so `report.html.zip` yields `html.zip` rather than `zip`.
pub fn infer_format(kind: DocumentKind, file_name: &str) -> Option<&'static FormatSpec> {
    let lower = file_name.to_ascii_lowercase();
    formats_for(kind)
        .filter(|spec| {
            lower
                .strip_suffix(spec.extension)
                .is_some_and(|stem| stem.ends_with('.') && stem.len() > 1)
        })
        .max_by_key(|spec| spec.extension.len())
}

/// True when `path` names a file rather than a directory: it has an
/// extension and is not an existing directory.
pub fn is_file_path(path: &Path) -> bool {
    path.extension().is_some() && !path.is_dir()
}

/// Reject an explicit output file path combined with an extension override.
///
/// The output file name already fixes the extension, so honouring both would
/// silently drop one of them.
pub fn check_output_spec(
    out_path: Option<&Path>,
    extension: Option<&str>,
) -> Result<(), GDocDownError> {
    match (out_path, extension) {
        (Some(path), Some(_)) if is_file_path(path) => Err(GDocDownError::ConflictingOutputSpec),
        _ => Ok(()),
    }
}
