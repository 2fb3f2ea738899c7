//! Pointer files: the small JSON stubs Drive for desktop leaves on disk.
//!
//! A `.gdoc` / `.gsheet` / `.gslides` file holds no content, only enough to
//! find the document online. Depending on the client version it looks like
//!
//! ```json
//! {"url": "https://docs.google.com/open?id=1mgP...", "doc_id": "1mgP...", "email": "a@b.c"}
//! {"doc_id": "1mgP...", "resource_key": "", "email": "a@b.c"}
//! {"resource_id": "document:1mgP...", "email": "a@b.c"}
//! ```
//!
//! The kind comes from the file extension and is checked before the file is
//! opened, so a wrong extension fails the same way whether or not the file
//! is readable.

use crate::error::GDocDownError;
use crate::pipeline::formats::DocumentKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A remote document named by a pointer file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentPointer {
    pub kind: DocumentKind,
    /// Drive file id.
    pub id: String,
    /// The pointer file this was read from.
    pub source: PathBuf,
    /// Account the pointer file was created under, if recorded.
    pub email: Option<String>,
}

impl DocumentPointer {
    /// Pointer file name without its extension, used to name the output.
    pub fn stem(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.id.clone())
    }
}

#[derive(Debug, Deserialize)]
struct PointerFile {
    doc_id: Option<String>,
    resource_id: Option<String>,
    url: Option<String>,
    email: Option<String>,
}

/// Read the pointer file at `path`.
pub fn identify(path: impl AsRef<Path>) -> Result<DocumentPointer, GDocDownError> {
    let path = path.as_ref();
    let kind = DocumentKind::from_path(path)?;

    let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => GDocDownError::PointerNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => GDocDownError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => GDocDownError::MalformedPointerFile {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;

    let pointer = parse_pointer(&contents, kind, path)?;
    debug!("Identified {} {} from {}", pointer.kind, pointer.id, path.display());
    Ok(pointer)
}

/// Parse pointer-file contents; `path` is only used for error messages.
pub fn parse_pointer(
    contents: &str,
    kind: DocumentKind,
    path: &Path,
) -> Result<DocumentPointer, GDocDownError> {
    let malformed = |detail: String| GDocDownError::MalformedPointerFile {
        path: path.to_path_buf(),
        detail,
    };

    let file: PointerFile =
        serde_json::from_str(contents).map_err(|e| malformed(format!("not a JSON object: {e}")))?;

    let id = non_empty(file.doc_id)
        .or_else(|| file.resource_id.as_deref().and_then(id_from_resource))
        .or_else(|| file.url.as_deref().and_then(id_from_url))
        .ok_or_else(|| malformed("no \"doc_id\" field".to_string()))?;
    if !RE_DRIVE_ID.is_match(&id) {
        return Err(malformed(format!("'{id}' is not a Drive document id")));
    }

    Ok(DocumentPointer {
        kind,
        id,
        source: path.to_path_buf(),
        email: non_empty(file.email),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `"document:1abc"` → `"1abc"`.
fn id_from_resource(resource: &str) -> Option<String> {
    let (_, id) = resource.split_once(':')?;
    non_empty(Some(id.to_string()))
}

static RE_DRIVE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

static RE_URL_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:/d/|[?&]id=)([A-Za-z0-9_-]+)").unwrap());

/// Pull the id out of `.../d/<id>/edit` or `...?id=<id>` URLs.
fn id_from_url(url: &str) -> Option<String> {
    RE_URL_ID.captures(url).map(|caps| caps[1].to_string())
}
