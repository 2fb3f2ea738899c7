//! Conversion entry points: pointer file in, exported document out.
//!
//! [`convert`] runs the whole pipeline in memory and returns an
//! [`ExportOutput`]; [`convert_to_file`] does the same and then writes the
//! payload atomically next to the pointer file (or wherever the request
//! says). Both take the [`ExportClient`] as a parameter so the network side
//! can be swapped out.

use crate::config::ExportConfig;
use crate::error::GDocDownError;
use crate::output::{ExportOutput, ExportPayload, ExportStats};
use crate::pipeline::annotations::{self, InlinedAnnotation};
use crate::pipeline::export::ExportClient;
use crate::pipeline::formats::{self, FormatSpec, Rendering};
use crate::pipeline::pointer::{self, DocumentPointer};
use crate::pipeline::{sanitize, serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// What the caller asked for, on top of the pointer file itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportRequest {
    /// Format token such as `"pdf"` or `"tex"`. When `None` the format is
    /// inferred from `out_path`'s file name, then taken from the config.
    pub format: Option<String>,
    /// Extension for the generated file name, instead of the format token.
    pub extension: Option<String>,
    /// Output file, or directory to place `<stem>.<ext>` in.
    pub out_path: Option<PathBuf>,
}

impl ExportRequest {
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn out_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.out_path = Some(path.into());
        self
    }
}

/// Everything decided before the network is touched.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub pointer: DocumentPointer,
    pub spec: &'static FormatSpec,
    pub target_path: PathBuf,
}

/// Validate the request and read the pointer file, without credentials or
/// network access.
///
/// Callers that need credentials should run this first, so a request that
/// could never succeed fails before the token lookup.
///
/// # Errors
/// - [`GDocDownError::ConflictingOutputSpec`] before anything is read
/// - pointer-file errors from [`pointer::identify`]
/// - [`GDocDownError::UnknownFormat`] for a format the kind doesn't offer
pub fn plan(
    pointer_path: impl AsRef<Path>,
    request: &ExportRequest,
    config: &ExportConfig,
) -> Result<ExportPlan, GDocDownError> {
    // ── Step 1: Output spec ──────────────────────────────────────────────
    formats::check_output_spec(request.out_path.as_deref(), request.extension.as_deref())?;

    // ── Step 2: Identify the document ────────────────────────────────────
    let pointer = pointer::identify(pointer_path)?;

    // ── Step 3: Resolve the format ───────────────────────────────────────
    let spec = choose_format(&pointer, request, config)?;
    debug!(
        "Exporting {} {} as {} ({})",
        pointer.kind, pointer.id, spec.extension, spec.mime_type
    );

    let target_path = target_path(&pointer, spec, request);
    Ok(ExportPlan {
        pointer,
        spec,
        target_path,
    })
}

/// Export the document named by `pointer_path`.
///
/// # Errors
/// - everything [`plan`] reports
/// - export errors from the client, unchanged
/// - markup and annotation errors for typeset formats
pub async fn convert<C: ExportClient>(
    client: &C,
    pointer_path: impl AsRef<Path>,
    request: &ExportRequest,
    config: &ExportConfig,
) -> Result<ExportOutput, GDocDownError> {
    let pointer_path = pointer_path.as_ref();
    info!("Starting export: {}", pointer_path.display());
    let plan = plan(pointer_path, request, config)?;
    execute(client, plan, config).await
}

/// Run the network and render steps of a [`plan`].
pub async fn execute<C: ExportClient>(
    client: &C,
    plan: ExportPlan,
    config: &ExportConfig,
) -> Result<ExportOutput, GDocDownError> {
    let total_start = Instant::now();
    let ExportPlan {
        pointer,
        spec,
        target_path,
    } = plan;

    // ── Step 4: Remote export ────────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_export_start(&pointer.id, spec.mime_type);
    }
    let download_start = Instant::now();
    let bytes = client.export(&pointer.id, spec.mime_type).await?;
    let download_duration_ms = download_start.elapsed().as_millis() as u64;
    let bytes_downloaded = bytes.len();
    info!(
        "Received {} bytes in {}ms",
        bytes_downloaded, download_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_export_complete(&pointer.id, bytes_downloaded);
    }

    // ── Step 5: Render ───────────────────────────────────────────────────
    let (payload, annotations) = match spec.rendering {
        Rendering::Passthrough => (ExportPayload::Bytes(bytes), Vec::new()),
        Rendering::Typeset => {
            let (text, annotations) = render_typeset(&bytes, config)?;
            if let Some(ref cb) = config.progress_callback {
                cb.on_render_complete(annotations.len());
            }
            (ExportPayload::Text(text), annotations)
        }
    };

    let stats = ExportStats {
        bytes_downloaded,
        bytes_written: 0,
        annotations_inlined: annotations.len(),
        download_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    Ok(ExportOutput {
        pointer,
        format: spec.extension.to_string(),
        mime_type: spec.mime_type.to_string(),
        payload,
        target_path,
        annotations,
        stats,
    })
}

/// Export and write the result to its target path.
///
/// Uses an atomic write (temp file in the target directory + rename) so a
/// failure never leaves a partial file behind.
pub async fn convert_to_file<C: ExportClient>(
    client: &C,
    pointer_path: impl AsRef<Path>,
    request: &ExportRequest,
    config: &ExportConfig,
) -> Result<ExportStats, GDocDownError> {
    let total_start = Instant::now();
    let mut output = convert(client, pointer_path, request, config).await?;
    write_output(&mut output, config).await?;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output.stats)
}

/// Write `output.payload` to `output.target_path` and record the size.
pub async fn write_output(
    output: &mut ExportOutput,
    config: &ExportConfig,
) -> Result<(), GDocDownError> {
    let path = output.target_path.as_path();
    let write_failed = |source: std::io::Error| GDocDownError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&dir).await.map_err(write_failed)?;

    // Creating the temp file is the only synchronous step.
    let bytes = output.payload.as_bytes();
    let (file, temp_path) = tempfile::NamedTempFile::new_in(&dir)
        .map_err(write_failed)?
        .into_parts();
    let mut file = tokio::fs::File::from_std(file);
    file.write_all(bytes).await.map_err(write_failed)?;
    file.sync_all().await.map_err(write_failed)?;
    drop(file);
    temp_path.persist(path).map_err(|e| write_failed(e.error))?;

    output.stats.bytes_written = bytes.len();
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    if let Some(ref cb) = config.progress_callback {
        cb.on_write_complete(path, bytes.len());
    }
    Ok(())
}

/// Synchronous wrapper around [`convert_to_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync<C: ExportClient>(
    client: &C,
    pointer_path: impl AsRef<Path>,
    request: &ExportRequest,
    config: &ExportConfig,
) -> Result<ExportStats, GDocDownError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| GDocDownError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_to_file(client, pointer_path, request, config))
}

/// Read a pointer file without exporting anything.
///
/// Needs no credentials and makes no network call.
pub fn inspect(pointer_path: impl AsRef<Path>) -> Result<DocumentPointer, GDocDownError> {
    pointer::identify(pointer_path)
}

/// Turn an HTML export into typeset text with comments inlined.
pub fn render_typeset(
    markup: &[u8],
    config: &ExportConfig,
) -> Result<(String, Vec<InlinedAnnotation>), GDocDownError> {
    let raw = std::str::from_utf8(markup).map_err(|e| GDocDownError::MarkupParseError {
        position: e.valid_up_to(),
        detail: "export is not valid UTF-8".to_string(),
    })?;
    let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let mut tree = sanitize::sanitize(raw, config)?;
    let inlined = annotations::inline_annotations(&mut tree, &config.annotations)?;
    serialize::drop_head(&mut tree);
    let body = serialize::find_body(&tree)?;
    let text = serialize::serialize(&tree, body, &config.paragraph_separator);
    debug!(
        "Typeset {} chars with {} inlined comments",
        text.len(),
        inlined.len()
    );
    Ok((text, inlined))
}

/// Where the output goes.
///
/// An explicit output file is used as is. Otherwise the file is
/// `<dir>/<pointer stem>.<ext>`, `<dir>` being the explicit output directory
/// or the pointer file's own directory and `<ext>` the extension override or
/// the format token.
pub fn target_path(pointer: &DocumentPointer, spec: &FormatSpec, request: &ExportRequest) -> PathBuf {
    let out_path = request.out_path.as_deref();
    if let Some(file) = out_path.filter(|p| formats::is_file_path(p)) {
        return file.to_path_buf();
    }

    let dir = out_path
        .map(Path::to_path_buf)
        .or_else(|| pointer.source.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let extension = request
        .extension
        .as_deref()
        .map(|e| e.trim().trim_start_matches('.'))
        .filter(|e| !e.is_empty())
        .unwrap_or(spec.extension);
    dir.join(format!("{}.{}", pointer.stem(), extension))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Explicit format, else the output file name, else the configured default.
fn choose_format(
    pointer: &DocumentPointer,
    request: &ExportRequest,
    config: &ExportConfig,
) -> Result<&'static FormatSpec, GDocDownError> {
    if let Some(ref token) = request.format {
        return formats::resolve_format(pointer.kind, token);
    }

    let inferred = request
        .out_path
        .as_deref()
        .filter(|p| formats::is_file_path(p))
        .and_then(Path::file_name)
        .and_then(|name| formats::infer_format(pointer.kind, &name.to_string_lossy()));
    if let Some(spec) = inferred {
        debug!("Format {} inferred from output file name", spec.extension);
        return Ok(spec);
    }

    formats::resolve_format(pointer.kind, &config.default_format)
}
